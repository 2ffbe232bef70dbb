//! A latch: one bit of state shared between processes.
//!
//! The latch starts closed. Any process holding a mapping of it may open it, and every other
//! process holding a mapping of the same memory observes the change on its next poll. The typical
//! use is a parent that forks workers early and decides only later whether they should proceed.
//!
//! ```no_run
//! use shm_latch::SharedLatch;
//!
//! let latch = SharedLatch::new()?;
//! assert!(!latch.is_opened());
//! // .. fork workers, they poll `latch.is_opened()` ..
//! latch.open();
//! assert!(latch.is_opened());
//! # Ok::<_, shm_latch::Error>(())
//! ```
//!
//! ## Memory model
//!
//! The state is a single byte at the start of a `MAP_SHARED` mapping. It is only ever set to a
//! fixed value and read, there is no read-modify-write. Visibility between processes is whatever
//! the platform provides for shared mappings, which on all common platforms is immediate.
//!
//! ## Backing file
//!
//! A file-backed latch maps the first byte of a regular file. The file is created if necessary and
//! extended to one byte under an advisory lock; longer files are left as they are. The file is
//! never removed by this crate, it can back further latches after all handles are gone.

mod error;
mod file;
mod latch;
pub mod mmap;

pub use error::{Error, Operation};
pub use latch::{Backing, SharedLatch};
