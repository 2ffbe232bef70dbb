use core::sync::atomic::{AtomicU8, Ordering};
use std::os::unix::io::AsRawFd;
use std::path::Path;

use crate::error::{Error, Operation};
use crate::file::open_latch_file;
use crate::mmap::{Mapper, Region};

/// The value of the first byte of an opened latch.
const OPENED: u8 = 1;

/// Only the first byte is meaningful. The kernel maps at least a page anyways.
const MAPPED_LEN: usize = 1;

/// A one-way boolean flag in shared memory.
///
/// The latch starts closed and can be opened, but never closed again. Its state is one byte of a
/// `MAP_SHARED` mapping. An anonymous latch is shared with all processes forked after its creation.
/// A file-backed latch is shared with every process mapping the same file, and its state outlives
/// the process until the file is removed, which this type never does.
///
/// Observing the state is a poll. There is no way to wait for the latch to open.
pub struct SharedLatch {
    region: Region,
    backing: Backing,
}

/// Where the memory of a latch comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Backing {
    /// Anonymous memory, shared only through `fork`.
    Anonymous,
    /// A regular file that any process may map.
    File,
}

impl SharedLatch {
    /// Create a latch in anonymous memory.
    pub fn new() -> Result<Self, Error> {
        Self::with_mapper(Mapper::new(), None)
    }

    /// Create a latch backed by the file at `path`.
    ///
    /// The file is created with mode `0o666` (minus umask) if it does not exist. An existing file
    /// is not truncated, a latch previously opened through it is opened in the new handle as well.
    /// The path is used as given, no special meaning is attached to an empty one.
    ///
    /// This may block indefinitely while another process holds an advisory lock on the file.
    pub fn with_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::with_mapper(Mapper::new(), Some(path.as_ref()))
    }

    /// Create a latch, file-backed if there is a path and anonymous otherwise.
    pub fn create(path: Option<&Path>) -> Result<Self, Error> {
        Self::with_mapper(Mapper::new(), path)
    }

    /// Create a latch with a custom mapping implementation.
    pub fn with_mapper(mapper: Mapper, path: Option<&Path>) -> Result<Self, Error> {
        let (region, backing) = match path {
            Some(path) => {
                let file = open_latch_file(path)?;
                let region = mapper
                    .map_shared(Some(file.as_raw_fd()), MAPPED_LEN)
                    .map_err(|err| Error::new(Operation::Map, Some(path), err))?;
                // The mapping keeps the file alive, the descriptor is closed here.
                drop(file);
                tracing::debug!(path = %path.display(), "created file-backed latch");
                (region, Backing::File)
            }
            None => {
                let region = mapper
                    .map_shared(None, MAPPED_LEN)
                    .map_err(|err| Error::new(Operation::Map, None, err))?;
                tracing::debug!("created anonymous latch");
                (region, Backing::Anonymous)
            }
        };

        Ok(SharedLatch { region, backing })
    }

    /// Open the latch.
    ///
    /// Calling this more than once has no further effect.
    pub fn open(&self) {
        self.state().store(OPENED, Ordering::Release);
        tracing::trace!(backing = ?self.backing, "opened latch");
    }

    /// Check whether the latch is open.
    ///
    /// Only the exact value written by [`SharedLatch::open`] counts as open. Any other content of
    /// the shared byte, as might have been written by a third party, reads as closed.
    pub fn is_opened(&self) -> bool {
        self.state().load(Ordering::Acquire) == OPENED
    }

    pub fn backing(&self) -> Backing {
        self.backing
    }

    /// The number of bytes requested for the mapping.
    pub fn mapped_len(&self) -> usize {
        self.region.len()
    }

    fn state(&self) -> &AtomicU8 {
        // Safety: the region is valid for reads and writes of at least one byte for as long as we
        // own it, and `AtomicU8` has no alignment requirement. Other processes only ever touch the
        // byte with single byte writes, never partially.
        unsafe { &*(self.region.as_ptr() as *const AtomicU8) }
    }
}

impl core::fmt::Debug for SharedLatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedLatch")
            .field("backing", &self.backing)
            .field("opened", &self.is_opened())
            .finish()
    }
}
