//! The mapping seam.
//!
//! All memory of a latch comes from one `mmap` call and goes away with one `munmap` call. Both go
//! through a [`VTable`] such that the OS interaction can be replaced, for instance to observe the
//! cleanup of a construction where the mapping itself fails.
use core::ffi::{c_int, c_void};
use std::os::fd::RawFd;
use std::sync::Arc;

pub struct VTable {
    /// Simplified `mmap`, the address hint and offset are always zero.
    pub mmap: fn(len: usize, prot: c_int, flags: c_int, file: RawFd) -> *mut c_void,
    pub munmap: fn(*mut c_void, usize) -> c_int,
    pub errno: fn() -> c_int,

    pub prot_read: c_int,
    pub prot_write: c_int,
    pub map_shared: c_int,
    pub map_anonymous: c_int,
    pub map_failed: *mut c_void,
}

#[derive(Clone)]
pub struct Mapper {
    inner: Arc<Inner>,
}

struct Inner {
    vtable: VTable,
}

/// A region of shared memory, unmapped on drop.
///
/// There is exactly one owner of each region. Other processes may well map the same pages but
/// never through this handle.
pub struct Region {
    ptr: *mut c_void,
    len: usize,
    mapper: Mapper,
}

// Safety: the vtable only holds function pointers and plain constants. The `map_failed` sentinel
// is compared by address and never dereferenced.
unsafe impl Send for Inner {}
unsafe impl Sync for Inner {}

// Safety: the region is shared memory to begin with. The handle itself only hands out the raw
// pointer, any access through it is already `unsafe` and must be atomic to be sound.
unsafe impl Send for Region {}
unsafe impl Sync for Region {}

impl Mapper {
    /// Create a `Mapper` from a customized vtable.
    ///
    /// # Safety
    ///
    /// The VTable must contain a correct pair of functions that implement the `mmap` interface.
    /// In particular a pointer returned by `mmap` that is not `map_failed` must be valid for reads
    /// and writes of `len` bytes until it is passed to `munmap`.
    pub unsafe fn new_unchecked(vtable: VTable) -> Self {
        Mapper {
            inner: Arc::new(Inner { vtable }),
        }
    }

    pub fn new() -> Self {
        fn _mmap_inner(len: usize, prot: c_int, flags: c_int, file: RawFd) -> *mut c_void {
            unsafe { libc::mmap(core::ptr::null_mut(), len, prot, flags, file, 0) }
        }

        fn _munmap(addr: *mut c_void, len: usize) -> c_int {
            unsafe { libc::munmap(addr, len) }
        }

        fn _errno() -> c_int {
            std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
        }

        unsafe {
            Self::new_unchecked(VTable {
                mmap: _mmap_inner,
                munmap: _munmap,
                errno: _errno,
                prot_read: libc::PROT_READ,
                prot_write: libc::PROT_WRITE,
                map_shared: libc::MAP_SHARED,
                map_anonymous: libc::MAP_ANONYMOUS,
                map_failed: libc::MAP_FAILED,
            })
        }
    }

    /// Map `len` bytes readable, writable and shared.
    ///
    /// With a file the mapping starts at offset zero of it. Without one, the memory is anonymous
    /// and only reaches other processes by being inherited through `fork`.
    pub fn map_shared(&self, file: Option<RawFd>, len: usize) -> Result<Region, std::io::Error> {
        let vtable = &self.inner.vtable;
        let prot = vtable.prot_read | vtable.prot_write;

        let (flags, fd) = match file {
            Some(fd) => (vtable.map_shared, fd),
            None => (vtable.map_shared | vtable.map_anonymous, -1),
        };

        let ptr = (vtable.mmap)(len, prot, flags, fd);

        if ptr == vtable.map_failed || ptr.is_null() {
            return Err(std::io::Error::from_raw_os_error((vtable.errno)()));
        }

        Ok(Region {
            ptr,
            len,
            mapper: self.clone(),
        })
    }
}

impl Default for Mapper {
    fn default() -> Self {
        Mapper::new()
    }
}

impl Region {
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr as *mut u8
    }

    /// The length that was requested, the kernel rounds the mapping up to full pages.
    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        // No more references to this region of memory, all borrows are tied to `self`.
        let ret = (self.mapper.munmap)(self.ptr, self.len);

        if ret != 0 {
            let err = std::io::Error::from_raw_os_error((self.mapper.errno)());
            tracing::warn!(len = self.len, %err, "failed to unmap latch region");
        } else {
            tracing::debug!(len = self.len, "unmapped latch region");
        }
    }
}

impl core::ops::Deref for Mapper {
    type Target = VTable;

    fn deref(&self) -> &Self::Target {
        &self.inner.vtable
    }
}
