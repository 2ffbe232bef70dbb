//! Prepare a regular file so that it can back a latch mapping.
use std::fs::{File, OpenOptions};
use std::os::unix::fs::{FileExt, OpenOptionsExt};
use std::os::unix::io::AsRawFd;
use std::path::Path;

use crate::error::{Error, Operation};

/// Open `path` and make sure it is at least one byte long.
///
/// The zero-size check and the extension happen under an exclusive `flock` so that concurrent
/// initializers do not race each other. Existing content is never truncated. On all error paths
/// the descriptor is closed when the `File` is dropped, which also releases any held lock.
pub(crate) fn open_latch_file(path: &Path) -> Result<File, Error> {
    let fail = |op: Operation| move |err: std::io::Error| Error::new(op, Some(path), err);

    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .mode(0o666)
        .open(path)
        .map_err(fail(Operation::Open))?;

    flock(&file, libc::LOCK_EX).map_err(fail(Operation::Lock))?;

    let stat = file.metadata().map_err(fail(Operation::Stat))?;

    if stat.len() == 0 {
        file.write_all_at(&[0], 0).map_err(fail(Operation::Write))?;
        tracing::debug!(path = %path.display(), "extended empty latch file");
    }

    flock(&file, libc::LOCK_UN).map_err(fail(Operation::Unlock))?;

    Ok(file)
}

fn flock(file: &File, operation: libc::c_int) -> Result<(), std::io::Error> {
    loop {
        if 0 == unsafe { libc::flock(file.as_raw_fd(), operation) } {
            return Ok(());
        }

        let err = std::io::Error::last_os_error();
        // A signal during the blocking wait is not a failure to lock.
        if err.kind() != std::io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}
