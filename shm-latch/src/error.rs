use std::path::{Path, PathBuf};

/// The step of latch construction that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Opening (or creating) the backing file.
    Open,
    /// Acquiring the exclusive advisory lock on the backing file.
    Lock,
    /// Retrieving the status of the backing file.
    Stat,
    /// Writing the initial byte into an empty backing file.
    Write,
    /// Releasing the advisory lock.
    Unlock,
    /// Creating the shared memory mapping.
    Map,
}

/// An error while creating a latch.
///
/// Carries the failing step, the backing file if there was one, and the OS error.
pub struct Error {
    op: Operation,
    path: Option<PathBuf>,
    source: std::io::Error,
}

impl Error {
    pub(crate) fn new(op: Operation, path: Option<&Path>, source: std::io::Error) -> Self {
        Error {
            op,
            path: path.map(Path::to_path_buf),
            source,
        }
    }

    pub fn operation(&self) -> Operation {
        self.op
    }

    /// The path of the backing file, `None` for anonymous latches.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn raw_os_error(&self) -> Option<i32> {
        self.source.raw_os_error()
    }

    /// The kind of the underlying OS error.
    pub fn kind(&self) -> std::io::ErrorKind {
        self.source.kind()
    }
}

impl Operation {
    fn describe(self) -> &'static str {
        match self {
            Operation::Open => "open file",
            Operation::Lock => "acquire an advisory lock for",
            Operation::Stat => "get file status for",
            Operation::Write => "write to file",
            Operation::Unlock => "release an advisory lock for",
            Operation::Map => "create mapping for latch",
        }
    }
}

impl core::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Error")
            .field("op", &self.op)
            .field("path", &self.path)
            .field("source", &self.source)
            .finish()
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(
                f,
                "failed to {} {}: {}",
                self.op.describe(),
                path.display(),
                self.source
            ),
            None => write!(f, "failed to {}: {}", self.op.describe(), self.source),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        std::io::Error::new(err.source.kind(), err)
    }
}
