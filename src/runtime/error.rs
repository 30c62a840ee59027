//! Common error type.
//!

use std::ffi::NulError;

#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    /// A buffer or argument the caller passed cannot be used.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The open descriptor listing (`/proc/self/fd`) could not be read.
    #[cfg(target_os = "linux")]
    #[error("cannot enumerate open file descriptors: {0}")]
    EnumerationUnavailable(nix::errno::Errno),

    /// `fork(2)` failed; no child process exists.
    #[cfg(target_os = "linux")]
    #[error("fork failed: {0}")]
    ForkFailed(nix::errno::Errno),

    #[error("shell not found: {0}")]
    ShellNotFound(#[from] which::Error),

    #[error("interior nul byte: {0}")]
    Nul(#[from] NulError),
}

impl From<SpawnError> for std::io::Error {
    fn from(e: SpawnError) -> Self {
        match e {
            SpawnError::InvalidArgument(m) => std::io::Error::new(std::io::ErrorKind::InvalidInput, m),
            #[cfg(target_os = "linux")]
            SpawnError::EnumerationUnavailable(errno) => std::io::Error::from(errno),
            #[cfg(target_os = "linux")]
            SpawnError::ForkFailed(errno) => std::io::Error::from(errno),
            SpawnError::ShellNotFound(e) => std::io::Error::new(std::io::ErrorKind::NotFound, e),
            SpawnError::Nul(e) => std::io::Error::new(std::io::ErrorKind::InvalidFilename, e),
        }
    }
}
