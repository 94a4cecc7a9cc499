//! Error types for the file watcher.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, WatchError>;

/// Errors surfaced at the engine boundary.
///
/// Only config, capability and registration failures reach callers; everything else
/// is handled inside the session and logged.
#[derive(Error, Debug)]
pub enum WatchError {
    /// The file could not be stat'ed or read when the session started.
    #[error("cannot access file: {0}")]
    Capability(#[from] FsError),

    /// The path exists but is not a regular file.
    #[error("not a regular file: {0}")]
    NotAFile(String),

    /// The native notification channel refused the registration.
    #[error("failed to register file notifications: {0}")]
    Registration(#[from] notify::Error),

    /// The session config has an unusable window or interval.
    #[error("invalid watch config: {0}")]
    Config(String),

    /// The file content is not valid UTF-8 text.
    #[error("file is not valid UTF-8: {0}")]
    InvalidUtf8(String),
}

/// Failures reported by the metadata and content collaborators.
#[derive(Error, Debug)]
pub enum FsError {
    /// Nothing exists at the path.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The process lacks permission to stat or read the path.
    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    /// Any other IO failure.
    #[error("io error on {}: {source}", path.display())]
    Other {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// Attach `path` to an IO error, keeping the not-found and permission cases distinct.
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Other {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
