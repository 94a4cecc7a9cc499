//! Metadata and content collaborators.

use std::path::Path;
use std::time::SystemTime;

use async_trait::async_trait;

use crate::error::FsError;

/// Metadata snapshot of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// Modification time, when the platform reports one.
    pub modified: Option<SystemTime>,

    /// Size in bytes.
    pub len: u64,

    /// Whether the path is a regular file.
    pub is_file: bool,
}

impl From<&std::fs::Metadata> for FileStat {
    fn from(metadata: &std::fs::Metadata) -> Self {
        Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
            is_file: metadata.is_file(),
        }
    }
}

/// Provides file metadata.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn stat(&self, path: &Path) -> Result<FileStat, FsError>;
}

/// Reads file content.
#[async_trait]
pub trait ContentReader: Send + Sync {
    async fn read(&self, path: &Path) -> Result<Vec<u8>, FsError>;
}

/// Collaborators backed by `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFs;

#[async_trait]
impl MetadataProvider for TokioFs {
    async fn stat(&self, path: &Path) -> Result<FileStat, FsError> {
        tokio::fs::metadata(path)
            .await
            .map(|metadata| FileStat::from(&metadata))
            .map_err(|e| FsError::from_io(path, e))
    }
}

#[async_trait]
impl ContentReader for TokioFs {
    async fn read(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        tokio::fs::read(path)
            .await
            .map_err(|e| FsError::from_io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_tokio_fs_stat_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.md");
        std::fs::write(&path, b"# Notes\n").unwrap();

        let stat = TokioFs.stat(&path).await.unwrap();
        assert!(stat.is_file);
        assert_eq!(stat.len, 8);
        assert!(stat.modified.is_some());

        let content = TokioFs.read(&path).await.unwrap();
        assert_eq!(content, b"# Notes\n");
    }

    #[tokio::test]
    async fn test_tokio_fs_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.md");

        assert!(TokioFs.stat(&path).await.unwrap_err().is_not_found());
        assert!(TokioFs.read(&path).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_directory_is_not_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let stat = TokioFs.stat(temp_dir.path()).await.unwrap();
        assert!(!stat.is_file);
    }
}
