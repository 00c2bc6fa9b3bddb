//! Filesystem collaborator
//!
//! The pipeline only ever needs two operations: stat a path and open it for
//! reading at an offset. Both sit behind `FileSystem` so tests can swap the
//! disk for an in-memory fake.

use std::future::Future;
use std::io::{self, SeekFrom};
use std::path::Path;
use std::pin::Pin;
use std::time::SystemTime;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncSeekExt};

/// Boxed byte source handed to the streaming body
pub type FileReader = Pin<Box<dyn AsyncRead + Send>>;

/// Metadata snapshot taken once per request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub is_dir: bool,
}

/// Stat + positioned read
pub trait FileSystem: Send + Sync {
    fn metadata(&self, path: &Path) -> impl Future<Output = io::Result<FileMetadata>> + Send;

    /// Open `path` with the read cursor at `offset`
    fn open_at(
        &self,
        path: &Path,
        offset: u64,
    ) -> impl Future<Output = io::Result<FileReader>> + Send;
}

/// Disk-backed implementation using `tokio::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFs;

impl FileSystem for TokioFs {
    async fn metadata(&self, path: &Path) -> io::Result<FileMetadata> {
        let meta = tokio::fs::metadata(path).await?;
        Ok(FileMetadata {
            size: meta.len(),
            modified: meta.modified().ok(),
            is_dir: meta.is_dir(),
        })
    }

    async fn open_at(&self, path: &Path, offset: u64) -> io::Result<FileReader> {
        let mut file = File::open(path).await?;
        if offset > 0 {
            file.seek(SeekFrom::Start(offset)).await?;
        }
        Ok(Box::pin(file))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_tokio_fs_metadata_and_offset_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("digits.txt");
        std::fs::write(&path, b"123456789").unwrap();

        let meta = TokioFs.metadata(&path).await.unwrap();
        assert_eq!(meta.size, 9);
        assert!(!meta.is_dir);
        assert!(meta.modified.is_some());

        let mut reader = TokioFs.open_at(&path, 3).await.unwrap();
        let mut out = String::new();
        reader.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "456789");

        assert!(TokioFs.metadata(dir.path()).await.unwrap().is_dir);
    }

    #[tokio::test]
    async fn test_tokio_fs_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = TokioFs.metadata(&dir.path().join("nope")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_memory_fs_tracks_handles() {
        let fs = memory::MemoryFs::new().with_file("/srv/a.txt", b"abc");
        let reader = fs.open_at(Path::new("/srv/a.txt"), 1).await.unwrap();
        assert_eq!(fs.open_handles(), 1);
        drop(reader);
        assert_eq!(fs.open_handles(), 0);

        let err = fs.metadata(Path::new("/srv/a.txt/x")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotADirectory);
        assert!(fs.metadata(Path::new("/srv")).await.unwrap().is_dir);
    }
}
