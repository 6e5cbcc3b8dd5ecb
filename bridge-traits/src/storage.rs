//! Storage and File System Abstractions
//!
//! Platform-agnostic file I/O used to persist downloaded audio.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// File system access trait
///
/// Abstracts file I/O so the downloader can be exercised against a temporary
/// directory in tests and against sandboxed locations on hosts that need them.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn save(fs: &dyn FileSystemAccess, data: Bytes) -> Result<()> {
///     let dir = fs.get_download_directory().await?;
///     fs.create_dir_all(&dir).await?;
///     fs.write_file(&dir.join("song.mp3"), data).await
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Get the directory downloads are offered into by default.
    async fn get_download_directory(&self) -> Result<PathBuf>;

    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Size of a file in bytes
    async fn file_size(&self, path: &Path) -> Result<u64>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Write data to a file, creating it if it doesn't exist
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Delete a file
    async fn delete_file(&self, path: &Path) -> Result<()>;

    /// Move a file, replacing the destination if present
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Open a file for streaming writes, truncating any existing content
    async fn open_write_stream(
        &self,
        path: &Path,
    ) -> Result<Box<dyn core_async::io::AsyncWrite + Send + Unpin>>;
}
