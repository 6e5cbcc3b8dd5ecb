//! File System Access Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::FileSystemAccess,
};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Tokio-based file system implementation
///
/// Downloads default to the user's download folder, falling back to the home
/// directory and finally the system temp directory.
#[derive(Debug, Clone)]
pub struct TokioFileSystem {
    download_dir: PathBuf,
}

impl TokioFileSystem {
    /// Create a new file system accessor with default directories
    pub fn new() -> Self {
        let download_dir = dirs::download_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
            .unwrap_or_else(std::env::temp_dir);

        Self { download_dir }
    }

    /// Create a new file system accessor with a custom download directory
    pub fn with_download_directory(download_dir: PathBuf) -> Self {
        Self { download_dir }
    }

    fn map_io_error(e: std::io::Error) -> BridgeError {
        BridgeError::Io(e)
    }
}

impl Default for TokioFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileSystemAccess for TokioFileSystem {
    async fn get_download_directory(&self) -> Result<PathBuf> {
        Ok(self.download_dir.clone())
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        fs::try_exists(path).await.map_err(Self::map_io_error)
    }

    async fn file_size(&self, path: &Path) -> Result<u64> {
        let metadata = fs::metadata(path).await.map_err(Self::map_io_error)?;
        Ok(metadata.len())
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .await
            .map_err(Self::map_io_error)?;
        debug!(path = ?path, "Created directory");
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes> {
        let data = fs::read(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, size = data.len(), "Read file");
        Ok(Bytes::from(data))
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()> {
        let mut file = fs::File::create(path).await.map_err(Self::map_io_error)?;
        file.write_all(&data).await.map_err(Self::map_io_error)?;
        file.flush().await.map_err(Self::map_io_error)?;
        debug!(path = ?path, size = data.len(), "Wrote file");
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, "Deleted file");
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).await.map_err(Self::map_io_error)?;
        debug!(from = ?from, to = ?to, "Renamed file");
        Ok(())
    }

    async fn open_write_stream(
        &self,
        path: &Path,
    ) -> Result<Box<dyn core_async::io::AsyncWrite + Send + Unpin>> {
        let file = fs::File::create(path).await.map_err(Self::map_io_error)?;
        Ok(Box::new(file))
    }
}
