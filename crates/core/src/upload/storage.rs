//! Where accepted uploads end up.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

#[async_trait]
pub trait AssetStorage: Send + Sync {
    /// Store `data` under `filename` and return its public URL.
    async fn put(&self, filename: &str, data: &[u8]) -> io::Result<String>;

    /// Storage scheme, for logging.
    fn scheme(&self) -> &'static str;
}

/// Files in a public directory served by the web server under `base_url`.
#[derive(Debug, Clone)]
pub struct LocalAssetStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalAssetStorage {
    pub fn new(base_path: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

fn is_plain_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

#[async_trait]
impl AssetStorage for LocalAssetStorage {
    async fn put(&self, filename: &str, data: &[u8]) -> io::Result<String> {
        if !is_plain_filename(filename) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("refusing to store '{filename}' outside the upload directory"),
            ));
        }

        fs::create_dir_all(&self.base_path).await?;
        let path = self.base_path.join(filename);

        // create_new: generated names are unique, an existing file means a clash.
        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        write_or_remove(file, &path, data).await?;

        debug!(path = %path.display(), size = data.len(), "asset written");
        Ok(format!("{}/{filename}", self.base_url))
    }

    fn scheme(&self) -> &'static str {
        "local"
    }
}

/// Write `data` to `file`; on failure delete `path` so no truncated asset
/// stays publicly reachable.
async fn write_or_remove<W: AsyncWrite + Unpin>(mut file: W, path: &Path, data: &[u8]) -> io::Result<()> {
    let written = async {
        file.write_all(data).await?;
        file.flush().await
    }
    .await;
    if let Err(err) = written {
        drop(file);
        if let Err(cleanup) = fs::remove_file(path).await {
            warn!(path = %path.display(), error = %cleanup, "partial asset not removed");
        }
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use super::*;

    /// Accepts nothing, like a full disk.
    struct FullDisk;

    impl AsyncWrite for FullDisk {
        fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, _: &[u8]) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::WriteZero, "no space left")))
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn failed_write_removes_the_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1700000000_1234_logo.png");
        std::fs::write(&path, b"pn").unwrap();

        let err = write_or_remove(FullDisk, &path, b"png").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WriteZero);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn writes_file_and_returns_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalAssetStorage::new(dir.path().join("uploads"), "/uploads/");

        let url = storage.put("1700000000_1234_logo.png", b"png").await.unwrap();
        assert_eq!(url, "/uploads/1700000000_1234_logo.png");
        let written = std::fs::read(dir.path().join("uploads/1700000000_1234_logo.png")).unwrap();
        assert_eq!(written, b"png");
    }

    #[tokio::test]
    async fn refuses_paths_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalAssetStorage::new(dir.path(), "/uploads");

        assert!(storage.put("../escape.png", b"x").await.is_err());
        assert!(storage.put("a/b.png", b"x").await.is_err());

        storage.put("same.png", b"x").await.unwrap();
        assert!(storage.put("same.png", b"y").await.is_err());
    }
}
