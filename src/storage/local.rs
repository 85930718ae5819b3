//! Directory-backed blob store

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::{BlobError, BlobResult, BlobStore};

/// Writes objects into a directory and serves them as `file://` URLs
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Create the store, creating `root` if needed
    ///
    /// The root is canonicalized so the returned URLs are absolute.
    pub fn new(root: impl AsRef<Path>) -> BlobResult<Self> {
        std::fs::create_dir_all(root.as_ref())?;
        let root = root.as_ref().canonicalize()?;
        debug!("Local blob store at {}", root.display());
        Ok(Self { root })
    }

    fn object_path(&self, name: &str) -> BlobResult<PathBuf> {
        // Names are single path segments
        if name.is_empty() || name.contains(&['/', '\\'][..]) || name == "." || name == ".." {
            return Err(BlobError::InvalidUrl(format!("bad object name: {name:?}")));
        }
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, name: &str, bytes: Vec<u8>) -> BlobResult<()> {
        let path = self.object_path(name)?;
        tokio::fs::write(&path, bytes).await?;
        debug!("Stored object at {}", path.display());
        Ok(())
    }

    async fn public_url(&self, name: &str) -> BlobResult<String> {
        let path = self.object_path(name)?;
        let url = Url::from_file_path(&path)
            .map_err(|()| BlobError::InvalidUrl(path.display().to_string()))?;
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_then_url_points_at_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().join("blobs")).unwrap();

        store.upload("a.jpg", vec![1, 2, 3]).await.unwrap();
        let url = store.public_url("a.jpg").await.unwrap();

        assert!(url.starts_with("file://"));
        let path = Url::parse(&url).unwrap().to_file_path().unwrap();
        assert_eq!(std::fs::read(path).unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_same_name_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path()).unwrap();

        store.upload("a.jpg", vec![1]).await.unwrap();
        store.upload("a.jpg", vec![2, 2]).await.unwrap();

        assert_eq!(std::fs::read(dir.path().join("a.jpg")).unwrap(), vec![2, 2]);
    }

    #[tokio::test]
    async fn test_rejects_path_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path()).unwrap();

        assert!(store.upload("../escape.jpg", vec![0]).await.is_err());
        assert!(store.upload("", vec![0]).await.is_err());
    }
}
