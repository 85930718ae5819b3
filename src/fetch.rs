/// Locators and byte fetching
///
/// A locator is whatever the picker hands back: a bare path, a `file://`
/// URL, or an `http(s)://` URL. Fetching resolves it to bytes.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use url::Url;

/// Opaque reference to a picked media item
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator(String);

impl Locator {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Locator for a file on disk, or None if the path isn't valid UTF-8
    pub fn from_path(path: &Path) -> Option<Self> {
        path.to_str().map(Self::new)
    }

    /// Storage object name: the trailing path segment
    ///
    /// No uniqueness is attempted. Two picks with the same file name map to
    /// the same object, and the later upload overwrites the earlier one.
    /// Returns None when the locator ends in a separator.
    pub fn object_name(&self) -> Option<&str> {
        let tail = self
            .0
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .unwrap_or_default();
        // Query strings and fragments are not part of the name
        let tail = tail.split(&['?', '#'][..]).next().unwrap_or_default();
        (!tail.is_empty()).then_some(tail)
    }

    fn target(&self) -> Result<Target, FetchError> {
        match Url::parse(&self.0) {
            Ok(url) => match url.scheme() {
                "http" | "https" => Ok(Target::Remote(url)),
                "file" => url
                    .to_file_path()
                    .map(Target::File)
                    .map_err(|()| FetchError::UnsupportedScheme(self.0.clone())),
                // Windows drive letters parse as a one-letter scheme
                scheme if scheme.len() == 1 => Ok(Target::File(PathBuf::from(&self.0))),
                scheme => Err(FetchError::UnsupportedScheme(scheme.to_string())),
            },
            Err(_) => Ok(Target::File(PathBuf::from(&self.0))),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

enum Target {
    File(PathBuf),
    Remote(Url),
}

/// Errors while fetching the bytes behind a locator
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server responded with status {0}")]
    Status(u16),

    #[error("unsupported locator: {0}")]
    UnsupportedScheme(String),
}

/// Fetch the raw bytes referenced by `locator`
pub async fn fetch_bytes(locator: &Locator) -> Result<Vec<u8>, FetchError> {
    match locator.target()? {
        Target::File(path) => {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|source| FetchError::Io {
                    path: path.clone(),
                    source,
                })?;
            debug!("Read {} bytes from {}", bytes.len(), path.display());
            Ok(bytes)
        }
        Target::Remote(url) => {
            let response = reqwest::get(url.clone()).await?;
            if !response.status().is_success() {
                return Err(FetchError::Status(response.status().as_u16()));
            }
            let bytes = response.bytes().await?;
            debug!("Downloaded {} bytes from {}", bytes.len(), url);
            Ok(bytes.to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_name_is_trailing_segment() {
        let cases = [
            ("file:///data/user/0/cache/ImagePicker/abc.jpeg", Some("abc.jpeg")),
            ("/home/me/Pictures/cat.png", Some("cat.png")),
            (r"C:\Users\me\Pictures\dog.jpg", Some("dog.jpg")),
            ("https://cdn/img0.jpg?token=1", Some("img0.jpg")),
            ("plain.jpg", Some("plain.jpg")),
            ("/trailing/", None),
            ("", None),
        ];

        for (raw, expected) in cases {
            assert_eq!(Locator::new(raw).object_name(), expected, "locator {raw}");
        }
    }

    #[tokio::test]
    async fn test_fetch_bare_path_and_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pick.jpg");
        std::fs::write(&path, b"jpeg bytes").unwrap();

        let bare = Locator::from_path(&path).unwrap();
        assert_eq!(fetch_bytes(&bare).await.unwrap(), b"jpeg bytes");

        let url = Url::from_file_path(&path).unwrap();
        let file_url = Locator::new(url.as_str());
        assert_eq!(fetch_bytes(&file_url).await.unwrap(), b"jpeg bytes");
    }

    #[tokio::test]
    async fn test_fetch_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let locator = Locator::from_path(&dir.path().join("gone.jpg")).unwrap();

        assert!(matches!(
            fetch_bytes(&locator).await,
            Err(FetchError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_unsupported_scheme() {
        let locator = Locator::new("ph://asset/123");
        assert!(matches!(
            fetch_bytes(&locator).await,
            Err(FetchError::UnsupportedScheme(scheme)) if scheme == "ph"
        ));
    }
}
