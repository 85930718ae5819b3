//! S3 bucket client implementation

use async_trait::async_trait;
use aws_sdk_s3::{primitives::ByteStream, Client};
use tracing::{debug, error, info};
use url::Url;

use super::{content_type_for, BlobError, BlobResult, BlobStore};

/// S3 bucket client for uploaded picks
pub struct BucketClient {
    client: Client,
    bucket_name: String,
    public_base_url: Url,
}

impl BucketClient {
    /// Creates a new bucket client
    ///
    /// # Arguments
    ///
    /// * `client` - Pre-configured S3 client
    /// * `bucket_name` - Bucket the picks are uploaded to
    /// * `public_base_url` - Base URL objects are served from; defaults to
    ///   the bucket's virtual-hosted S3 endpoint
    ///
    /// # Errors
    ///
    /// Returns `BlobError::ConfigError` if the bucket name is empty
    /// Returns `BlobError::InvalidUrl` if the base URL does not parse
    pub fn new(
        client: Client,
        bucket_name: String,
        public_base_url: Option<String>,
    ) -> BlobResult<Self> {
        if bucket_name.trim().is_empty() {
            return Err(BlobError::ConfigError("bucket name is empty".to_string()));
        }

        let base = public_base_url
            .unwrap_or_else(|| format!("https://{bucket_name}.s3.amazonaws.com"));
        let public_base_url = Url::parse(&base)?;

        info!(
            "Initialized S3 bucket client for bucket: {} (public base {})",
            bucket_name, public_base_url
        );

        Ok(Self {
            client,
            bucket_name,
            public_base_url,
        })
    }
}

/// `base` with `name` appended as one percent-encoded path segment
pub(crate) fn object_url(base: &Url, name: &str) -> BlobResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| BlobError::InvalidUrl(format!("{base} cannot be a base URL")))?
        .pop_if_empty()
        .push(name);
    Ok(url)
}

#[async_trait]
impl BlobStore for BucketClient {
    async fn upload(&self, name: &str, bytes: Vec<u8>) -> BlobResult<()> {
        debug!("Uploading object: {} ({} bytes)", name, bytes.len());

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(name)
            .content_type(content_type_for(name))
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| {
                error!("Failed to upload object {}: {}", name, e);
                BlobError::from(e)
            })?;

        debug!("Uploaded object: {}", name);
        Ok(())
    }

    async fn public_url(&self, name: &str) -> BlobResult<String> {
        Ok(object_url(&self.public_base_url, name)?.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_url_appends_segment() {
        let base = Url::parse("https://photos.s3.amazonaws.com").unwrap();
        let url = object_url(&base, "IMG_0001.jpg").unwrap();
        assert_eq!(url.as_str(), "https://photos.s3.amazonaws.com/IMG_0001.jpg");
    }

    #[test]
    fn test_object_url_keeps_base_path_and_encodes() {
        let base = Url::parse("https://cdn.example.com/gallery/").unwrap();
        let url = object_url(&base, "my photo.jpg").unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.com/gallery/my%20photo.jpg");
    }

    #[test]
    fn test_object_url_rejects_opaque_base() {
        let base = Url::parse("mailto:someone@example.com").unwrap();
        assert!(matches!(
            object_url(&base, "a.jpg"),
            Err(BlobError::InvalidUrl(_))
        ));
    }
}
