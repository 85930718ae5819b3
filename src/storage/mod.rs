//! Blob storage for uploaded picks
//!
//! - `bucket.rs` - S3 bucket client
//! - `local.rs` - directory-backed store for offline use

mod bucket;
mod local;

use async_trait::async_trait;
use aws_sdk_s3::{error::SdkError, operation::put_object::PutObjectError};
use thiserror::Error;

pub use bucket::BucketClient;
pub use local::LocalBlobStore;

/// Result type for blob storage operations
pub type BlobResult<T> = Result<T, BlobError>;

/// Errors that can occur during blob storage operations
#[derive(Error, Debug)]
pub enum BlobError {
    /// S3 service error
    #[error("S3 service error: {0}")]
    S3Error(String),

    /// AWS SDK error (transport, timeout, ...)
    #[error("AWS SDK error: {0}")]
    AwsError(String),

    /// Local filesystem error
    #[error("Storage write failed: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The object name can't be turned into a URL
    #[error("Invalid object URL: {0}")]
    InvalidUrl(String),
}

impl From<SdkError<PutObjectError>> for BlobError {
    fn from(error: SdkError<PutObjectError>) -> Self {
        match error {
            SdkError::ServiceError(err) => BlobError::S3Error(err.err().to_string()),
            other => BlobError::AwsError(other.to_string()),
        }
    }
}

impl From<url::ParseError> for BlobError {
    fn from(error: url::ParseError) -> Self {
        BlobError::InvalidUrl(error.to_string())
    }
}

/// Stores binary objects by name and hands back fetchable URLs
///
/// Uploading the same name twice overwrites the earlier object.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, name: &str, bytes: Vec<u8>) -> BlobResult<()>;

    /// Durable URL for `name`; only called after a successful upload.
    async fn public_url(&self, name: &str) -> BlobResult<String>;
}

/// Content type for an object name, by extension
pub fn content_type_for(name: &str) -> &'static str {
    image::ImageFormat::from_path(name)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream")
}
