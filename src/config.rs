//! Runtime configuration from the environment
//!
//! Everything has a default, so a bare `slot-gallery` run keeps uploads in a
//! local directory next to the state database.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion};
use thiserror::Error;

const BACKEND_VAR: &str = "SLOT_GALLERY_BACKEND";
const BUCKET_VAR: &str = "SLOT_GALLERY_BUCKET";
const ENDPOINT_VAR: &str = "SLOT_GALLERY_S3_ENDPOINT";
const PUBLIC_URL_VAR: &str = "SLOT_GALLERY_PUBLIC_URL";
const DATA_DIR_VAR: &str = "SLOT_GALLERY_DATA_DIR";
const LOG_FORMAT_VAR: &str = "SLOT_GALLERY_LOG_FORMAT";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has an invalid value: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("no data directory available, set {DATA_DIR_VAR}")]
    NoDataDir,
}

/// Where uploaded images go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobBackend {
    /// Files under `<data dir>/blobs`, served as `file://` URLs
    Local,
    /// An S3 (or S3-compatible) bucket
    S3 {
        bucket: String,
        /// Endpoint override, e.g. LocalStack or MinIO
        endpoint: Option<String>,
        /// Base URL objects are publicly reachable under
        public_url: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub backend: BlobBackend,
    pub data_dir: PathBuf,
    pub log_format: LogFormat,
}

impl Config {
    /// Read the process environment, after loading `.env` if there is one
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build from any variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let backend = match var(BACKEND_VAR).map(|v| v.to_lowercase()).as_deref() {
            None | Some("local") => BlobBackend::Local,
            Some("s3") => BlobBackend::S3 {
                bucket: var(BUCKET_VAR).ok_or(ConfigError::Missing(BUCKET_VAR))?,
                endpoint: var(ENDPOINT_VAR),
                public_url: var(PUBLIC_URL_VAR),
            },
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    var: BACKEND_VAR,
                    value: other.to_string(),
                })
            }
        };

        let data_dir = match var(DATA_DIR_VAR) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .ok_or(ConfigError::NoDataDir)?
                .join("slot-gallery"),
        };

        let log_format = match var(LOG_FORMAT_VAR).map(|v| v.to_lowercase()).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    var: LOG_FORMAT_VAR,
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            backend,
            data_dir,
            log_format,
        })
    }

    /// Directory the local blob backend writes to
    pub fn blobs_dir(&self) -> PathBuf {
        self.data_dir.join("blobs")
    }
}

/// S3 client configuration with retry and timeout settings
pub async fn s3_client_config(endpoint: Option<&str>) -> aws_sdk_s3::Config {
    let retry_config = RetryConfig::standard()
        .with_max_attempts(3)
        .with_initial_backoff(Duration::from_millis(50));

    let timeout_config = TimeoutConfig::builder()
        .operation_timeout(Duration::from_secs(30))
        .build();

    let mut config_builder = aws_config::load_defaults(BehaviorVersion::latest())
        .await
        .to_builder()
        .retry_config(retry_config)
        .timeout_config(timeout_config);

    if let Some(endpoint_url) = endpoint {
        config_builder = config_builder.endpoint_url(endpoint_url);
    }

    let sdk_config = config_builder.build();
    let mut builder = aws_sdk_s3::Config::from(&sdk_config).to_builder();

    // S3-compatible endpoints generally don't do virtual-host addressing
    if endpoint.is_some() {
        builder.set_force_path_style(Some(true));
    }

    builder.build()
}
