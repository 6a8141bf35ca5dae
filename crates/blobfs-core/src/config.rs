//! Blob store configuration.
//!
//! Provides [`BlobConfig`], the shared read-only knobs consumed by write
//! and read handles. Configuration values can be loaded from environment
//! variables via [`BlobConfig::from_env`].

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Default minimum part size for multipart uploads (5 MiB).
///
/// Every part except the last must be at least this large; the write path
/// closes parts at exactly this size.
const DEFAULT_MULTIPART_MIN_PART_SIZE: usize = 5_242_880;

/// Default number of part uploads allowed in flight per file.
const DEFAULT_CONCURRENT_WRITES_PER_FILE: usize = 5;

/// Blob store knobs.
///
/// All fields have defaults matching common S3 limits. Write handles copy
/// the values they need at construction; changing a config after a handle
/// exists has no effect on it.
///
/// # Examples
///
/// ```
/// use blobfs_core::config::BlobConfig;
///
/// let config = BlobConfig::default();
/// assert_eq!(config.multipart_min_part_size, 5_242_880);
/// assert_eq!(config.concurrent_writes_per_file, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct BlobConfig {
    /// Minimum size (in bytes) of every non-final multipart part.
    #[builder(default = DEFAULT_MULTIPART_MIN_PART_SIZE)]
    pub multipart_min_part_size: usize,

    /// Maximum number of part uploads in flight at once for one file.
    #[builder(default = DEFAULT_CONCURRENT_WRITES_PER_FILE)]
    pub concurrent_writes_per_file: usize,

    /// Default region for the endpoint this configuration belongs to.
    #[builder(default = String::from("us-east-1"))]
    pub default_region: String,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            multipart_min_part_size: DEFAULT_MULTIPART_MIN_PART_SIZE,
            concurrent_writes_per_file: DEFAULT_CONCURRENT_WRITES_PER_FILE,
            default_region: String::from("us-east-1"),
            log_level: String::from("info"),
        }
    }
}

impl BlobConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables (falling back to defaults):
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `BLOB_MULTIPART_MIN_PART_SIZE` | `5242880` |
    /// | `BLOB_CONCURRENT_WRITES_PER_FILE` | `5` |
    /// | `DEFAULT_REGION` | `us-east-1` |
    /// | `LOG_LEVEL` | `info` |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("BLOB_MULTIPART_MIN_PART_SIZE") {
            if let Ok(n) = v.parse::<usize>() {
                config.multipart_min_part_size = n;
            }
        }
        if let Ok(v) = std::env::var("BLOB_CONCURRENT_WRITES_PER_FILE") {
            if let Ok(n) = v.parse::<usize>() {
                config.concurrent_writes_per_file = n;
            }
        }
        if let Ok(v) = std::env::var("DEFAULT_REGION") {
            config.default_region = v;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }
}
