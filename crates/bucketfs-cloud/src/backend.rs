//! Store backends and bucket URLs

use crate::{CloudError, Result};
use std::path::PathBuf;
use url::Url;

/// Connection settings for an S3-compatible service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct S3Settings {
    /// Region, e.g. `us-east-1`; falls back to `AWS_REGION`
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services (MinIO, RustFS, ...)
    pub endpoint: Option<String>,
    /// Permit plain-HTTP endpoints
    pub allow_http: bool,
}

/// Where buckets live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Amazon S3 or a compatible service; credentials come from the environment
    S3(S3Settings),
    /// One directory per bucket under `root`
    Local {
        /// Directory holding the bucket directories
        root: PathBuf,
    },
    /// Buckets held in process memory
    Memory,
}

impl Backend {
    /// Short name used in logs and configuration
    pub fn name(&self) -> &'static str {
        match self {
            Backend::S3(_) => "s3",
            Backend::Local { .. } => "local",
            Backend::Memory => "memory",
        }
    }

    /// Whether listings come back in ascending key order
    pub(crate) fn lists_in_order(&self) -> bool {
        !matches!(self, Backend::Local { .. })
    }
}

/// A bucket addressed by URL
///
/// Supports:
/// - `s3://bucket`
/// - `file:///path/to/root/bucket` (the last segment is the bucket)
/// - `memory://bucket`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketUrl {
    /// Backend the bucket lives in
    pub backend: Backend,
    /// Bucket name
    pub bucket: String,
}

impl BucketUrl {
    /// Parse a bucket URL
    pub fn parse(url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|e| CloudError::InvalidUrl(format!("{}: {}", url, e)))?;

        match parsed.scheme() {
            "s3" | "memory" => {
                let bucket = parsed
                    .host_str()
                    .filter(|h| !h.is_empty())
                    .ok_or_else(|| CloudError::InvalidUrl(format!("Missing bucket name in {}", url)))?
                    .to_string();
                if !matches!(parsed.path(), "" | "/") {
                    return Err(CloudError::InvalidUrl(format!(
                        "Bucket URL must not contain a key: {}",
                        url
                    )));
                }
                let backend = if parsed.scheme() == "s3" {
                    Backend::S3(S3Settings::default())
                } else {
                    Backend::Memory
                };
                Ok(BucketUrl { backend, bucket })
            }
            "file" => {
                let path = parsed
                    .to_file_path()
                    .map_err(|_| CloudError::InvalidUrl(format!("Not a local path: {}", url)))?;
                let bucket = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .ok_or_else(|| CloudError::InvalidUrl(format!("Missing bucket name in {}", url)))?
                    .to_string();
                let root = path
                    .parent()
                    .ok_or_else(|| CloudError::InvalidUrl(format!("Missing root directory in {}", url)))?
                    .to_path_buf();
                Ok(BucketUrl {
                    backend: Backend::Local { root },
                    bucket,
                })
            }
            other => Err(CloudError::InvalidUrl(format!(
                "Unsupported scheme: {}. Use s3://, file:// or memory://",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_s3() {
        let url = BucketUrl::parse("s3://my-bucket").unwrap();
        assert_eq!(url.bucket, "my-bucket");
        assert_eq!(url.backend, Backend::S3(S3Settings::default()));
        assert_eq!(url.backend.name(), "s3");
    }

    #[test]
    fn test_parse_memory() {
        let url = BucketUrl::parse("memory://scratch/").unwrap();
        assert_eq!(url.bucket, "scratch");
        assert_eq!(url.backend, Backend::Memory);
    }

    #[cfg(unix)]
    #[test]
    fn test_parse_file() {
        let url = BucketUrl::parse("file:///srv/buckets/photos").unwrap();
        assert_eq!(url.bucket, "photos");
        assert_eq!(
            url.backend,
            Backend::Local {
                root: PathBuf::from("/srv/buckets")
            }
        );
        assert!(!url.backend.lists_in_order());
    }

    #[test]
    fn test_invalid_urls() {
        assert!(BucketUrl::parse("http://example.com/bucket").is_err());
        assert!(BucketUrl::parse("s3://bucket/with/key.txt").is_err());
        assert!(BucketUrl::parse("not a url").is_err());
        assert!(BucketUrl::parse("s3://").is_err());
    }
}
