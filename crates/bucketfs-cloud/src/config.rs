//! Configuration module

use crate::backend::{Backend, S3Settings};
use crate::{CloudError, Result};
use bucketfs_core::FsOptions;
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Where buckets live
    #[serde(default)]
    pub store: StoreConfig,
    /// Filesystem behaviour
    #[serde(default)]
    pub filesystem: FilesystemConfig,
}

/// Store kinds selectable from configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Amazon S3 or a compatible service
    #[default]
    S3,
    /// Directories on the local disk
    Local,
    /// Process memory; contents vanish on exit
    Memory,
}

/// Store configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend kind
    #[serde(default)]
    pub backend: BackendKind,
    /// Custom S3 endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// S3 region
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Directory holding bucket directories (local backend)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    /// Allow plain-HTTP endpoints
    #[serde(default)]
    pub allow_http: bool,
}

/// Filesystem configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesystemConfig {
    /// Default bucket
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    /// Keys requested per listing page (store default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    /// Create the bucket when it does not exist
    #[serde(default = "default_create_missing_bucket")]
    pub create_missing_bucket: bool,
}

fn default_create_missing_bucket() -> bool {
    true
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            page_size: None,
            create_missing_bucket: default_create_missing_bucket(),
        }
    }
}

impl Config {
    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir()
            .ok_or_else(|| CloudError::Config("Unable to determine config directory".to_string()))?;

        Ok(config_dir.join("bucketfs").join("config.toml"))
    }

    /// Get default configuration content with examples
    pub fn default_config_content() -> String {
        r#"# bucketfs configuration file

[store]
# Backend: s3, local, memory
backend = "s3"
# Custom endpoint for S3-compatible services
# endpoint = "http://localhost:9000"
# region = "us-east-1"
# Allow plain-HTTP endpoints
allow_http = false
# Directory holding one sub-directory per bucket (local backend only)
# root = "/var/lib/bucketfs"

[filesystem]
# Default bucket, overridden by --bucket
# bucket = "my-bucket"
# Keys requested per listing page (store default when unset)
# page_size = 1000
# Create the bucket when it does not exist
create_missing_bucket = true
"#
        .to_string()
    }

    /// Load configuration from the default location, or defaults if there is none
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| CloudError::Config(format!("Failed to parse config: {}", e)))?;

        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Write the commented default configuration to `path`, creating
    /// missing parent directories
    pub fn write_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        fs::write(path, Self::default_config_content())?;
        debug!("Wrote default config to {}", path.display());
        Ok(())
    }

    /// The backend described by the `[store]` section
    pub fn backend(&self) -> Result<Backend> {
        match self.store.backend {
            BackendKind::S3 => Ok(Backend::S3(S3Settings {
                region: self.store.region.clone(),
                endpoint: self.store.endpoint.clone(),
                allow_http: self.store.allow_http,
            })),
            BackendKind::Local => {
                let root = self.store.root.clone().ok_or_else(|| {
                    CloudError::Config("store.root is required for the local backend".to_string())
                })?;
                Ok(Backend::Local { root })
            }
            BackendKind::Memory => Ok(Backend::Memory),
        }
    }

    /// Filesystem options from the `[filesystem]` section
    pub fn fs_options(&self) -> FsOptions {
        FsOptions {
            create_missing_bucket: self.filesystem.create_missing_bucket,
            page_size: self.filesystem.page_size,
        }
    }

    /// The bucket to use: the override if given, otherwise the configured one
    pub fn bucket(&self, bucket_override: Option<&str>) -> Result<String> {
        bucket_override
            .map(str::to_string)
            .or_else(|| self.filesystem.bucket.clone())
            .ok_or_else(|| {
                CloudError::Config("No bucket given; pass --bucket or set filesystem.bucket".to_string())
            })
    }
}
