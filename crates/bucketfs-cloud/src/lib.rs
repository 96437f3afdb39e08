//! # bucketfs-cloud
//!
//! Real object storage for bucketfs. [`CloudClient`] implements
//! `bucketfs_core::ObjectStoreClient` on top of the `object_store` crate, so a
//! [`bucketfs_core::BucketFs`] can sit on Amazon S3 (or any S3-compatible
//! service), a directory on local disk, or an in-process store.
//!
//! ## Architecture
//!
//! - [`Backend`] selects where buckets live; [`BucketUrl`] parses one from a URL
//! - [`CloudClient`] bridges the async `object_store` API onto a Tokio runtime
//!   it owns, one store per bucket; S3 bucket creation, deletion and ACL
//!   lookups go through the AWS SDK
//! - [`Config`] reads the TOML configuration that [`connect`] turns into a
//!   bootstrapped filesystem

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod backend;
mod client;
mod config;
mod error;
mod runtime;
mod s3_buckets;

pub use backend::{Backend, BucketUrl, S3Settings};
pub use client::CloudClient;
pub use config::{BackendKind, Config, FilesystemConfig, StoreConfig};
pub use error::{CloudError, Result};

use bucketfs_core::{BucketFs, FsOptions};
use std::sync::Arc;
use tracing::info;

/// Bootstrap a filesystem from configuration.
///
/// `bucket` overrides the configured bucket name.
pub fn connect(config: &Config, bucket: Option<&str>) -> Result<BucketFs> {
    let bucket = config.bucket(bucket)?;
    let backend = config.backend()?;
    open_bucket(backend, &bucket, config.fs_options())
}

/// Bootstrap a filesystem on the bucket a URL names
pub fn connect_url(url: &str, options: FsOptions) -> Result<BucketFs> {
    let BucketUrl { backend, bucket } = BucketUrl::parse(url)?;
    open_bucket(backend, &bucket, options)
}

fn open_bucket(backend: Backend, bucket: &str, options: FsOptions) -> Result<BucketFs> {
    let name = backend.name();
    let client = Arc::new(CloudClient::new(backend)?);
    let fs = BucketFs::bootstrap(client, bucket, options)?;
    info!("Connected to {} bucket {}", name, bucket);
    Ok(fs)
}
