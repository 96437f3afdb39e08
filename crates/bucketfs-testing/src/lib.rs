//! Testing utilities and fixtures for bucketfs
//!
//! This crate provides seeded in-memory buckets, a fault-injecting client
//! wrapper, and assertions shared by the bucketfs test suites.

#![warn(missing_debug_implementations)]

use anyhow::Result;
use bucketfs_core::{BucketFs, FsOptions, MemoryClient, ObjectStoreClient};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

pub mod assertions;
pub mod faulty;
pub mod fixtures;

pub use faulty::{Call, ClientOp, Fault, FaultyClient};

/// Bucket name used throughout the suites
pub const TEST_BUCKET: &str = "testbucket.s3fs";
/// Key of the seeded object
pub const TEST_KEY: &str = "a/test/key.ext";
/// Content of the seeded object
pub const TEST_OBJECT: &str = "This is some random text to go in here";

/// An in-memory bucket with a filesystem bootstrapped on top of it,
/// optionally routed through a [`FaultyClient`]
#[derive(Debug)]
pub struct TestBucket {
    store: Arc<MemoryClient>,
    faults: Arc<FaultyClient>,
    fs: BucketFs,
}

impl TestBucket {
    /// A fresh, empty bucket with the S3 page limit
    pub fn new() -> Result<Self> {
        Self::with_page_limit(bucketfs_core::memory::DEFAULT_PAGE_LIMIT)
    }

    /// A fresh, empty bucket whose listings return at most `page_limit` keys
    pub fn with_page_limit(page_limit: usize) -> Result<Self> {
        let store = Arc::new(MemoryClient::with_page_limit(page_limit));
        let faults = Arc::new(FaultyClient::new(store.clone()));
        let fs = BucketFs::bootstrap(faults.clone(), TEST_BUCKET, FsOptions::default())?;
        faults.clear_calls();
        Ok(Self { store, faults, fs })
    }

    /// A bucket already holding [`TEST_KEY`] = [`TEST_OBJECT`]
    pub fn seeded() -> Result<Self> {
        let bucket = Self::new()?;
        bucket.put(TEST_KEY, TEST_OBJECT.as_bytes())?;
        Ok(bucket)
    }

    /// The filesystem under test
    pub fn fs(&self) -> &BucketFs {
        &self.fs
    }

    /// The wrapper used to inject faults and inspect calls
    pub fn faults(&self) -> &FaultyClient {
        &self.faults
    }

    /// The backing store, bypassing fault injection
    pub fn store(&self) -> &MemoryClient {
        &self.store
    }

    /// Write an object directly into the store
    pub fn put(&self, key: &str, body: &[u8]) -> Result<()> {
        self.store
            .put_object(TEST_BUCKET, key, bytes::Bytes::copy_from_slice(body))?;
        Ok(())
    }

    /// Read an object directly from the store, `None` if absent
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.store
            .get_object(TEST_BUCKET, key)
            .ok()
            .map(|body| body.to_vec())
    }

    /// Number of objects in the bucket
    pub fn len(&self) -> usize {
        self.store.object_count(TEST_BUCKET).unwrap_or(0)
    }

    /// Whether the bucket holds no objects
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A temporary directory serving as the root of a local-directory object store
#[derive(Debug)]
pub struct LocalRoot {
    dir: TempDir,
}

impl LocalRoot {
    /// Creates a new temporary root
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    /// Path of the root directory
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path a bucket maps to under this root
    pub fn bucket_path(&self, bucket: &str) -> std::path::PathBuf {
        self.dir.path().join(bucket)
    }
}
