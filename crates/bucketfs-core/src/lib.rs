//! # bucketfs-core
//!
//! A hierarchical, path-addressed filesystem over a bucket/key object store.
//!
//! ## Architecture
//!
//! - [`normalize_key`] turns a filesystem path into an object key
//! - [`ObjectAccessor`] issues single-object requests and classifies failures
//! - [`PrefixPages`] walks a prefix listing page by page via continuation markers
//! - [`MemFile`] is the in-memory handle objects are read into and pushed from
//! - [`BucketFs`] bootstraps the bucket and implements [`Fs`] on top of the above
//!
//! The store itself is reached through the [`ObjectStoreClient`] trait.
//! [`MemoryClient`] is an in-process implementation; `bucketfs-cloud`
//! provides one backed by real object storage.
//!
//! ```
//! use bucketfs_core::{BucketFs, Fs, FsOptions, MemoryClient};
//! use std::sync::Arc;
//!
//! let fs = BucketFs::bootstrap(Arc::new(MemoryClient::new()), "docs", FsOptions::default())?;
//! fs.write("notes/today.txt", b"hello")?;
//! assert_eq!(fs.open("notes/today.txt")?.contents(), b"hello");
//! # Ok::<(), bucketfs_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod accessor;
pub mod bucket_fs;
pub mod client;
pub mod error;
pub mod fs;
pub mod handle;
pub mod key;
pub mod listing;
pub mod memory;

pub use accessor::{classify, ObjectAccessor};
pub use bucket_fs::{BucketFs, FsOptions, RenameOutcome, FS_NAME};
pub use client::{
    BucketAcl, ClientError, ClientResult, ListRequest, ListingPage, ObjectInfo, ObjectStoreClient,
};
pub use error::{Error, FailureKind, ObjectError, ObjectOp, Result};
pub use fs::{Fs, FsOp, OpenFlags, Support};
pub use handle::{FileInfo, MemFile};
pub use key::normalize_key;
pub use listing::PrefixPages;
pub use memory::MemoryClient;
