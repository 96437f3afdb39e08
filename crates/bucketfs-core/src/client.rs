//! The object-store client seam.
//!
//! `ObjectStoreClient` is the only way the filesystem layer talks to a
//! bucket/key store. It mirrors the S3 request set (bucket ACL probe, bucket
//! create/delete, single-object GET/HEAD/PUT/COPY/DELETE and marker-based
//! listing) and is deliberately synchronous: implementations that sit on an
//! async SDK block on their own runtime.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// Store error code for a bucket that does not exist
pub const NO_SUCH_BUCKET: &str = "NoSuchBucket";
/// Store error code for a key that does not exist
pub const NO_SUCH_KEY: &str = "NoSuchKey";
/// Store error code for a refused request
pub const ACCESS_DENIED: &str = "AccessDenied";
/// Store error code for deleting a bucket that still holds objects
pub const BUCKET_NOT_EMPTY: &str = "BucketNotEmpty";
/// Store error code for creating a bucket that already exists
pub const BUCKET_ALREADY_OWNED: &str = "BucketAlreadyOwnedByYou";

/// An error reported by the store, as close to the wire as possible.
///
/// Clients fill in whatever the store told them: a service error code
/// (`NoSuchKey`, `SlowDown`, ...), an HTTP-like status, or both. Turning
/// this into a failure class is the accessor's job, not the client's.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct ClientError {
    code: Option<String>,
    status: Option<u16>,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ClientError {
    /// Create an error with only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            status: None,
            message: message.into(),
            source: None,
        }
    }

    /// Create an error carrying a service error code
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(message).code(code)
    }

    /// Set the service error code
    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Set the HTTP-like status
    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attach the underlying cause
    pub fn caused_by(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// The service error code, if the store sent one
    pub fn error_code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// The HTTP-like status, if known
    pub fn status_code(&self) -> Option<u16> {
        self.status
    }

    /// The human-readable message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the store said the bucket does not exist
    pub fn is_no_such_bucket(&self) -> bool {
        self.code.as_deref() == Some(NO_SUCH_BUCKET)
    }
}

/// Result alias for client calls
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// One grant from a bucket access-control list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclGrant {
    /// Who the grant applies to
    pub grantee: String,
    /// Permission name, e.g. `FULL_CONTROL`
    pub permission: String,
}

/// Access-control metadata of a bucket.
///
/// Only used to prove that the bucket exists and is reachable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketAcl {
    /// Owner of the bucket, when the store reports one
    pub owner: Option<String>,
    /// Grants attached to the bucket
    pub grants: Vec<AclGrant>,
}

/// Metadata for a single object, as returned by HEAD
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Object key
    pub key: String,
    /// Size in bytes
    pub size: u64,
    /// Last modification time, if the store reports one
    pub last_modified: Option<DateTime<Utc>>,
}

/// Parameters of a single ListObjects call
#[derive(Debug, Clone, Copy)]
pub struct ListRequest<'a> {
    /// Bucket to list
    pub bucket: &'a str,
    /// Raw key prefix; every returned key starts with it
    pub prefix: &'a str,
    /// Only keys strictly greater than the marker are returned
    pub marker: Option<&'a str>,
    /// Upper bound on keys per page; `None` uses the store default
    pub max_keys: Option<usize>,
}

/// One page of a listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Keys in ascending order
    pub keys: Vec<String>,
    /// Marker for the next page; `None` when the listing is complete
    pub next_marker: Option<String>,
}

impl ListingPage {
    /// Whether more pages follow this one
    pub fn is_truncated(&self) -> bool {
        self.next_marker.is_some()
    }
}

/// The bucket/key store the filesystem is mapped onto.
///
/// Every method is exactly one request against the store. Implementations
/// must not retry; transient failures are reported to the caller.
pub trait ObjectStoreClient: Send + Sync + fmt::Debug {
    /// Fetch the bucket ACL. Fails with code [`NO_SUCH_BUCKET`] when the
    /// bucket does not exist.
    fn get_bucket_acl(&self, bucket: &str) -> ClientResult<BucketAcl>;

    /// Create a bucket
    fn create_bucket(&self, bucket: &str) -> ClientResult<()>;

    /// Delete an empty bucket
    fn delete_bucket(&self, bucket: &str) -> ClientResult<()>;

    /// Download the full body of an object
    fn get_object(&self, bucket: &str, key: &str) -> ClientResult<Bytes>;

    /// Fetch object metadata without the body
    fn head_object(&self, bucket: &str, key: &str) -> ClientResult<ObjectInfo>;

    /// Store an object, replacing any existing one
    fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> ClientResult<()>;

    /// Server-side copy within one bucket
    fn copy_object(&self, bucket: &str, from: &str, to: &str) -> ClientResult<()>;

    /// Delete an object. Deleting an absent key follows the store's own
    /// contract; S3 treats it as success.
    fn delete_object(&self, bucket: &str, key: &str) -> ClientResult<()>;

    /// List one page of keys under a prefix
    fn list_objects(&self, request: &ListRequest<'_>) -> ClientResult<ListingPage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_builder() {
        let err = ClientError::with_code(NO_SUCH_BUCKET, "bucket gone").status(404);
        assert!(err.is_no_such_bucket());
        assert_eq!(err.error_code(), Some("NoSuchBucket"));
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.to_string(), "bucket gone");
    }

    #[test]
    fn test_client_error_source_chain() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "socket timed out");
        let err = ClientError::new("request failed").caused_by(io);
        assert!(!err.is_no_such_bucket());
        assert_eq!(err.source().map(|e| e.to_string()).as_deref(), Some("socket timed out"));
    }
}
