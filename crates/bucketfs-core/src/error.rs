//! Error types for bucketfs-core

use crate::client::ClientError;
use std::fmt;
use thiserror::Error;

/// How a failed store call is classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The key (or bucket) does not exist
    NotFound,
    /// The store refused the request
    AccessDenied,
    /// Network trouble or a server-side 5xx-style failure
    Transient,
    /// Anything the classifier could not place
    Unknown,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::NotFound => "not found",
            FailureKind::AccessDenied => "access denied",
            FailureKind::Transient => "transient failure",
            FailureKind::Unknown => "store error",
        };
        f.write_str(name)
    }
}

/// The single-object (or listing) request that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectOp {
    /// GetObject
    Get,
    /// HeadObject
    Head,
    /// PutObject
    Put,
    /// CopyObject
    Copy,
    /// DeleteObject
    Delete,
    /// ListObjects
    List,
}

impl fmt::Display for ObjectOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectOp::Get => "GET",
            ObjectOp::Head => "HEAD",
            ObjectOp::Put => "PUT",
            ObjectOp::Copy => "COPY",
            ObjectOp::Delete => "DELETE",
            ObjectOp::List => "LIST",
        };
        f.write_str(name)
    }
}

/// A classified failure of one store request
#[derive(Error, Debug)]
#[error("{op} {key}: {kind}: {source}")]
pub struct ObjectError {
    /// Request that failed
    pub op: ObjectOp,
    /// Key (or prefix, for listings) the request addressed
    pub key: String,
    /// Classification of the failure
    pub kind: FailureKind,
    /// Error as reported by the client
    #[source]
    pub source: ClientError,
}

impl ObjectError {
    /// Whether the object was missing
    pub fn is_not_found(&self) -> bool {
        self.kind == FailureKind::NotFound
    }
}

/// Errors surfaced by the filesystem layer
#[derive(Error, Debug)]
pub enum Error {
    /// The path cannot be turned into an object key
    #[error("Invalid path: {0:?}")]
    InvalidPath(String),

    /// The bucket name is unusable
    #[error("Invalid bucket name: {0:?}")]
    InvalidBucketName(String),

    /// Bootstrap could not confirm the bucket
    #[error("Bucket {bucket} is inaccessible: {source}")]
    BucketInaccessible {
        /// Bucket name
        bucket: String,
        /// Unchanged client error
        #[source]
        source: ClientError,
    },

    /// The bucket was missing and creating it failed
    #[error("Failed to create bucket {bucket}: {source}")]
    BucketCreateFailed {
        /// Bucket name
        bucket: String,
        /// Unchanged client error
        #[source]
        source: ClientError,
    },

    /// Tearing down the bucket failed
    #[error("Failed to delete bucket {bucket}: {source}")]
    BucketDeleteFailed {
        /// Bucket name
        bucket: String,
        /// Unchanged client error
        #[source]
        source: ClientError,
    },

    /// A single-object request failed
    #[error(transparent)]
    Object(#[from] ObjectError),

    /// Rename aborted at the copy step; the source is untouched
    #[error("Rename {from} -> {to} failed at copy, source untouched: {source}")]
    CopyFailed {
        /// Source key
        from: String,
        /// Destination key
        to: String,
        /// The failed COPY
        #[source]
        source: ObjectError,
    },

    /// Rename copied the object but could not delete the source; both keys exist
    #[error("Rename {from} -> {to} incomplete, both keys exist: {source}")]
    RenameIncomplete {
        /// Source key, still present
        from: String,
        /// Destination key, already written
        to: String,
        /// The failed DELETE
        #[source]
        source: ObjectError,
    },

    /// Bulk deletion stopped partway; `deleted` keys are already gone
    #[error("Remove all under {prefix:?} stopped after {deleted} deletions: {source}")]
    RemoveAllFailed {
        /// Prefix being removed
        prefix: String,
        /// Number of objects deleted before the failure
        deleted: usize,
        /// The failed LIST or DELETE, naming the key at fault
        #[source]
        source: ObjectError,
    },

    /// I/O on an in-memory handle failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Failure class of the underlying store request, if there was one
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Error::Object(e)
            | Error::CopyFailed { source: e, .. }
            | Error::RenameIncomplete { source: e, .. }
            | Error::RemoveAllFailed { source: e, .. } => Some(e.kind),
            _ => None,
        }
    }

    /// Whether the error means the object does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Object(e) if e.is_not_found())
    }
}

/// Result alias for filesystem operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(io_err) => io_err,
            invalid @ (Error::InvalidPath(_) | Error::InvalidBucketName(_)) => {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, invalid)
            }
            other => {
                let kind = match other.kind() {
                    Some(FailureKind::NotFound) => std::io::ErrorKind::NotFound,
                    Some(FailureKind::AccessDenied) => std::io::ErrorKind::PermissionDenied,
                    _ => std::io::ErrorKind::Other,
                };
                std::io::Error::new(kind, other)
            }
        }
    }
}
