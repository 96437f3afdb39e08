//! Typed single-object access with failure classification

use crate::client::{ClientError, ListRequest, ListingPage, ObjectInfo, ObjectStoreClient};
use crate::client::{ACCESS_DENIED, NO_SUCH_BUCKET, NO_SUCH_KEY};
use crate::error::{FailureKind, ObjectError, ObjectOp};
use bytes::Bytes;
use tracing::{debug, trace};

/// Codes S3-style services use for retryable conditions
const TRANSIENT_CODES: &[&str] = &[
    "SlowDown",
    "RequestTimeout",
    "RequestTimeTooSkewed",
    "InternalError",
    "ServiceUnavailable",
    "Throttling",
    "Timeout",
];

/// Classify a client error.
///
/// The service error code wins over the status when both are present.
pub fn classify(err: &ClientError) -> FailureKind {
    if let Some(code) = err.error_code() {
        match code {
            NO_SUCH_KEY | NO_SUCH_BUCKET | "NotFound" => return FailureKind::NotFound,
            ACCESS_DENIED | "Forbidden" | "InvalidAccessKeyId" | "SignatureDoesNotMatch" => {
                return FailureKind::AccessDenied
            }
            c if TRANSIENT_CODES.contains(&c) => return FailureKind::Transient,
            _ => {}
        }
    }

    match err.status_code() {
        Some(404) => FailureKind::NotFound,
        Some(401) | Some(403) => FailureKind::AccessDenied,
        Some(408) | Some(429) => FailureKind::Transient,
        Some(s) if (500..600).contains(&s) => FailureKind::Transient,
        _ => FailureKind::Unknown,
    }
}

/// Issues exactly one store request per call against a fixed bucket.
///
/// No retries and no local state: a failure is classified and returned.
#[derive(Debug, Clone, Copy)]
pub struct ObjectAccessor<'a> {
    client: &'a dyn ObjectStoreClient,
    bucket: &'a str,
}

impl<'a> ObjectAccessor<'a> {
    /// Create an accessor for one bucket
    pub fn new(client: &'a dyn ObjectStoreClient, bucket: &'a str) -> Self {
        Self { client, bucket }
    }

    /// Bucket this accessor addresses
    pub fn bucket(&self) -> &str {
        self.bucket
    }

    /// Download the whole object
    pub fn get(&self, key: &str) -> Result<Bytes, ObjectError> {
        debug!("GET {}/{}", self.bucket, key);
        let body = self
            .client
            .get_object(self.bucket, key)
            .map_err(|e| fail(ObjectOp::Get, key, e))?;
        trace!("GET {} returned {} bytes", key, body.len());
        Ok(body)
    }

    /// Fetch object metadata only
    pub fn head(&self, key: &str) -> Result<ObjectInfo, ObjectError> {
        debug!("HEAD {}/{}", self.bucket, key);
        self.client
            .head_object(self.bucket, key)
            .map_err(|e| fail(ObjectOp::Head, key, e))
    }

    /// Store the object, overwriting unconditionally
    pub fn put(&self, key: &str, body: Bytes) -> Result<(), ObjectError> {
        debug!("PUT {}/{} ({} bytes)", self.bucket, key, body.len());
        self.client
            .put_object(self.bucket, key, body)
            .map_err(|e| fail(ObjectOp::Put, key, e))
    }

    /// Server-side copy; the error names the source key
    pub fn copy(&self, from: &str, to: &str) -> Result<(), ObjectError> {
        debug!("COPY {}/{} -> {}", self.bucket, from, to);
        self.client
            .copy_object(self.bucket, from, to)
            .map_err(|e| fail(ObjectOp::Copy, from, e))
    }

    /// Delete one object
    pub fn delete(&self, key: &str) -> Result<(), ObjectError> {
        debug!("DELETE {}/{}", self.bucket, key);
        self.client
            .delete_object(self.bucket, key)
            .map_err(|e| fail(ObjectOp::Delete, key, e))
    }

    /// Fetch one listing page
    pub fn list_page(
        &self,
        prefix: &str,
        marker: Option<&str>,
        max_keys: Option<usize>,
    ) -> Result<ListingPage, ObjectError> {
        trace!("LIST {}/{}* after {:?}", self.bucket, prefix, marker);
        let request = ListRequest {
            bucket: self.bucket,
            prefix,
            marker,
            max_keys,
        };
        self.client
            .list_objects(&request)
            .map_err(|e| fail(ObjectOp::List, prefix, e))
    }
}

fn fail(op: ObjectOp, key: &str, source: ClientError) -> ObjectError {
    let kind = classify(&source);
    debug!("{} {} failed ({}): {}", op, key, kind, source);
    ObjectError {
        op,
        key: key.to_string(),
        kind,
        source,
    }
}
