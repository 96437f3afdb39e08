//! A client wrapper that records calls and injects failures

use bucketfs_core::client::{BucketAcl, ClientError, ClientResult, ListRequest, ListingPage, ObjectInfo};
use bucketfs_core::ObjectStoreClient;
use bytes::Bytes;
use std::sync::{Arc, Mutex, PoisonError};

/// The client request a call or fault refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientOp {
    /// GetBucketAcl
    GetBucketAcl,
    /// CreateBucket
    CreateBucket,
    /// DeleteBucket
    DeleteBucket,
    /// GetObject
    Get,
    /// HeadObject
    Head,
    /// PutObject
    Put,
    /// CopyObject (key is the source)
    Copy,
    /// DeleteObject
    Delete,
    /// ListObjects (key is the prefix)
    List,
}

/// A recorded request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// Which request
    pub op: ClientOp,
    /// Bucket, or key / prefix for object requests
    pub target: String,
}

/// When an injected failure fires
#[derive(Debug, Clone)]
pub struct Fault {
    op: ClientOp,
    target: Option<String>,
    skip: usize,
    times: Option<usize>,
    code: Option<String>,
    status: Option<u16>,
}

impl Fault {
    /// Fail every `op` request
    pub fn on(op: ClientOp) -> Self {
        Self {
            op,
            target: None,
            skip: 0,
            times: None,
            code: None,
            status: None,
        }
    }

    /// Only fail requests addressing this key, prefix or bucket
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Let the first `n` matching requests through
    pub fn after(mut self, n: usize) -> Self {
        self.skip = n;
        self
    }

    /// Fail only `n` times, then pass through again
    pub fn times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    /// Service error code to report
    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Status to report
    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    fn matches(&self, op: ClientOp, target: &str) -> bool {
        self.op == op && self.target.as_deref().map_or(true, |t| t == target)
    }

    fn error(&self, op: ClientOp, target: &str) -> ClientError {
        let mut err = ClientError::new(format!("injected {:?} failure on {}", op, target));
        if let Some(code) = &self.code {
            err = err.code(code.clone());
        }
        if let Some(status) = self.status {
            err = err.status(status);
        }
        err
    }
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<Call>,
    faults: Vec<Fault>,
}

/// Wraps another client, recording each request and failing the ones
/// that match an installed [`Fault`]. A failed request never reaches the
/// wrapped client.
#[derive(Debug)]
pub struct FaultyClient {
    inner: Arc<dyn ObjectStoreClient>,
    state: Mutex<State>,
}

impl FaultyClient {
    /// Wrap a client with no faults installed
    pub fn new(inner: Arc<dyn ObjectStoreClient>) -> Self {
        Self {
            inner,
            state: Mutex::new(State::default()),
        }
    }

    /// Install a fault
    pub fn inject(&self, fault: Fault) {
        self.lock().faults.push(fault);
    }

    /// Remove every fault
    pub fn heal(&self) {
        self.lock().faults.clear();
    }

    /// Requests seen so far, including failed ones
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Number of requests of one kind
    pub fn count(&self, op: ClientOp) -> usize {
        self.lock().calls.iter().filter(|c| c.op == op).count()
    }

    /// Forget recorded requests
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, op: ClientOp, target: &str) -> ClientResult<()> {
        let mut state = self.lock();
        state.calls.push(Call {
            op,
            target: target.to_string(),
        });

        for fault in state.faults.iter_mut().filter(|f| f.matches(op, target)) {
            if fault.skip > 0 {
                fault.skip -= 1;
                continue;
            }
            match fault.times {
                Some(0) => continue,
                Some(ref mut n) => *n -= 1,
                None => {}
            }
            return Err(fault.error(op, target));
        }
        Ok(())
    }
}

impl ObjectStoreClient for FaultyClient {
    fn get_bucket_acl(&self, bucket: &str) -> ClientResult<BucketAcl> {
        self.check(ClientOp::GetBucketAcl, bucket)?;
        self.inner.get_bucket_acl(bucket)
    }

    fn create_bucket(&self, bucket: &str) -> ClientResult<()> {
        self.check(ClientOp::CreateBucket, bucket)?;
        self.inner.create_bucket(bucket)
    }

    fn delete_bucket(&self, bucket: &str) -> ClientResult<()> {
        self.check(ClientOp::DeleteBucket, bucket)?;
        self.inner.delete_bucket(bucket)
    }

    fn get_object(&self, bucket: &str, key: &str) -> ClientResult<Bytes> {
        self.check(ClientOp::Get, key)?;
        self.inner.get_object(bucket, key)
    }

    fn head_object(&self, bucket: &str, key: &str) -> ClientResult<ObjectInfo> {
        self.check(ClientOp::Head, key)?;
        self.inner.head_object(bucket, key)
    }

    fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> ClientResult<()> {
        self.check(ClientOp::Put, key)?;
        self.inner.put_object(bucket, key, body)
    }

    fn copy_object(&self, bucket: &str, from: &str, to: &str) -> ClientResult<()> {
        self.check(ClientOp::Copy, from)?;
        self.inner.copy_object(bucket, from, to)
    }

    fn delete_object(&self, bucket: &str, key: &str) -> ClientResult<()> {
        self.check(ClientOp::Delete, key)?;
        self.inner.delete_object(bucket, key)
    }

    fn list_objects(&self, request: &ListRequest<'_>) -> ClientResult<ListingPage> {
        self.check(ClientOp::List, request.prefix)?;
        self.inner.list_objects(request)
    }
}
