//! `ObjectStoreClient` over the `object_store` crate

use crate::backend::Backend;
use crate::runtime::build_runtime;
use crate::s3_buckets::S3Buckets;
use bucketfs_core::client::{
    BucketAcl, ClientError, ClientResult, ListRequest, ListingPage, ObjectInfo, ACCESS_DENIED,
    BUCKET_ALREADY_OWNED, BUCKET_NOT_EMPTY, NO_SUCH_BUCKET, NO_SUCH_KEY,
};
use bucketfs_core::ObjectStoreClient;
use bytes::Bytes;
use futures_util::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{DynObjectStore, ObjectMeta, ObjectStore, PutPayload};
use percent_encoding::percent_decode_str;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Runtime;
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Page size used when a listing does not ask for one
const DEFAULT_MAX_KEYS: usize = 1000;

/// A synchronous client for S3, local directories or in-memory buckets.
///
/// Every request is driven to completion on the client's own Tokio
/// runtime, so the client must not be called from inside an async task.
/// Object requests go through `object_store`; on S3, requests addressing
/// the bucket itself go through the AWS SDK.
#[derive(Debug)]
pub struct CloudClient {
    backend: Backend,
    runtime: Arc<Runtime>,
    stores: Mutex<HashMap<String, Arc<DynObjectStore>>>,
    s3: Option<S3Buckets>,
}

impl CloudClient {
    /// Create a client for a backend
    pub fn new(backend: Backend) -> crate::Result<Self> {
        let runtime = build_runtime()?;
        let s3 = match &backend {
            Backend::S3(settings) => Some(S3Buckets::new(settings)),
            _ => None,
        };
        debug!("Created {} client", backend.name());
        Ok(Self {
            backend,
            runtime,
            stores: Mutex::new(HashMap::new()),
            s3,
        })
    }

    /// The backend this client talks to
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    fn stores(&self) -> MutexGuard<'_, HashMap<String, Arc<DynObjectStore>>> {
        self.stores.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The store for a bucket, built on first use
    fn store(&self, bucket: &str) -> ClientResult<Arc<DynObjectStore>> {
        if let Some(store) = self.stores().get(bucket) {
            return Ok(Arc::clone(store));
        }

        let store: Arc<DynObjectStore> = match &self.backend {
            Backend::S3(settings) => {
                let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
                if let Some(region) = &settings.region {
                    builder = builder.with_region(region);
                }
                if let Some(endpoint) = &settings.endpoint {
                    builder = builder.with_endpoint(endpoint);
                }
                if settings.allow_http {
                    builder = builder.with_allow_http(true);
                }
                Arc::new(builder.build().map_err(to_client_error)?)
            }
            Backend::Local { root } => {
                let dir = root.join(bucket);
                if !dir.is_dir() {
                    return Err(no_such_bucket(bucket));
                }
                Arc::new(LocalFileSystem::new_with_prefix(&dir).map_err(to_client_error)?)
            }
            // In-memory buckets only exist once created
            Backend::Memory => return Err(no_such_bucket(bucket)),
        };

        trace!("Opened {} store for bucket {}", self.backend.name(), bucket);
        let mut stores = self.stores();
        let store = stores.entry(bucket.to_string()).or_insert(store);
        Ok(Arc::clone(store))
    }

    fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Scan for the next page of keys under a raw prefix
    fn scan(
        &self,
        store: &DynObjectStore,
        prefix: &str,
        marker: Option<&str>,
        limit: usize,
    ) -> ClientResult<ListingPage> {
        let parent = prefix.rfind('/').map(|i| Path::from(&prefix[..i]));
        let wanted = encoded_prefix(prefix);
        // Markers are raw keys; encode them the way listed locations are
        let offset = marker.map(Path::from);
        let ordered = self.backend.lists_in_order();

        let mut keys = self.block_on(async {
            let mut stream = match &offset {
                Some(offset) => store.list_with_offset(parent.as_ref(), offset),
                None => store.list(parent.as_ref()),
            };

            // Collect one key past the limit to detect truncation, comparing
            // keys in their encoded form so the order matches the offset
            let mut heap: BinaryHeap<String> = BinaryHeap::new();
            let mut sorted = Vec::new();
            while let Some(meta) = stream.try_next().await? {
                let key = meta.location.to_string();
                if !key.starts_with(&wanted) {
                    if ordered && key > wanted {
                        break;
                    }
                    continue;
                }
                if ordered {
                    sorted.push(key);
                    if sorted.len() > limit {
                        break;
                    }
                } else {
                    heap.push(key);
                    if heap.len() > limit + 1 {
                        heap.pop();
                    }
                }
            }
            Ok::<_, object_store::Error>(if ordered { sorted } else { heap.into_sorted_vec() })
        })
        .map_err(to_client_error)?;

        let truncated = keys.len() > limit;
        keys.truncate(limit);
        let keys: Vec<String> = keys.iter().map(|k| decode_key(k)).collect();
        let next_marker = if truncated { keys.last().cloned() } else { None };
        Ok(ListingPage { keys, next_marker })
    }
}

impl ObjectStoreClient for CloudClient {
    fn get_bucket_acl(&self, bucket: &str) -> ClientResult<BucketAcl> {
        if let Some(s3) = &self.s3 {
            return self.block_on(s3.acl(bucket));
        }
        self.store(bucket)?;
        Ok(BucketAcl::default())
    }

    fn create_bucket(&self, bucket: &str) -> ClientResult<()> {
        match &self.backend {
            Backend::S3(_) => match &self.s3 {
                Some(s3) => self.block_on(s3.create(bucket)),
                None => Err(ClientError::new("S3 bucket client is not configured")),
            },
            Backend::Local { root } => {
                let dir = root.join(bucket);
                if dir.is_dir() {
                    return Err(already_owned(bucket));
                }
                std::fs::create_dir_all(&dir)
                    .map_err(|e| ClientError::new(format!("creating {}: {}", dir.display(), e)).caused_by(e))?;
                debug!("Created bucket directory {}", dir.display());
                Ok(())
            }
            Backend::Memory => {
                let mut stores = self.stores();
                if stores.contains_key(bucket) {
                    return Err(already_owned(bucket));
                }
                stores.insert(bucket.to_string(), Arc::new(InMemory::new()));
                Ok(())
            }
        }
    }

    fn delete_bucket(&self, bucket: &str) -> ClientResult<()> {
        match &self.backend {
            Backend::S3(_) => match &self.s3 {
                Some(s3) => {
                    self.block_on(s3.delete(bucket))?;
                    self.stores().remove(bucket);
                    Ok(())
                }
                None => Err(ClientError::new("S3 bucket client is not configured")),
            },
            Backend::Local { root } => {
                let dir = root.join(bucket);
                if !dir.is_dir() {
                    return Err(no_such_bucket(bucket));
                }
                let has_objects = WalkDir::new(&dir)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .any(|e| e.file_type().is_file());
                if has_objects {
                    return Err(not_empty(bucket));
                }
                std::fs::remove_dir_all(&dir)
                    .map_err(|e| ClientError::new(format!("removing {}: {}", dir.display(), e)).caused_by(e))?;
                self.stores().remove(bucket);
                Ok(())
            }
            Backend::Memory => {
                let store = self.store(bucket)?;
                let first = self
                    .block_on(async { store.list(None).try_next().await })
                    .map_err(to_client_error)?;
                if first.is_some() {
                    return Err(not_empty(bucket));
                }
                self.stores().remove(bucket);
                Ok(())
            }
        }
    }

    fn get_object(&self, bucket: &str, key: &str) -> ClientResult<Bytes> {
        let store = self.store(bucket)?;
        let path = Path::from(key);
        self.block_on(async { store.get(&path).await?.bytes().await })
            .map_err(to_client_error)
    }

    fn head_object(&self, bucket: &str, key: &str) -> ClientResult<ObjectInfo> {
        let store = self.store(bucket)?;
        let meta = self
            .block_on(store.head(&Path::from(key)))
            .map_err(to_client_error)?;
        Ok(object_info(key, &meta))
    }

    fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> ClientResult<()> {
        let store = self.store(bucket)?;
        self.block_on(store.put(&Path::from(key), PutPayload::from(body)))
            .map_err(to_client_error)?;
        Ok(())
    }

    fn copy_object(&self, bucket: &str, from: &str, to: &str) -> ClientResult<()> {
        let store = self.store(bucket)?;
        self.block_on(store.copy(&Path::from(from), &Path::from(to)))
            .map_err(to_client_error)
    }

    fn delete_object(&self, bucket: &str, key: &str) -> ClientResult<()> {
        let store = self.store(bucket)?;
        match self.block_on(store.delete(&Path::from(key))) {
            Ok(()) => Ok(()),
            // Deleting an absent key succeeds, as it does on S3
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(to_client_error(e)),
        }
    }

    fn list_objects(&self, request: &ListRequest<'_>) -> ClientResult<ListingPage> {
        let store = self.store(request.bucket)?;
        let limit = request.max_keys.unwrap_or(DEFAULT_MAX_KEYS).max(1);
        self.scan(store.as_ref(), request.prefix, request.marker, limit)
    }
}

/// The prefix as it appears in encoded object paths
fn encoded_prefix(prefix: &str) -> String {
    let mut encoded = Path::from(prefix).to_string();
    if prefix.ends_with('/') && !encoded.is_empty() {
        encoded.push('/');
    }
    encoded
}

/// The raw key an encoded object path stands for
fn decode_key(encoded: &str) -> String {
    encoded
        .split('/')
        .map(|part| percent_decode_str(part).decode_utf8_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn object_info(key: &str, meta: &ObjectMeta) -> ObjectInfo {
    ObjectInfo {
        key: key.to_string(),
        size: meta.size as u64,
        last_modified: Some(meta.last_modified),
    }
}

fn no_such_bucket(bucket: &str) -> ClientError {
    ClientError::with_code(NO_SUCH_BUCKET, format!("bucket {} does not exist", bucket)).status(404)
}

fn already_owned(bucket: &str) -> ClientError {
    ClientError::with_code(BUCKET_ALREADY_OWNED, format!("bucket {} already exists", bucket)).status(409)
}

fn not_empty(bucket: &str) -> ClientError {
    ClientError::with_code(BUCKET_NOT_EMPTY, format!("bucket {} is not empty", bucket)).status(409)
}

/// Translate an `object_store` error into the store's own vocabulary
pub(crate) fn to_client_error(err: object_store::Error) -> ClientError {
    let message = err.to_string();
    let mapped = match &err {
        object_store::Error::NotFound { .. } => ClientError::with_code(NO_SUCH_KEY, message).status(404),
        object_store::Error::AlreadyExists { .. } => ClientError::new(message).status(409),
        object_store::Error::NotImplemented | object_store::Error::NotSupported { .. } => {
            ClientError::with_code("NotImplemented", message)
        }
        object_store::Error::JoinError { .. } => ClientError::with_code("InternalError", message).status(500),
        _ => from_message(message),
    };
    mapped.caused_by(err)
}

/// Recover a service code from a generic error's text
pub(crate) fn from_message(message: String) -> ClientError {
    let lower = message.to_lowercase();
    if message.contains(NO_SUCH_BUCKET) {
        ClientError::with_code(NO_SUCH_BUCKET, message).status(404)
    } else if message.contains(ACCESS_DENIED) || lower.contains("forbidden") || lower.contains("permission denied") {
        ClientError::with_code(ACCESS_DENIED, message).status(403)
    } else if message.contains("InvalidAccessKeyId") || message.contains("SignatureDoesNotMatch") {
        ClientError::with_code(ACCESS_DENIED, message).status(401)
    } else if lower.contains("timed out") || lower.contains("timeout") || lower.contains("connection") {
        ClientError::with_code("Timeout", message)
    } else {
        ClientError::new(message)
    }
}
