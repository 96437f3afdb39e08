//! In-process object store
//!
//! `MemoryClient` behaves like an S3 endpoint that lives in a `BTreeMap`:
//! buckets must be created before use, deleting an absent key succeeds,
//! listings are sorted and cut into pages of at most `page_limit` keys.

use crate::client::{
    BucketAcl, ClientError, ClientResult, ListRequest, ListingPage, ObjectInfo, ObjectStoreClient,
};
use crate::client::{AclGrant, BUCKET_ALREADY_OWNED, BUCKET_NOT_EMPTY, NO_SUCH_BUCKET, NO_SUCH_KEY};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{PoisonError, RwLock};

/// Largest page S3 ever returns
pub const DEFAULT_PAGE_LIMIT: usize = 1000;

const OWNER: &str = "bucketfs-memory";

#[derive(Debug, Clone)]
struct StoredObject {
    body: Bytes,
    last_modified: DateTime<Utc>,
}

type Bucket = BTreeMap<String, StoredObject>;

/// An object store held entirely in memory
#[derive(Debug)]
pub struct MemoryClient {
    buckets: RwLock<BTreeMap<String, Bucket>>,
    page_limit: usize,
}

impl Default for MemoryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryClient {
    /// Create an empty store with the S3 page limit
    pub fn new() -> Self {
        Self::with_page_limit(DEFAULT_PAGE_LIMIT)
    }

    /// Create an empty store that returns at most `page_limit` keys per listing page
    pub fn with_page_limit(page_limit: usize) -> Self {
        Self {
            buckets: RwLock::new(BTreeMap::new()),
            page_limit: page_limit.max(1),
        }
    }

    /// Maximum keys per listing page
    pub fn page_limit(&self) -> usize {
        self.page_limit
    }

    /// Number of objects in a bucket, `None` if the bucket does not exist
    pub fn object_count(&self, bucket: &str) -> Option<usize> {
        let buckets = self.buckets.read().unwrap_or_else(PoisonError::into_inner);
        buckets.get(bucket).map(BTreeMap::len)
    }

    /// Whether a bucket exists
    pub fn has_bucket(&self, bucket: &str) -> bool {
        let buckets = self.buckets.read().unwrap_or_else(PoisonError::into_inner);
        buckets.contains_key(bucket)
    }

    fn with_bucket<T>(&self, bucket: &str, f: impl FnOnce(&Bucket) -> ClientResult<T>) -> ClientResult<T> {
        let buckets = self.buckets.read().unwrap_or_else(PoisonError::into_inner);
        let objects = buckets.get(bucket).ok_or_else(|| no_such_bucket(bucket))?;
        f(objects)
    }

    fn with_bucket_mut<T>(
        &self,
        bucket: &str,
        f: impl FnOnce(&mut Bucket) -> ClientResult<T>,
    ) -> ClientResult<T> {
        let mut buckets = self.buckets.write().unwrap_or_else(PoisonError::into_inner);
        let objects = buckets.get_mut(bucket).ok_or_else(|| no_such_bucket(bucket))?;
        f(objects)
    }
}

fn no_such_bucket(bucket: &str) -> ClientError {
    ClientError::with_code(NO_SUCH_BUCKET, format!("The specified bucket does not exist: {}", bucket))
        .status(404)
}

fn no_such_key(key: &str) -> ClientError {
    ClientError::with_code(NO_SUCH_KEY, format!("The specified key does not exist: {}", key)).status(404)
}

impl ObjectStoreClient for MemoryClient {
    fn get_bucket_acl(&self, bucket: &str) -> ClientResult<BucketAcl> {
        self.with_bucket(bucket, |_| {
            Ok(BucketAcl {
                owner: Some(OWNER.to_string()),
                grants: vec![AclGrant {
                    grantee: OWNER.to_string(),
                    permission: "FULL_CONTROL".to_string(),
                }],
            })
        })
    }

    fn create_bucket(&self, bucket: &str) -> ClientResult<()> {
        let mut buckets = self.buckets.write().unwrap_or_else(PoisonError::into_inner);
        if buckets.contains_key(bucket) {
            return Err(ClientError::with_code(
                BUCKET_ALREADY_OWNED,
                format!("Bucket already exists: {}", bucket),
            )
            .status(409));
        }
        buckets.insert(bucket.to_string(), Bucket::new());
        Ok(())
    }

    fn delete_bucket(&self, bucket: &str) -> ClientResult<()> {
        let mut buckets = self.buckets.write().unwrap_or_else(PoisonError::into_inner);
        match buckets.get(bucket) {
            None => Err(no_such_bucket(bucket)),
            Some(objects) if !objects.is_empty() => Err(ClientError::with_code(
                BUCKET_NOT_EMPTY,
                format!("The bucket you tried to delete is not empty: {}", bucket),
            )
            .status(409)),
            Some(_) => {
                buckets.remove(bucket);
                Ok(())
            }
        }
    }

    fn get_object(&self, bucket: &str, key: &str) -> ClientResult<Bytes> {
        self.with_bucket(bucket, |objects| {
            objects
                .get(key)
                .map(|obj| obj.body.clone())
                .ok_or_else(|| no_such_key(key))
        })
    }

    fn head_object(&self, bucket: &str, key: &str) -> ClientResult<ObjectInfo> {
        self.with_bucket(bucket, |objects| {
            let obj = objects.get(key).ok_or_else(|| no_such_key(key))?;
            Ok(ObjectInfo {
                key: key.to_string(),
                size: obj.body.len() as u64,
                last_modified: Some(obj.last_modified),
            })
        })
    }

    fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> ClientResult<()> {
        self.with_bucket_mut(bucket, |objects| {
            // The stored body must not alias the caller's buffer
            let body = Bytes::copy_from_slice(&body);
            objects.insert(
                key.to_string(),
                StoredObject {
                    body,
                    last_modified: Utc::now(),
                },
            );
            Ok(())
        })
    }

    fn copy_object(&self, bucket: &str, from: &str, to: &str) -> ClientResult<()> {
        self.with_bucket_mut(bucket, |objects| {
            let source = objects.get(from).ok_or_else(|| no_such_key(from))?;
            let copy = StoredObject {
                body: source.body.clone(),
                last_modified: Utc::now(),
            };
            objects.insert(to.to_string(), copy);
            Ok(())
        })
    }

    fn delete_object(&self, bucket: &str, key: &str) -> ClientResult<()> {
        self.with_bucket_mut(bucket, |objects| {
            objects.remove(key);
            Ok(())
        })
    }

    fn list_objects(&self, request: &ListRequest<'_>) -> ClientResult<ListingPage> {
        let limit = request
            .max_keys
            .map_or(self.page_limit, |max| max.clamp(1, self.page_limit));

        self.with_bucket(request.bucket, |objects| {
            let start = match request.marker {
                Some(marker) if marker >= request.prefix => Bound::Excluded(marker.to_string()),
                _ => Bound::Included(request.prefix.to_string()),
            };

            let mut keys: Vec<String> = objects
                .range((start, Bound::Unbounded))
                .map(|(key, _)| key)
                .take_while(|key| key.starts_with(request.prefix))
                .take(limit + 1)
                .cloned()
                .collect();

            let next_marker = if keys.len() > limit {
                keys.truncate(limit);
                keys.last().cloned()
            } else {
                None
            };

            Ok(ListingPage { keys, next_marker })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(keys: &[&str], page_limit: usize) -> MemoryClient {
        let client = MemoryClient::with_page_limit(page_limit);
        client.create_bucket("b").unwrap();
        for key in keys {
            client.put_object("b", key, Bytes::from_static(b"x")).unwrap();
        }
        client
    }

    fn list(client: &MemoryClient, prefix: &str, marker: Option<&str>) -> ListingPage {
        client
            .list_objects(&ListRequest {
                bucket: "b",
                prefix,
                marker,
                max_keys: None,
            })
            .unwrap()
    }

    #[test]
    fn test_missing_bucket() {
        let client = MemoryClient::new();
        let err = client.get_bucket_acl("nope").unwrap_err();
        assert!(err.is_no_such_bucket());
        assert!(client.get_object("nope", "k").unwrap_err().is_no_such_bucket());
    }

    #[test]
    fn test_create_twice() {
        let client = MemoryClient::new();
        client.create_bucket("b").unwrap();
        let err = client.create_bucket("b").unwrap_err();
        assert_eq!(err.error_code(), Some(BUCKET_ALREADY_OWNED));
    }

    #[test]
    fn test_delete_bucket_requires_empty() {
        let client = store_with(&["k"], 10);
        let err = client.delete_bucket("b").unwrap_err();
        assert_eq!(err.error_code(), Some(BUCKET_NOT_EMPTY));

        client.delete_object("b", "k").unwrap();
        client.delete_bucket("b").unwrap();
        assert!(!client.has_bucket("b"));
    }

    #[test]
    fn test_delete_absent_key_succeeds() {
        let client = store_with(&[], 10);
        client.delete_object("b", "ghost").unwrap();
        client.delete_object("b", "ghost").unwrap();
    }

    #[test]
    fn test_list_prefix_is_raw_string() {
        let client = store_with(&["a/1", "a/2", "ab", "b/1"], 10);
        let page = list(&client, "a", None);
        assert_eq!(page.keys, vec!["a/1", "a/2", "ab"]);
        assert!(!page.is_truncated());

        let page = list(&client, "a/", None);
        assert_eq!(page.keys, vec!["a/1", "a/2"]);
    }

    #[test]
    fn test_list_pages() {
        let client = store_with(&["p/1", "p/2", "p/3", "p/4", "p/5"], 2);

        let first = list(&client, "p/", None);
        assert_eq!(first.keys, vec!["p/1", "p/2"]);
        assert_eq!(first.next_marker.as_deref(), Some("p/2"));

        let second = list(&client, "p/", first.next_marker.as_deref());
        assert_eq!(second.keys, vec!["p/3", "p/4"]);

        let third = list(&client, "p/", second.next_marker.as_deref());
        assert_eq!(third.keys, vec!["p/5"]);
        assert!(third.next_marker.is_none());
    }

    #[test]
    fn test_exact_page_boundary() {
        let client = store_with(&["p/1", "p/2"], 2);
        let page = list(&client, "p/", None);
        assert_eq!(page.keys.len(), 2);
        assert!(page.next_marker.is_none());
    }

    #[test]
    fn test_copy_is_independent() {
        let client = store_with(&["src"], 10);
        client.copy_object("b", "src", "dst").unwrap();
        client.put_object("b", "src", Bytes::from_static(b"changed")).unwrap();
        assert_eq!(client.get_object("b", "dst").unwrap(), Bytes::from_static(b"x"));
        assert_eq!(client.object_count("b"), Some(2));
    }
}
