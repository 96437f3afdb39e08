//! A filesystem mapped onto one bucket

use crate::accessor::ObjectAccessor;
use crate::client::{ObjectStoreClient, BUCKET_ALREADY_OWNED};
use crate::error::ObjectError;
use crate::fs::{Fs, FsOp, OpenFlags, Support};
use crate::handle::{FileInfo, MemFile};
use crate::key::normalize_key;
use crate::listing::PrefixPages;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Identifier returned by [`Fs::name`]
pub const FS_NAME: &str = "BucketFs";

/// Options fixed at bootstrap
#[derive(Debug, Clone)]
pub struct FsOptions {
    /// Create the bucket when the store says it does not exist (default: true)
    pub create_missing_bucket: bool,
    /// Keys requested per listing page; `None` uses the store default
    pub page_size: Option<usize>,
}

impl Default for FsOptions {
    fn default() -> Self {
        Self {
            create_missing_bucket: true,
            page_size: None,
        }
    }
}

/// Result of the two-step rename
#[derive(Debug)]
pub enum RenameOutcome {
    /// Copied and the source deleted
    Completed,
    /// The copy failed; the source is untouched and the destination was not written
    CopyFailed(ObjectError),
    /// The copy succeeded but deleting the source failed; both keys exist
    DeleteFailed(ObjectError),
}

impl RenameOutcome {
    /// Whether the rename fully completed
    pub fn is_completed(&self) -> bool {
        matches!(self, RenameOutcome::Completed)
    }

    /// Collapse into a `Result`, keeping which step failed in the error
    pub fn into_result(self, from: &str, to: &str) -> Result<()> {
        match self {
            RenameOutcome::Completed => Ok(()),
            RenameOutcome::CopyFailed(source) => Err(Error::CopyFailed {
                from: from.to_string(),
                to: to.to_string(),
                source,
            }),
            RenameOutcome::DeleteFailed(source) => Err(Error::RenameIncomplete {
                from: from.to_string(),
                to: to.to_string(),
                source,
            }),
        }
    }
}

/// A hierarchical filesystem view of one bucket.
///
/// Immutable after bootstrap and cheap to clone; every call is a
/// self-contained sequence of store requests.
#[derive(Debug, Clone)]
pub struct BucketFs {
    client: Arc<dyn ObjectStoreClient>,
    bucket: String,
    options: FsOptions,
}

impl BucketFs {
    /// Confirm (or create) the bucket and return a filesystem bound to it.
    ///
    /// The bucket ACL is queried as an existence probe. A `NoSuchBucket`
    /// answer leads to a create and a second probe when
    /// `options.create_missing_bucket` is set; every other failure is fatal.
    /// A create answered with `BucketAlreadyOwnedByYou` means another caller
    /// won the race and counts as success.
    pub fn bootstrap(
        client: Arc<dyn ObjectStoreClient>,
        bucket: impl Into<String>,
        options: FsOptions,
    ) -> Result<Self> {
        let bucket = bucket.into();
        if bucket.is_empty() || bucket.contains('/') {
            return Err(Error::InvalidBucketName(bucket));
        }

        match client.get_bucket_acl(&bucket) {
            Ok(acl) => {
                debug!("Bucket {} found (owner: {:?})", bucket, acl.owner);
            }
            Err(e) if e.is_no_such_bucket() && options.create_missing_bucket => {
                info!("Bucket {} does not exist, creating it", bucket);
                match client.create_bucket(&bucket) {
                    Ok(()) => {}
                    Err(e) if e.error_code() == Some(BUCKET_ALREADY_OWNED) => {
                        debug!("Bucket {} was created concurrently", bucket);
                    }
                    Err(source) => return Err(Error::BucketCreateFailed { bucket, source }),
                }
                if let Err(source) = client.get_bucket_acl(&bucket) {
                    return Err(Error::BucketInaccessible { bucket, source });
                }
            }
            Err(source) => return Err(Error::BucketInaccessible { bucket, source }),
        }

        Ok(Self {
            client,
            bucket,
            options,
        })
    }

    /// Bucket this filesystem is bound to
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Options the filesystem was bootstrapped with
    pub fn options(&self) -> &FsOptions {
        &self.options
    }

    /// The underlying store client
    pub fn client(&self) -> &Arc<dyn ObjectStoreClient> {
        &self.client
    }

    fn accessor(&self) -> ObjectAccessor<'_> {
        ObjectAccessor::new(self.client.as_ref(), &self.bucket)
    }

    /// Download an object into a fresh handle.
    ///
    /// The handle is returned even when the download fails, so it is always
    /// safe to use; it is only meaningful when the result is `Ok`.
    pub fn fetch(&self, path: &str) -> (MemFile, Result<()>) {
        let key = match normalize_key(path) {
            Ok(key) => key,
            Err(e) => return (MemFile::new(path), Err(e)),
        };

        match self.accessor().get(&key) {
            Ok(body) => (MemFile::from_body(key, &body), Ok(())),
            Err(e) => (MemFile::new(key), Err(e.into())),
        }
    }

    /// Upload the entire content of a handle to `path`, replacing any
    /// existing object. The handle is marked clean on success.
    pub fn push(&self, file: &mut MemFile, path: &str) -> Result<()> {
        let key = normalize_key(path)?;
        self.accessor().put(&key, file.to_body())?;
        file.mark_clean();
        Ok(())
    }

    /// Store `data` at `path`
    pub fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let mut file = self.create(path)?;
        std::io::Write::write_all(&mut file, data)?;
        self.push(&mut file, path)
    }

    /// Read the whole object at `path`
    pub fn read(&self, path: &str) -> Result<Vec<u8>> {
        Ok(self.open(path)?.into_inner())
    }

    /// Copy then delete, reporting which step (if any) failed.
    ///
    /// Not atomic: between the two steps both keys exist, and a failed
    /// delete leaves them that way. Paths naming the same key only check
    /// that the object exists; the delete step would otherwise remove it.
    pub fn rename_two_phase(&self, old: &str, new: &str) -> Result<RenameOutcome> {
        let from = normalize_key(old)?;
        let to = normalize_key(new)?;
        let accessor = self.accessor();

        if from == to {
            debug!("Rename of {} onto itself", from);
            return Ok(match accessor.head(&from) {
                Ok(_) => RenameOutcome::Completed,
                Err(e) => RenameOutcome::CopyFailed(e),
            });
        }

        if let Err(e) = accessor.copy(&from, &to) {
            return Ok(RenameOutcome::CopyFailed(e));
        }
        if let Err(e) = accessor.delete(&from) {
            warn!("Renamed {} -> {} but the source could not be deleted; both keys exist", from, to);
            return Ok(RenameOutcome::DeleteFailed(e));
        }
        Ok(RenameOutcome::Completed)
    }

    /// Lazily page through the keys under a raw prefix
    pub fn pages(&self, prefix: &str) -> PrefixPages<'_> {
        PrefixPages::new(self.accessor(), prefix.trim_start_matches('/'), self.options.page_size)
    }

    /// All keys under a raw prefix, in order
    pub fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self.pages(prefix).collect_keys()?)
    }

    /// Delete the (empty) bucket, consuming the filesystem
    pub fn delete_bucket(self) -> Result<()> {
        info!("Deleting bucket {}", self.bucket);
        self.client
            .delete_bucket(&self.bucket)
            .map_err(|source| Error::BucketDeleteFailed {
                bucket: self.bucket.clone(),
                source,
            })
    }
}

impl Fs for BucketFs {
    fn name(&self) -> &'static str {
        FS_NAME
    }

    fn create(&self, path: &str) -> Result<MemFile> {
        Ok(MemFile::new(normalize_key(path)?))
    }

    fn open(&self, path: &str) -> Result<MemFile> {
        let (file, result) = self.fetch(path);
        result.map(|_| file)
    }

    fn open_file(&self, path: &str, _flags: OpenFlags, perm: u32) -> Result<MemFile> {
        let file = self.open(path)?;
        self.chmod(path, perm)?;
        Ok(file)
    }

    fn chmod(&self, _path: &str, _mode: u32) -> Result<()> {
        Ok(())
    }

    fn chtimes(&self, _path: &str, _atime: DateTime<Utc>, _mtime: DateTime<Utc>) -> Result<()> {
        Ok(())
    }

    fn stat(&self, path: &str) -> Result<FileInfo> {
        let key = normalize_key(path)?;
        let info = self.accessor().head(&key)?;
        Ok(FileInfo {
            name: info.key,
            size: info.size,
            modified: info.last_modified,
            is_dir: false,
        })
    }

    fn rename(&self, old: &str, new: &str) -> Result<()> {
        self.rename_two_phase(old, new)?.into_result(old, new)
    }

    fn remove(&self, path: &str) -> Result<()> {
        let key = normalize_key(path)?;
        Ok(self.accessor().delete(&key)?)
    }

    fn mkdir(&self, _path: &str, _perm: u32) -> Result<()> {
        Ok(())
    }

    fn mkdir_all(&self, _path: &str, _perm: u32) -> Result<()> {
        Ok(())
    }

    /// Deletes every key starting with `prefix`, one listing page at a time.
    ///
    /// Each page is deleted before the next is fetched. On failure the keys
    /// already deleted stay deleted and the error carries the count.
    fn remove_all(&self, prefix: &str) -> Result<()> {
        let prefix = prefix.trim_start_matches('/');
        let accessor = self.accessor();
        let mut deleted = 0;

        for page in self.pages(prefix) {
            let page = page.map_err(|source| Error::RemoveAllFailed {
                prefix: prefix.to_string(),
                deleted,
                source,
            })?;

            for key in &page.keys {
                accessor.delete(key).map_err(|source| Error::RemoveAllFailed {
                    prefix: prefix.to_string(),
                    deleted,
                    source,
                })?;
                deleted += 1;
            }
        }

        debug!("Removed {} objects under {:?}", deleted, prefix);
        Ok(())
    }

    fn support(&self, op: FsOp) -> Support {
        match op {
            FsOp::Chmod | FsOp::Chtimes | FsOp::Mkdir | FsOp::MkdirAll => Support::Unsupported,
            FsOp::Rename | FsOp::RemoveAll => Support::Emulated,
        }
    }
}
