//! The generic filesystem interface

use crate::handle::{FileInfo, MemFile};
use crate::Result;
use chrono::{DateTime, Utc};

/// Filesystem operations that a backend may or may not support natively
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsOp {
    /// `chmod`
    Chmod,
    /// `chtimes`
    Chtimes,
    /// `mkdir`
    Mkdir,
    /// `mkdir_all`
    MkdirAll,
    /// `rename`
    Rename,
    /// `remove_all`
    RemoveAll,
}

/// How a backend handles an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support {
    /// The operation has its usual effect
    Native,
    /// The operation is emulated with weaker guarantees
    Emulated,
    /// The operation is accepted and always succeeds, but does nothing
    Unsupported,
}

/// Open flags, in the spirit of `std::fs::OpenOptions`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    /// Open for reading
    pub read: bool,
    /// Open for writing
    pub write: bool,
    /// Append to the end
    pub append: bool,
    /// Create if missing
    pub create: bool,
    /// Truncate on open
    pub truncate: bool,
}

impl OpenFlags {
    /// Read-only flags
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Default::default()
        }
    }

    /// Read-write flags
    pub fn read_write() -> Self {
        Self {
            read: true,
            write: true,
            ..Default::default()
        }
    }
}

/// A path-addressed filesystem.
///
/// Handles returned by `create`/`open` are in-memory; how their content
/// gets back to storage is up to the implementation.
pub trait Fs {
    /// Identifier of the implementation
    fn name(&self) -> &'static str;

    /// Create a new, empty file handle
    fn create(&self, path: &str) -> Result<MemFile>;

    /// Open an existing file
    fn open(&self, path: &str) -> Result<MemFile>;

    /// Open with flags and permissions
    fn open_file(&self, path: &str, flags: OpenFlags, perm: u32) -> Result<MemFile>;

    /// Change permission bits
    fn chmod(&self, path: &str, mode: u32) -> Result<()>;

    /// Change access and modification times
    fn chtimes(&self, path: &str, atime: DateTime<Utc>, mtime: DateTime<Utc>) -> Result<()>;

    /// Query file metadata
    fn stat(&self, path: &str) -> Result<FileInfo>;

    /// Move a file to a new path
    fn rename(&self, old: &str, new: &str) -> Result<()>;

    /// Remove one file
    fn remove(&self, path: &str) -> Result<()>;

    /// Create a directory
    fn mkdir(&self, path: &str, perm: u32) -> Result<()>;

    /// Create a directory and all of its parents
    fn mkdir_all(&self, path: &str, perm: u32) -> Result<()>;

    /// Remove everything under a path
    fn remove_all(&self, path: &str) -> Result<()>;

    /// How this filesystem handles `op`
    fn support(&self, op: FsOp) -> Support;
}
