//! In-memory file handles and their bridge to object bodies

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

/// Metadata returned by `stat`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Object key the metadata belongs to
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Last modification time, when known
    pub modified: Option<DateTime<Utc>>,
    /// Always false; object stores have no directory entities
    pub is_dir: bool,
}

/// A seekable, readable, writable buffer standing in for an open file.
///
/// A handle owns its bytes outright and knows nothing about the store after
/// it is created; changes only reach the bucket through an explicit push.
#[derive(Debug, Clone, Default)]
pub struct MemFile {
    name: String,
    data: Cursor<Vec<u8>>,
    dirty: bool,
}

impl MemFile {
    /// Create an empty handle
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Cursor::new(Vec::new()),
            dirty: false,
        }
    }

    /// Create a handle holding a copy of an object body, cursor at the start
    pub fn from_body(name: impl Into<String>, body: &[u8]) -> Self {
        Self {
            name: name.into(),
            data: Cursor::new(body.to_vec()),
            dirty: false,
        }
    }

    /// Name of the handle (the object key)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entire buffered content, regardless of the cursor
    pub fn contents(&self) -> &[u8] {
        self.data.get_ref()
    }

    /// Copy the entire content into an object body
    pub fn to_body(&self) -> Bytes {
        Bytes::copy_from_slice(self.data.get_ref())
    }

    /// Consume the handle, returning its content
    pub fn into_inner(self) -> Vec<u8> {
        self.data.into_inner()
    }

    /// Content length in bytes
    pub fn len(&self) -> u64 {
        self.data.get_ref().len() as u64
    }

    /// Whether the handle holds no bytes
    pub fn is_empty(&self) -> bool {
        self.data.get_ref().is_empty()
    }

    /// Current cursor position
    pub fn position(&self) -> u64 {
        self.data.position()
    }

    /// Whether the handle was written since it was created or last pushed
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark the content as in sync with the store
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Cut the content to `len` bytes (or zero-extend to it)
    pub fn set_len(&mut self, len: u64) {
        let len = len as usize;
        self.data.get_mut().resize(len, 0);
        if self.data.position() as usize > len {
            self.data.set_position(len as u64);
        }
        self.dirty = true;
    }

    /// Metadata describing the buffered content
    pub fn stat(&self) -> FileInfo {
        FileInfo {
            name: self.name.clone(),
            size: self.len(),
            modified: None,
            is_dir: false,
        }
    }
}

impl Read for MemFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.data.read(buf)
    }
}

impl Write for MemFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.data.write(buf)?;
        if n > 0 {
            self.dirty = true;
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        // Nothing leaves memory until the handle is pushed
        Ok(())
    }
}

impl Seek for MemFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.data.seek(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_handle_is_clean_and_empty() {
        let file = MemFile::new("a.txt");
        assert_eq!(file.name(), "a.txt");
        assert!(file.is_empty());
        assert!(!file.is_dirty());
    }

    #[test]
    fn test_body_round_trip() {
        let mut file = MemFile::from_body("k", b"hello world");
        let mut out = String::new();
        file.read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello world");
        assert!(!file.is_dirty());
        assert_eq!(file.to_body(), Bytes::from_static(b"hello world"));
    }

    #[test]
    fn test_contents_ignore_cursor() {
        let mut file = MemFile::new("k");
        file.write_all(b"abcdef").unwrap();
        assert_eq!(file.position(), 6);
        assert_eq!(file.contents(), b"abcdef");
        assert!(file.is_dirty());
    }

    #[test]
    fn test_seek_and_overwrite() {
        let mut file = MemFile::from_body("k", b"0123456789");
        file.seek(SeekFrom::Start(2)).unwrap();
        file.write_all(b"ab").unwrap();
        file.seek(SeekFrom::End(0)).unwrap();
        file.write_all(b"!").unwrap();
        assert_eq!(file.contents(), b"01ab456789!");
    }

    #[test]
    fn test_set_len() {
        let mut file = MemFile::from_body("k", b"0123456789");
        file.seek(SeekFrom::End(0)).unwrap();
        file.set_len(4);
        assert_eq!(file.contents(), b"0123");
        assert_eq!(file.position(), 4);
        assert!(file.is_dirty());
    }

    #[test]
    fn test_handles_do_not_share_memory() {
        let body = b"shared".to_vec();
        let mut first = MemFile::from_body("k", &body);
        let second = MemFile::from_body("k", &body);
        first.write_all(b"X").unwrap();
        assert_eq!(second.contents(), b"shared");
        assert_eq!(first.contents(), b"Xhared");
    }

    #[test]
    fn test_stat() {
        let file = MemFile::from_body("dir/f.bin", &[0u8; 42]);
        let info = file.stat();
        assert_eq!(info.name, "dir/f.bin");
        assert_eq!(info.size, 42);
        assert!(!info.is_dir);
    }
}
