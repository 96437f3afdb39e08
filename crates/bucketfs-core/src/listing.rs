//! Marker-based prefix listing

use crate::accessor::ObjectAccessor;
use crate::client::{ClientError, ListingPage};
use crate::error::{FailureKind, ObjectError, ObjectOp};
use tracing::trace;

/// Lazy iterator over the listing pages under a prefix.
///
/// The first call lists from the start of the prefix; each following call
/// passes the previous page's continuation marker. Iteration ends after the
/// first page without a marker, or after the first error.
#[derive(Debug)]
pub struct PrefixPages<'a> {
    accessor: ObjectAccessor<'a>,
    prefix: String,
    page_size: Option<usize>,
    marker: Option<String>,
    pages: usize,
    done: bool,
}

impl<'a> PrefixPages<'a> {
    /// Start listing `prefix`, asking for at most `page_size` keys per page
    pub fn new(accessor: ObjectAccessor<'a>, prefix: impl Into<String>, page_size: Option<usize>) -> Self {
        Self {
            accessor,
            prefix: prefix.into(),
            page_size,
            marker: None,
            pages: 0,
            done: false,
        }
    }

    /// The prefix being listed
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Number of pages fetched so far
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    /// Drain every page into one ordered key set
    pub fn collect_keys(self) -> Result<Vec<String>, ObjectError> {
        let mut keys = Vec::new();
        for page in self {
            keys.extend(page?.keys);
        }
        Ok(keys)
    }

    fn fetch(&mut self) -> Result<ListingPage, ObjectError> {
        let page = self
            .accessor
            .list_page(&self.prefix, self.marker.as_deref(), self.page_size)?;
        self.pages += 1;
        trace!(
            "page {} under {:?}: {} keys, truncated={}",
            self.pages,
            self.prefix,
            page.keys.len(),
            page.is_truncated()
        );

        // Stores may order keys by an encoded form, so only a repeated marker
        // proves the listing is stuck
        if let (Some(prev), Some(next)) = (self.marker.as_deref(), page.next_marker.as_deref()) {
            if next == prev {
                return Err(ObjectError {
                    op: ObjectOp::List,
                    key: self.prefix.clone(),
                    kind: FailureKind::Unknown,
                    source: ClientError::new(format!(
                        "listing marker did not advance past {:?}",
                        prev
                    )),
                });
            }
        }

        self.marker = page.next_marker.clone();
        Ok(page)
    }
}

impl Iterator for PrefixPages<'_> {
    type Item = Result<ListingPage, ObjectError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let page = self.fetch();
        match &page {
            Ok(page) if page.next_marker.is_some() => {}
            _ => self.done = true,
        }
        Some(page)
    }
}
