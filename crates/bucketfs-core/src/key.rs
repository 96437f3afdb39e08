//! Path to object key normalization

use crate::{Error, Result};

/// Derive the canonical object key for a filesystem path.
///
/// The path is split on `.`: the last segment is the extension, the rest
/// (rejoined with `.`) is the base name, and the key is `base.extension`.
/// A path without any `.` has no extension and is used as-is.
///
/// Object keys are relative to the bucket, so leading `/` are dropped.
/// Paths that are empty after that are rejected.
pub fn normalize_key(path: &str) -> Result<String> {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return Err(Error::InvalidPath(path.to_string()));
    }

    let tokens: Vec<&str> = path.split('.').collect();
    let Some((ext, rest)) = tokens.split_last() else {
        return Err(Error::InvalidPath(path.to_string()));
    };
    if rest.is_empty() {
        return Ok(path.to_string());
    }

    let base = if rest.len() > 1 {
        rest.join(".")
    } else {
        rest[0].to_string()
    };

    Ok(format!("{}.{}", base, ext))
}
