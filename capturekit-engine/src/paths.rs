//! Storage path normalization
//!
//! Paths are `/`-separated and relative to the storage root.

use crate::{storage::Storage, StorageError};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

static REPEATED_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/{2,}").expect("separator pattern is valid"));

static HAS_EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.[A-Za-z0-9_]{1,5}$").expect("extension pattern is valid"));

/// What a path must look like to be accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathMode {
    /// Must end in a 1-5 character extension (any extension)
    File,
    /// Must not look like a file; gains a trailing `/`
    Folder,
}

/// Canonicalize a path, or `None` when it is not valid for `mode`.
///
/// The path is trimmed, line breaks are dropped, runs of `/` collapse to one
/// and a single leading `/` is removed.
pub fn normalize(path: &str, mode: PathMode) -> Option<String> {
    let cleaned = clean(path)?;
    let cleaned = cleaned.strip_prefix('/').unwrap_or(&cleaned).to_string();
    if cleaned.is_empty() {
        return None;
    }

    let looks_like_file = HAS_EXTENSION.is_match(&cleaned);
    match mode {
        PathMode::File if looks_like_file => Some(cleaned),
        PathMode::File => None,
        PathMode::Folder if looks_like_file => None,
        PathMode::Folder if cleaned.ends_with('/') => Some(cleaned),
        PathMode::Folder => Some(format!("{cleaned}/")),
    }
}

/// Normalize as a file path, falling back to a folder path
pub fn normalize_file_or_folder(path: &str) -> Option<String> {
    normalize(path, PathMode::File).or_else(|| normalize(path, PathMode::Folder))
}

/// Create the folder that would contain `path`. Paths without a directory
/// component need nothing.
pub async fn ensure_folder(storage: &dyn Storage, path: &str) -> Result<(), StorageError> {
    let Some(cleaned) = clean(path) else {
        return Ok(());
    };
    let Some(end) = cleaned.rfind('/') else {
        return Ok(());
    };
    let folder = cleaned[..end].trim_start_matches('/');
    if folder.is_empty() {
        return Ok(());
    }
    trace!(folder, "Ensuring folder");
    storage.create_folder(folder).await
}

fn clean(path: &str) -> Option<String> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return None;
    }
    let single_line: String = trimmed.chars().filter(|c| !matches!(c, '\n' | '\r')).collect();
    Some(REPEATED_SEPARATORS.replace_all(&single_line, "/").into_owned())
}
