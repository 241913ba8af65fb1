//! Asset path and content-type policy
//!
//! Shared by upload authorization and serving so both sides reject the
//! same traversal attempts.

use crate::{Result, SnapError, SnapshotId};

/// Document served for the snapshot root
pub const INDEX_DOCUMENT: &str = "index.html";

/// Longest accepted relative asset path
pub const MAX_PATH_LEN: usize = 512;

/// Object store key of one snapshot file: `snap/{id}/{path}`
pub fn object_key(id: &SnapshotId, path: &str) -> String {
    format!("snap/{id}/{path}")
}

/// Content types that may be uploaded
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "text/html",
    "text/css",
    "text/plain",
    "text/javascript",
    "application/javascript",
    "application/json",
    "application/manifest+json",
    "application/wasm",
    "application/xml",
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
    "image/avif",
    "image/svg+xml",
    "image/x-icon",
    "font/woff",
    "font/woff2",
    "font/ttf",
    "font/otf",
    "audio/mpeg",
    "video/mp4",
    "video/webm",
];

/// Validate a snapshot-relative asset path
///
/// Rejects absolute paths, backslashes, control characters, empty
/// segments and any `.` or `..` segment. Returns the path unchanged.
pub fn validate_asset_path(path: &str) -> Result<&str> {
    if path.is_empty() {
        return Err(SnapError::bad_request("empty path"));
    }
    if path.len() > MAX_PATH_LEN {
        return Err(SnapError::bad_request("path too long"));
    }
    if path.starts_with('/') || path.contains('\\') {
        return Err(SnapError::bad_request("path must be relative"));
    }
    if path.chars().any(char::is_control) {
        return Err(SnapError::bad_request("path contains control characters"));
    }
    for segment in path.split('/') {
        match segment {
            "" => return Err(SnapError::bad_request("path contains an empty segment")),
            "." | ".." => return Err(SnapError::bad_request("path traversal rejected")),
            _ => {}
        }
    }
    Ok(path)
}

/// Strip parameters and lower-case a content type (`Text/HTML; charset=x` -> `text/html`)
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Check a content type against the upload allow-list
pub fn check_content_type(content_type: &str) -> Result<String> {
    let normalized = normalize_content_type(content_type);
    if ALLOWED_CONTENT_TYPES.contains(&normalized.as_str()) {
        Ok(normalized)
    } else {
        Err(SnapError::TypeNotAllowed {
            content_type: content_type.to_string(),
        })
    }
}
