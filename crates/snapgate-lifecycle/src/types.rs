//! Request and response shapes of lifecycle operations
//!
//! These serialise in camelCase and double as the JSON bodies of the HTTP
//! surface.

use serde::{Deserialize, Serialize};
use snapgate_core::{Caps, FileEntry, SnapshotId, SnapshotMetadata, SnapshotStatus};

/// Lifetime requested when a create call names none
pub const DEFAULT_EXPIRY_DAYS: u64 = 7;

/// Shortest caller-chosen gate password
pub const MIN_PASSWORD_LEN: usize = 4;

/// Longest caller-chosen gate password
pub const MAX_PASSWORD_LEN: usize = 128;

/// Create a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSnapshot {
    /// Requested lifetime in days, clamped to the plan
    #[serde(default)]
    pub expiry_days: Option<u64>,
    /// Gate password; generated when absent or blank
    #[serde(default)]
    pub password: Option<String>,
    /// Skip the gate entirely
    #[serde(default, rename = "public")]
    pub is_public: bool,
}

/// Result of a create; the only time a generated password is returned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSnapshot {
    /// New snapshot id
    pub id: SnapshotId,
    /// Plaintext gate password
    pub password: String,
    /// Lifetime after clamping
    pub expiry_days: u64,
    /// Expiry, ms since epoch
    pub expires_at: u64,
    /// Caps stamped into the record
    pub caps: Caps,
}

/// Ask for a presigned upload of one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    /// Path relative to the snapshot root
    pub path: String,
    /// Content type the file will be served with
    pub content_type: String,
    /// Size in bytes
    pub size: u64,
}

/// A presigned upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadAuthorization {
    /// URL to PUT the file body to
    pub url: String,
    /// HTTP method the URL is signed for
    pub method: String,
    /// Object key the file lands under
    pub key: String,
    /// Content type that must accompany the PUT
    pub content_type: String,
    /// Seconds until the URL stops working
    pub expires_in: u64,
}

/// Finalize a snapshot with its manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeSnapshot {
    /// Declared bundle size; must equal the sum of file sizes
    pub total_bytes: u64,
    /// Uploaded files
    pub files: Vec<FileEntry>,
}

/// Extend a snapshot's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendSnapshot {
    /// Days to add, clamped to `1..=max_days`
    pub days: u64,
}

/// A freshly rotated gate password
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotatedPassword {
    /// New plaintext password
    pub password: String,
}

/// Owner-facing view of a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    /// Snapshot id
    pub id: SnapshotId,
    /// Status with lazy expiry applied
    pub status: SnapshotStatus,
    /// Creation time, ms since epoch
    pub created_at: u64,
    /// Expiry time, ms since epoch
    pub expires_at: u64,
    /// Bundle size
    pub total_bytes: u64,
    /// Number of files
    pub file_count: usize,
    /// Unique viewers this month
    pub views: u64,
    /// Whether the gate is bypassed
    pub public: bool,
    /// Caps in force
    pub caps: Caps,
}

impl SnapshotSummary {
    /// Summarise `meta` as seen at `now_ms`
    pub fn from_metadata(meta: &SnapshotMetadata, now_ms: u64) -> Self {
        Self {
            id: meta.id.clone(),
            status: meta.effective_status(now_ms),
            created_at: meta.created_at,
            expires_at: meta.expires_at,
            total_bytes: meta.total_bytes,
            file_count: meta.files.len(),
            views: meta.views.current(now_ms),
            public: meta.public,
            caps: meta.caps,
        }
    }
}

/// Owner-only detail view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDetail {
    /// Summary fields
    #[serde(flatten)]
    pub summary: SnapshotSummary,
    /// File manifest
    pub files: Vec<FileEntry>,
    /// Retained plaintext gate password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl SnapshotDetail {
    /// Detail view of `meta` as seen at `now_ms`
    pub fn from_metadata(meta: &SnapshotMetadata, now_ms: u64) -> Self {
        Self {
            summary: SnapshotSummary::from_metadata(meta, now_ms),
            files: meta.files.clone(),
            password: meta.password.clone(),
        }
    }
}
