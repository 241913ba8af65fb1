//! Snapshot domain types
//!
//! These are the persisted record shapes. Field names serialise in
//! camelCase so the JSON stored in the metadata store stays readable by
//! any other tooling pointed at the same keys.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Milliseconds in one day
pub const DAY_MS: u64 = 86_400_000;

/// Seconds in one day
pub const DAY_SECS: u64 = 86_400;

/// Maximum number of active snapshots an owner may hold
pub const MAX_ACTIVE_SNAPSHOTS: usize = 10;

/// Opaque, URL-safe snapshot identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(String);

impl SnapshotId {
    /// Wrap an identifier, rejecting anything that is not URL-safe
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = !raw.is_empty()
            && raw.len() <= 64
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        valid.then(|| Self(raw.to_string()))
    }

    /// Borrow the identifier string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotStatus {
    /// Created, files being uploaded, not yet servable
    Creating,
    /// Finalized and servable until `expires_at`
    Active,
    /// Revoked or past expiry; terminal
    Expired,
}

impl SnapshotStatus {
    /// Lower-case name as persisted
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Creating => "creating",
            Self::Active => "active",
            Self::Expired => "expired",
        }
    }
}

/// Plan tier of the producer; selects the caps stamped into new records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    /// Default tier
    #[default]
    Free,
    /// Paid tier with larger caps and longer lifetimes
    Pro,
}

impl PlanTier {
    /// Caps granted by this tier
    pub fn caps(&self) -> Caps {
        match self {
            Self::Free => Caps {
                max_file_bytes: 25 * 1024 * 1024,
                max_bundle_bytes: 100 * 1024 * 1024,
                max_days: 7,
            },
            Self::Pro => Caps {
                max_file_bytes: 50 * 1024 * 1024,
                max_bundle_bytes: 500 * 1024 * 1024,
                max_days: 30,
            },
        }
    }
}

/// Size and lifetime caps recorded on each snapshot at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caps {
    /// Largest single file accepted
    pub max_file_bytes: u64,
    /// Largest bundle accepted at finalize
    pub max_bundle_bytes: u64,
    /// Longest lifetime from `created_at`
    pub max_days: u64,
}

impl Caps {
    /// Clamp a requested lifetime into `1..=max_days`
    pub fn clamp_days(&self, days: u64) -> u64 {
        days.clamp(1, self.max_days.max(1))
    }
}

/// One uploaded file of a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path relative to the snapshot root, e.g. `assets/app.js`
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Content type recorded at upload time
    #[serde(rename = "type")]
    pub content_type: String,
    /// Client-supplied content hash
    #[serde(default)]
    pub hash: String,
}

/// Coarse monthly view counter
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewBucket {
    /// `YYYY-MM` of the counting period
    pub period_key: String,
    /// Unique viewers counted in the period
    pub count: u64,
}

impl ViewBucket {
    /// Count one view at `now_ms`, resetting when the month rolls over
    pub fn record(&mut self, now_ms: u64) {
        let key = period_key(now_ms);
        if self.period_key != key {
            self.period_key = key;
            self.count = 0;
        }
        self.count += 1;
    }

    /// Views in the period containing `now_ms`
    pub fn current(&self, now_ms: u64) -> u64 {
        if self.period_key == period_key(now_ms) {
            self.count
        } else {
            0
        }
    }
}

/// `YYYY-MM` for a millisecond timestamp
pub fn period_key(now_ms: u64) -> String {
    let dt = DateTime::<Utc>::from_timestamp_millis(now_ms as i64).unwrap_or_default();
    format!("{:04}-{:02}", dt.year(), dt.month())
}

/// Persisted metadata for one snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    /// Immutable identifier
    pub id: SnapshotId,
    /// Immutable producer identity
    pub owner_uid: String,
    /// Creation time, ms since epoch
    pub created_at: u64,
    /// Expiry time, ms since epoch
    pub expires_at: u64,
    /// `scrypt$hash$salt`
    pub password_hash: String,
    /// Plaintext gate password kept for owner display
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Lifecycle state as last written
    pub status: SnapshotStatus,
    /// Sum of file sizes, set at finalize
    #[serde(default)]
    pub total_bytes: u64,
    /// File manifest, set at finalize
    #[serde(default)]
    pub files: Vec<FileEntry>,
    /// Caps in force for this snapshot
    pub caps: Caps,
    /// Monthly unique-view bucket
    ///
    /// Persisted under its own key so counting a view never rewrites the
    /// record; the store adapter fills it in on read.
    #[serde(skip)]
    pub views: ViewBucket,
    /// Skip the password gate entirely
    #[serde(default)]
    pub public: bool,
}

impl SnapshotMetadata {
    /// Status with lazy expiry applied
    pub fn effective_status(&self, now_ms: u64) -> SnapshotStatus {
        if self.status == SnapshotStatus::Expired || now_ms > self.expires_at {
            SnapshotStatus::Expired
        } else {
            self.status
        }
    }

    /// Whether the snapshot is expired at `now_ms`
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.effective_status(now_ms) == SnapshotStatus::Expired
    }

    /// Whether the snapshot counts against the owner's active cap
    pub fn is_active(&self, now_ms: u64) -> bool {
        self.effective_status(now_ms) == SnapshotStatus::Active
    }

    /// Latest expiry the caps allow
    pub fn max_expires_at(&self) -> u64 {
        self.created_at
            .saturating_add(self.caps.max_days.saturating_mul(DAY_MS))
    }

    /// Look up a file of the manifest by its relative path
    pub fn file(&self, name: &str) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.name == name)
    }
}
