//! Key shapes in the metadata store

use snapgate_core::SnapshotId;

/// Prefix of every snapshot record key
pub const SNAPSHOT_PREFIX: &str = "snapshot:";

/// Prefix of every view counter key
pub const VIEWS_PREFIX: &str = "views:";

/// Prefix of every viewer dedup key
pub const DEDUP_PREFIX: &str = "viewer-dedup:";

/// `snapshot:{id}`
pub fn snapshot(id: &SnapshotId) -> String {
    format!("{SNAPSHOT_PREFIX}{id}")
}

/// `views:{id}`
pub fn views(id: &SnapshotId) -> String {
    format!("{VIEWS_PREFIX}{id}")
}

/// `owner:{uid}:snapshots`
pub fn owner_snapshots(owner_uid: &str) -> String {
    format!("owner:{owner_uid}:snapshots")
}

/// `viewer-dedup:{id}:{fingerprint}`
pub fn viewer_dedup(id: &SnapshotId, fingerprint: &str) -> String {
    format!("{DEDUP_PREFIX}{id}:{fingerprint}")
}
