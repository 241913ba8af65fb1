//! Typed reads and writes over the metadata key-value store
//!
//! The adapter is the only code that knows how a `SnapshotMetadata`,
//! an owner's snapshot list or a viewer dedup marker is laid out in the
//! store. Rate-limited calls are retried with the configured policy; any
//! store failure left after that surfaces as `SnapError::Internal`.

use crate::keys;
use snapgate_core::effects::{KvStoreEffects, PutOptions, StoreError};
use snapgate_core::{
    Result, RetryPolicy, SnapError, SnapshotId, SnapshotMetadata, ViewBucket, DAY_SECS,
};
use std::future::Future;
use std::sync::Arc;

/// Lifetime of a viewer dedup marker
pub const DEDUP_TTL_SECS: u64 = DAY_SECS;

/// Metadata store adapter
#[derive(Clone)]
pub struct MetadataStore {
    kv: Arc<dyn KvStoreEffects>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for MetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataStore")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl MetadataStore {
    /// Adapter over `kv` retrying rate-limited calls per `retry`
    pub fn new(kv: Arc<dyn KvStoreEffects>, retry: RetryPolicy) -> Self {
        Self { kv, retry }
    }

    async fn call<T, F, Fut>(&self, op: &'static str, key: &str, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, StoreError>>,
    {
        self.retry
            .execute_if(StoreError::is_retryable, operation)
            .await
            .map_err(|err| {
                tracing::error!(op, key, error = %err, "metadata store call failed");
                SnapError::internal(format!("metadata store {op} failed: {err}"))
            })
    }

    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        self.call("get", key, || self.kv.get(key)).await
    }

    async fn put_raw(&self, key: &str, value: String, options: PutOptions) -> Result<()> {
        self.call("put", key, || self.kv.put(key, value.clone(), options))
            .await
    }

    /// Load a snapshot record with its current view bucket
    pub async fn get_snapshot(&self, id: &SnapshotId) -> Result<Option<SnapshotMetadata>> {
        let key = keys::snapshot(id);
        let Some(raw) = self.get_raw(&key).await? else {
            return Ok(None);
        };
        let mut meta: SnapshotMetadata = serde_json::from_str(&raw).map_err(|e| {
            tracing::error!(key = %key, error = %e, "corrupt snapshot record");
            SnapError::internal(format!("corrupt snapshot record {id}: {e}"))
        })?;
        meta.views = self.get_views(id).await?;
        Ok(Some(meta))
    }

    /// Write a snapshot record, replacing any previous version
    ///
    /// The view bucket is not part of the record and is left untouched.
    pub async fn put_snapshot(&self, meta: &SnapshotMetadata) -> Result<()> {
        let raw = serde_json::to_string(meta)?;
        self.put_raw(&keys::snapshot(&meta.id), raw, PutOptions::default())
            .await
    }

    /// View bucket of a snapshot, empty if nothing was counted yet
    pub async fn get_views(&self, id: &SnapshotId) -> Result<ViewBucket> {
        let key = keys::views(id);
        match self.get_raw(&key).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                tracing::error!(key = %key, error = %e, "corrupt view counter");
                SnapError::internal(format!("corrupt view counter {id}: {e}"))
            }),
            None => Ok(ViewBucket::default()),
        }
    }

    /// Count one view at `now_ms` and return the updated bucket
    ///
    /// Read-modify-write on the counter key alone; two overlapping
    /// increments can lose one of them.
    pub async fn record_view(&self, id: &SnapshotId, now_ms: u64) -> Result<ViewBucket> {
        let mut views = self.get_views(id).await?;
        views.record(now_ms);
        let raw = serde_json::to_string(&views)?;
        self.put_raw(&keys::views(id), raw, PutOptions::default())
            .await?;
        Ok(views)
    }

    /// An owner's snapshot list in registration order
    pub async fn owner_snapshots(&self, owner_uid: &str) -> Result<Vec<SnapshotId>> {
        let key = keys::owner_snapshots(owner_uid);
        match self.get_raw(&key).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                tracing::error!(key = %key, error = %e, "corrupt owner list");
                SnapError::internal(format!("corrupt owner list for {owner_uid}: {e}"))
            }),
            None => Ok(Vec::new()),
        }
    }

    /// Replace an owner's snapshot list
    pub async fn put_owner_snapshots(&self, owner_uid: &str, ids: &[SnapshotId]) -> Result<()> {
        let raw = serde_json::to_string(ids)?;
        self.put_raw(&keys::owner_snapshots(owner_uid), raw, PutOptions::default())
            .await
    }

    /// Whether a dedup marker exists for this viewer today
    pub async fn dedup_seen(&self, id: &SnapshotId, fingerprint: &str) -> Result<bool> {
        Ok(self
            .get_raw(&keys::viewer_dedup(id, fingerprint))
            .await?
            .is_some())
    }

    /// Write a dedup marker that expires after a day
    pub async fn mark_dedup(&self, id: &SnapshotId, fingerprint: &str) -> Result<()> {
        self.put_raw(
            &keys::viewer_dedup(id, fingerprint),
            "1".to_string(),
            PutOptions::with_ttl(DEDUP_TTL_SECS),
        )
        .await
    }
}
