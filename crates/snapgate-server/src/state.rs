//! Shared handler state and its production wiring

use snapgate_core::effects::FixedPlan;
use snapgate_core::{Result, SnapgateConfig};
use snapgate_crypto::{CredentialHasher, TokenCodec};
use snapgate_delivery::GatedDelivery;
use snapgate_effects::{Effects, FilesystemKvStore, FilesystemObjectStore, MemoryCommentThreads};
use snapgate_lifecycle::{ProducerSessions, SnapshotLifecycle};
use snapgate_store::MetadataStore;
use std::sync::Arc;

/// Components every handler can reach
#[derive(Debug, Clone)]
pub struct AppState {
    /// Producer-side operations
    pub lifecycle: SnapshotLifecycle,
    /// Viewer-side operations
    pub delivery: GatedDelivery,
    /// Producer session tokens
    pub sessions: ProducerSessions,
}

impl AppState {
    /// Bundle already-built components
    pub fn new(
        lifecycle: SnapshotLifecycle,
        delivery: GatedDelivery,
        sessions: ProducerSessions,
    ) -> Self {
        Self {
            lifecycle,
            delivery,
            sessions,
        }
    }

    /// Wire filesystem-backed stores under `config.data_dir`
    ///
    /// The config must already be validated.
    pub fn from_config(config: &SnapgateConfig, effects: Effects) -> Result<Self> {
        let kv = Arc::new(FilesystemKvStore::new(
            config.data_dir.join("kv"),
            effects.time.clone(),
        ));
        let objects = Arc::new(FilesystemObjectStore::new(config.data_dir.clone()));
        let comments = Arc::new(MemoryCommentThreads::new());
        let store = MetadataStore::new(kv, config.retry.policy());
        let hasher = CredentialHasher::with_defaults()?;

        let lifecycle = SnapshotLifecycle::from_config(
            config,
            store.clone(),
            objects.clone(),
            hasher.clone(),
            Arc::new(FixedPlan(config.default_plan)),
            effects.clone(),
        )?;
        let delivery = GatedDelivery::from_config(
            config,
            store,
            objects,
            comments,
            hasher,
            effects.time.clone(),
        );
        let sessions = ProducerSessions::new(
            TokenCodec::new(config.session_secret.expose().as_bytes()),
            config.session_ttl_seconds,
            effects.time,
        );
        Ok(Self::new(lifecycle, delivery, sessions))
    }
}
