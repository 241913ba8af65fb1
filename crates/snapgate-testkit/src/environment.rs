//! Deterministic wiring of every Snapgate component

use crate::fixtures::{fast_hasher, test_config};
use snapgate_core::effects::{FixedPlan, ObjectStoreEffects};
use snapgate_core::{FileEntry, PlanTier, RetryPolicy, SnapgateConfig, SnapshotId, DAY_MS};
use snapgate_crypto::TokenCodec;
use snapgate_delivery::{Delivery, GatedDelivery, ServedAsset, Viewer};
use snapgate_effects::{
    Effects, MemoryCommentThreads, MemoryKvStore, MemoryObjectStore, SimulatedTimeSource,
};
use snapgate_lifecycle::{
    CreateSnapshot, CreatedSnapshot, FinalizeSnapshot, ProducerSessions, SnapshotLifecycle,
};
use snapgate_store::MetadataStore;
use std::sync::Arc;

/// Seed used by [`TestEnvironment::new`]
pub const DEFAULT_SEED: u64 = 42;

/// Every component over in-memory handlers and one simulated clock
#[derive(Clone)]
pub struct TestEnvironment {
    /// Shared clock; advance it to age snapshots and tokens
    pub clock: SimulatedTimeSource,
    /// Clock plus seeded randomness
    pub effects: Effects,
    /// Metadata key-value store
    pub kv: Arc<MemoryKvStore>,
    /// Object store holding uploaded files
    pub objects: Arc<MemoryObjectStore>,
    /// Comment threads
    pub comments: Arc<MemoryCommentThreads>,
    /// Metadata adapter without retries
    pub store: MetadataStore,
    /// Configuration the components were built from
    pub config: SnapgateConfig,
    /// Producer-side operations
    pub lifecycle: SnapshotLifecycle,
    /// Viewer-side operations
    pub delivery: GatedDelivery,
    /// Producer session tokens
    pub sessions: ProducerSessions,
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnvironment {
    /// Free plan, default seed, clock at 2024-01-15T12:34:56Z
    pub fn new() -> Self {
        Self::build(test_config(), PlanTier::Free, DEFAULT_SEED)
    }

    /// Every producer on `plan`
    pub fn with_plan(plan: PlanTier) -> Self {
        Self::build(test_config(), plan, DEFAULT_SEED)
    }

    /// Custom configuration, plan and seed
    pub fn build(config: SnapgateConfig, plan: PlanTier, seed: u64) -> Self {
        let clock = SimulatedTimeSource::from_recent();
        let effects = Effects::deterministic(seed, clock.clone());
        let kv = Arc::new(MemoryKvStore::new(effects.time.clone()));
        let objects = Arc::new(MemoryObjectStore::new());
        let comments = Arc::new(MemoryCommentThreads::new());
        let store = MetadataStore::new(kv.clone(), RetryPolicy::none());
        let hasher = fast_hasher();

        let lifecycle = SnapshotLifecycle::from_config(
            &config,
            store.clone(),
            objects.clone(),
            hasher.clone(),
            Arc::new(FixedPlan(plan)),
            effects.clone(),
        )
        .expect("test config builds a lifecycle manager");
        let delivery = GatedDelivery::from_config(
            &config,
            store.clone(),
            objects.clone(),
            comments.clone(),
            hasher,
            effects.time.clone(),
        );
        let sessions = ProducerSessions::new(
            TokenCodec::new(config.session_secret.expose().as_bytes()),
            config.session_ttl_seconds,
            effects.time.clone(),
        );

        Self {
            clock,
            effects,
            kv,
            objects,
            comments,
            store,
            config,
            lifecycle,
            delivery,
            sessions,
        }
    }

    /// Current simulated time in ms
    pub fn now_ms(&self) -> u64 {
        self.effects.now_ms()
    }

    /// Move the clock forward by whole days
    pub fn advance_days(&self, days: u64) {
        self.clock.advance_ms(days * DAY_MS);
    }

    /// Place a file in the object store as a presigned PUT would
    pub async fn upload(&self, id: &SnapshotId, path: &str, content_type: &str, body: &[u8]) {
        self.objects
            .put(
                &format!("snap/{id}/{path}"),
                body.to_vec(),
                Some(content_type),
            )
            .await
            .expect("memory object store accepts the key");
    }

    /// Create, upload and finalize a gated snapshot
    pub async fn publish(&self, owner: &str, files: &[(&str, &str, &[u8])]) -> CreatedSnapshot {
        self.publish_with(owner, CreateSnapshot::default(), files)
            .await
    }

    /// [`publish`](Self::publish) with explicit create options
    pub async fn publish_with(
        &self,
        owner: &str,
        request: CreateSnapshot,
        files: &[(&str, &str, &[u8])],
    ) -> CreatedSnapshot {
        let created = self.lifecycle.create(owner, request).await.unwrap();
        let mut entries = Vec::new();
        for (path, content_type, body) in files {
            self.upload(&created.id, path, content_type, body).await;
            entries.push(FileEntry {
                name: (*path).to_string(),
                size: body.len() as u64,
                content_type: (*content_type).to_string(),
                hash: String::new(),
            });
        }
        let total_bytes = entries.iter().map(|f| f.size).sum();
        self.lifecycle
            .finalize(
                owner,
                &created.id,
                FinalizeSnapshot {
                    total_bytes,
                    files: entries,
                },
            )
            .await
            .unwrap();
        created
    }

    /// Pass the gate and return the viewer token
    pub async fn gate_token(&self, id: &SnapshotId, password: &str) -> String {
        self.delivery
            .gate_check(id.as_str(), password)
            .await
            .unwrap()
            .token
    }

    /// Fetch a path as a fixed viewer, expecting an asset
    pub async fn fetch(
        &self,
        id: &SnapshotId,
        path: &str,
        gate_token: Option<&str>,
    ) -> ServedAsset {
        let viewer = Viewer {
            gate_token,
            client_ip: "203.0.113.7",
            user_agent: "snapgate-test",
        };
        match self.delivery.serve(id.as_str(), path, viewer).await.unwrap() {
            Delivery::Asset(asset) => asset,
            Delivery::PasswordPrompt(_) => panic!("expected an asset, got the password prompt"),
        }
    }
}
