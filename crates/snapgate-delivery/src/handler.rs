//! Gated delivery of snapshot content
//!
//! Non-public snapshots are read only with a viewer gate token for that
//! snapshot. Every successful index serve counts the viewer at most once
//! per day.

use crate::gate::GatePass;
use crate::prompt::password_prompt;
use serde::{Deserialize, Serialize};
use snapgate_core::effects::{
    Comment, CommentThreadEffects, NewComment, ObjectStoreEffects, TimeSource,
};
use snapgate_core::policy::{
    normalize_content_type, object_key, validate_asset_path, INDEX_DOCUMENT,
};
use snapgate_core::{
    Result, SnapError, SnapgateConfig, SnapshotId, SnapshotMetadata, SnapshotStatus,
};
use snapgate_crypto::{viewer_fingerprint, CredentialHasher, TokenCodec, ViewerGateClaims};
use snapgate_store::MetadataStore;
use std::sync::Arc;
use tracing::{debug, info};

/// Content type used when neither the manifest nor the store records one
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Longest comment body in characters
pub const MAX_COMMENT_LEN: usize = 2000;

/// Longest comment author name in characters
pub const MAX_AUTHOR_LEN: usize = 80;

/// Author recorded when a comment names none
pub const ANONYMOUS_AUTHOR: &str = "anonymous";

/// Who is asking for content
#[derive(Debug, Clone, Copy, Default)]
pub struct Viewer<'a> {
    /// Gate token from the snapshot's gate cookie
    pub gate_token: Option<&'a str>,
    /// Client network identity
    pub client_ip: &'a str,
    /// Client user agent
    pub user_agent: &'a str,
}

/// A file ready to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedAsset {
    /// Snapshot-relative path that was resolved
    pub path: String,
    /// Content type recorded at upload time
    pub content_type: String,
    /// File bytes
    pub body: Vec<u8>,
}

/// Outcome of a content request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Send the file
    Asset(ServedAsset),
    /// Ask for the gate password (HTTP 401 with an HTML body)
    PasswordPrompt(String),
}

/// A comment as submitted by a viewer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRequest {
    /// Display name; `anonymous` when blank
    #[serde(default)]
    pub author: Option<String>,
    /// Comment text
    pub body: String,
}

/// Viewer-facing side of a snapshot
#[derive(Clone)]
pub struct GatedDelivery {
    store: MetadataStore,
    objects: Arc<dyn ObjectStoreEffects>,
    comments: Arc<dyn CommentThreadEffects>,
    hasher: CredentialHasher,
    codec: TokenCodec,
    gate_ttl_secs: u64,
    time: Arc<dyn TimeSource>,
}

impl std::fmt::Debug for GatedDelivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatedDelivery")
            .field("store", &self.store)
            .field("gate_ttl_secs", &self.gate_ttl_secs)
            .finish_non_exhaustive()
    }
}

impl GatedDelivery {
    /// Assemble a handler from its collaborators
    pub fn new(
        store: MetadataStore,
        objects: Arc<dyn ObjectStoreEffects>,
        comments: Arc<dyn CommentThreadEffects>,
        hasher: CredentialHasher,
        codec: TokenCodec,
        gate_ttl_secs: u64,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            store,
            objects,
            comments,
            hasher,
            codec,
            gate_ttl_secs,
            time,
        }
    }

    /// Assemble a handler keyed with the configured session secret
    pub fn from_config(
        config: &SnapgateConfig,
        store: MetadataStore,
        objects: Arc<dyn ObjectStoreEffects>,
        comments: Arc<dyn CommentThreadEffects>,
        hasher: CredentialHasher,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self::new(
            store,
            objects,
            comments,
            hasher,
            TokenCodec::new(config.session_secret.expose().as_bytes()),
            config.gate_ttl_seconds,
            time,
        )
    }

    /// Resolve a servable snapshot: `creating` is invisible, expired is gone
    async fn load_servable(&self, raw_id: &str, now_ms: u64) -> Result<SnapshotMetadata> {
        let Some(id) = SnapshotId::parse(raw_id) else {
            return Err(SnapError::not_found("snapshot not found"));
        };
        let Some(meta) = self.store.get_snapshot(&id).await? else {
            debug!(snapshot_id = %id, "snapshot not found");
            return Err(SnapError::not_found("snapshot not found"));
        };
        match meta.effective_status(now_ms) {
            SnapshotStatus::Creating => Err(SnapError::not_found("snapshot not found")),
            SnapshotStatus::Expired => Err(SnapError::gone("snapshot has expired")),
            SnapshotStatus::Active => Ok(meta),
        }
    }

    fn gate_open(&self, meta: &SnapshotMetadata, gate_token: Option<&str>) -> bool {
        if meta.public {
            return true;
        }
        gate_token
            .and_then(|token| {
                self.codec
                    .verify::<ViewerGateClaims>(token, self.time.now_secs())
            })
            .is_some_and(|claims| claims.grants(&meta.id))
    }

    /// Check a gate password and issue a viewer gate token on success
    pub async fn gate_check(&self, raw_id: &str, password: &str) -> Result<GatePass> {
        let meta = self.load_servable(raw_id, self.time.now_ms()).await?;
        if !self.hasher.verify(password, &meta.password_hash) {
            debug!(snapshot_id = %meta.id, "gate password rejected");
            return Err(SnapError::forbidden("incorrect password"));
        }
        let token = self.codec.sign(
            &ViewerGateClaims::for_snapshot(&meta.id),
            self.gate_ttl_secs,
            self.time.now_secs(),
        )?;
        debug!(snapshot_id = %meta.id, "gate passed");
        Ok(GatePass::new(&meta.id, token, self.gate_ttl_secs))
    }

    /// Serve `path` (empty for the index document) of a snapshot
    pub async fn serve(&self, raw_id: &str, path: &str, viewer: Viewer<'_>) -> Result<Delivery> {
        let now = self.time.now_ms();
        let meta = self.load_servable(raw_id, now).await?;

        if !path.is_empty() {
            validate_asset_path(path)?;
        }
        let index_route = path.is_empty() || path == INDEX_DOCUMENT;
        if !self.gate_open(&meta, viewer.gate_token) {
            debug!(snapshot_id = %meta.id, path, "gate closed");
            return if index_route {
                Ok(Delivery::PasswordPrompt(password_prompt(&meta.id, false)))
            } else {
                Err(SnapError::unauthorized("gate password required"))
            };
        }

        let path = if index_route { INDEX_DOCUMENT } else { path };
        let Some(entry) = meta.file(path) else {
            return Err(SnapError::not_found("file not found"));
        };

        let key = object_key(&meta.id, path);
        let object = self.objects.get(&key).await.map_err(|err| {
            tracing::error!(key = %key, error = %err, "object store read failed");
            SnapError::internal(format!("object store get failed: {err}"))
        })?;
        let Some(object) = object else {
            debug!(snapshot_id = %meta.id, path, "manifest entry has no object");
            return Err(SnapError::not_found("file not found"));
        };

        let recorded = [Some(entry.content_type.as_str()), object.content_type.as_deref()];
        let content_type = recorded
            .into_iter()
            .flatten()
            .map(normalize_content_type)
            .find(|ct| !ct.is_empty())
            .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());

        if path == INDEX_DOCUMENT {
            self.count_view(&meta.id, viewer, now).await?;
        }

        Ok(Delivery::Asset(ServedAsset {
            path: path.to_string(),
            content_type,
            body: object.body,
        }))
    }

    /// Count one unique viewer per snapshot per day
    ///
    /// Marker check and counter update are separate store calls; two
    /// overlapping first visits from one viewer may both count. The marker
    /// is only written once the counter is, so a failed increment leaves the
    /// viewer countable on the next visit.
    async fn count_view(&self, id: &SnapshotId, viewer: Viewer<'_>, now_ms: u64) -> Result<bool> {
        let fingerprint = viewer_fingerprint(viewer.client_ip, viewer.user_agent);
        if self.store.dedup_seen(id, &fingerprint).await? {
            return Ok(false);
        }
        let views = self.store.record_view(id, now_ms).await?;
        self.store.mark_dedup(id, &fingerprint).await?;
        info!(snapshot_id = %id, views = views.count, "unique view counted");
        Ok(true)
    }

    /// Comments of a snapshot the viewer may read
    pub async fn list_comments(
        &self,
        raw_id: &str,
        gate_token: Option<&str>,
    ) -> Result<Vec<Comment>> {
        let meta = self.load_servable(raw_id, self.time.now_ms()).await?;
        if !self.gate_open(&meta, gate_token) {
            return Err(SnapError::unauthorized("gate password required"));
        }
        self.comments.list(&meta.id).await
    }

    /// Append a comment to a snapshot the viewer may read
    pub async fn append_comment(
        &self,
        raw_id: &str,
        gate_token: Option<&str>,
        request: CommentRequest,
    ) -> Result<Comment> {
        let now = self.time.now_ms();
        let meta = self.load_servable(raw_id, now).await?;
        if !self.gate_open(&meta, gate_token) {
            return Err(SnapError::unauthorized("gate password required"));
        }

        let body = request.body.trim();
        if body.is_empty() || body.chars().count() > MAX_COMMENT_LEN {
            return Err(SnapError::bad_request(format!(
                "comment must be 1 to {MAX_COMMENT_LEN} characters"
            )));
        }
        let author = request
            .author
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(ANONYMOUS_AUTHOR);
        if author.chars().count() > MAX_AUTHOR_LEN {
            return Err(SnapError::bad_request(format!(
                "author must be at most {MAX_AUTHOR_LEN} characters"
            )));
        }

        self.comments
            .append(
                &meta.id,
                NewComment {
                    author: author.to_string(),
                    body: body.to_string(),
                },
                now,
            )
            .await
    }
}
