//! Snapshot lifecycle manager
//!
//! States move `creating -> active -> expired`. Only [`SnapshotLifecycle::finalize`]
//! reaches `active`; [`SnapshotLifecycle::revoke`] forces `expired` from any
//! other state; natural expiry is applied lazily whenever a record is read.
//! Nothing leaves `expired`.
//!
//! Every owner-scoped operation resolves the record first and only then
//! compares owners, answering `not_found` in both cases so a non-owner
//! cannot discover which ids exist.

use crate::types::{
    CreateSnapshot, CreatedSnapshot, ExtendSnapshot, FinalizeSnapshot, RotatedPassword,
    SnapshotDetail, SnapshotSummary, UploadAuthorization, UploadRequest, DEFAULT_EXPIRY_DAYS,
    MAX_PASSWORD_LEN, MIN_PASSWORD_LEN,
};
use snapgate_core::effects::{ObjectStoreEffects, PlanEffects};
use snapgate_core::policy::{check_content_type, object_key, validate_asset_path};
use snapgate_core::{
    FileEntry, Result, SnapError, SnapgateConfig, SnapshotId, SnapshotMetadata, SnapshotStatus,
    ViewBucket, DAY_MS, MAX_ACTIVE_SNAPSHOTS,
};
use snapgate_crypto::{generate, CredentialHasher, RequestSigner};
use snapgate_effects::Effects;
use snapgate_store::MetadataStore;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Orchestrates snapshot state transitions
#[derive(Clone)]
pub struct SnapshotLifecycle {
    store: MetadataStore,
    objects: Arc<dyn ObjectStoreEffects>,
    signer: RequestSigner,
    hasher: CredentialHasher,
    plans: Arc<dyn PlanEffects>,
    effects: Effects,
    upload_url_ttl_secs: u64,
}

impl std::fmt::Debug for SnapshotLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotLifecycle")
            .field("store", &self.store)
            .field("signer", &self.signer)
            .field("upload_url_ttl_secs", &self.upload_url_ttl_secs)
            .finish_non_exhaustive()
    }
}

impl SnapshotLifecycle {
    /// Assemble a manager from its collaborators
    pub fn new(
        store: MetadataStore,
        objects: Arc<dyn ObjectStoreEffects>,
        signer: RequestSigner,
        hasher: CredentialHasher,
        plans: Arc<dyn PlanEffects>,
        effects: Effects,
        upload_url_ttl_secs: u64,
    ) -> Self {
        Self {
            store,
            objects,
            signer,
            hasher,
            plans,
            effects,
            upload_url_ttl_secs,
        }
    }

    /// Assemble a manager from service configuration
    pub fn from_config(
        config: &SnapgateConfig,
        store: MetadataStore,
        objects: Arc<dyn ObjectStoreEffects>,
        hasher: CredentialHasher,
        plans: Arc<dyn PlanEffects>,
        effects: Effects,
    ) -> Result<Self> {
        let signer = RequestSigner::new(&config.object_store)?;
        Ok(Self::new(
            store,
            objects,
            signer,
            hasher,
            plans,
            effects,
            config.upload_url_ttl_seconds,
        ))
    }

    /// Load a record the caller owns, or `not_found`
    async fn load_owned(&self, owner_uid: &str, id: &SnapshotId) -> Result<SnapshotMetadata> {
        let Some(meta) = self.store.get_snapshot(id).await? else {
            debug!(snapshot_id = %id, "snapshot not found");
            return Err(SnapError::not_found("snapshot not found"));
        };
        if meta.owner_uid != owner_uid {
            debug!(snapshot_id = %id, "snapshot owned by another producer");
            return Err(SnapError::not_found("snapshot not found"));
        }
        Ok(meta)
    }

    /// Load a record the caller owns that has not expired
    async fn load_owned_live(
        &self,
        owner_uid: &str,
        id: &SnapshotId,
        now_ms: u64,
    ) -> Result<SnapshotMetadata> {
        let meta = self.load_owned(owner_uid, id).await?;
        if meta.is_expired(now_ms) {
            return Err(SnapError::gone("snapshot has expired"));
        }
        Ok(meta)
    }

    /// Active snapshots currently listed for `owner_uid`
    async fn active_snapshots(&self, owner_uid: &str, now_ms: u64) -> Result<Vec<SnapshotId>> {
        let mut active = Vec::new();
        for id in self.store.owner_snapshots(owner_uid).await? {
            if let Some(meta) = self.store.get_snapshot(&id).await? {
                if meta.owner_uid == owner_uid && meta.is_active(now_ms) {
                    active.push(id);
                }
            }
        }
        Ok(active)
    }

    /// Load a live record that still accepts uploads
    async fn load_owned_uploading(
        &self,
        owner_uid: &str,
        id: &SnapshotId,
        now_ms: u64,
    ) -> Result<SnapshotMetadata> {
        let meta = self.load_owned_live(owner_uid, id, now_ms).await?;
        if meta.status != SnapshotStatus::Creating {
            debug!(snapshot_id = %id, status = ?meta.status, "upload after finalize");
            return Err(SnapError::bad_request("snapshot is finalized; files are immutable"));
        }
        Ok(meta)
    }

    fn choose_password(&self, requested: Option<String>) -> Result<String> {
        match requested.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()) {
            Some(password) => {
                let len = password.chars().count();
                if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
                    return Err(SnapError::bad_request(format!(
                        "password must be {MIN_PASSWORD_LEN} to {MAX_PASSWORD_LEN} characters"
                    )));
                }
                Ok(password)
            }
            None => Ok(generate::gate_password(self.effects.random.as_ref())),
        }
    }

    /// Create a snapshot in `creating`
    ///
    /// The quota check and the eventual registration at finalize are
    /// separate store calls, so concurrent creates can both pass the check.
    pub async fn create(&self, owner_uid: &str, request: CreateSnapshot) -> Result<CreatedSnapshot> {
        let now = self.effects.now_ms();
        let active = self.active_snapshots(owner_uid, now).await?.len();
        if active >= MAX_ACTIVE_SNAPSHOTS {
            debug!(owner = owner_uid, active, "active snapshot quota reached");
            return Err(SnapError::QuotaExceeded {
                active,
                limit: MAX_ACTIVE_SNAPSHOTS,
            });
        }

        let caps = self.plans.plan_for(owner_uid).await.caps();
        let expiry_days = caps.clamp_days(request.expiry_days.unwrap_or(DEFAULT_EXPIRY_DAYS));
        let password = self.choose_password(request.password)?;
        let password_hash = self
            .hasher
            .hash_new(&password, self.effects.random.as_ref())?;
        let id = generate::snapshot_id(self.effects.random.as_ref())?;

        let meta = SnapshotMetadata {
            id: id.clone(),
            owner_uid: owner_uid.to_string(),
            created_at: now,
            expires_at: now.saturating_add(expiry_days.saturating_mul(DAY_MS)),
            password_hash,
            password: Some(password.clone()),
            status: SnapshotStatus::Creating,
            total_bytes: 0,
            files: Vec::new(),
            caps,
            views: ViewBucket::default(),
            public: request.is_public,
        };
        self.store.put_snapshot(&meta).await?;
        info!(snapshot_id = %id, owner = owner_uid, expiry_days, public = meta.public, "snapshot created");

        Ok(CreatedSnapshot {
            id,
            password,
            expiry_days,
            expires_at: meta.expires_at,
            caps,
        })
    }

    /// Presign the upload of one file to `snap/{id}/{path}`
    ///
    /// Only snapshots still in `creating` accept uploads.
    pub async fn authorize_upload(
        &self,
        owner_uid: &str,
        id: &SnapshotId,
        request: UploadRequest,
    ) -> Result<UploadAuthorization> {
        let now = self.effects.now_ms();
        let meta = self.load_owned_uploading(owner_uid, id, now).await?;

        let path = validate_asset_path(&request.path)?;
        let content_type = check_content_type(&request.content_type)?;
        if request.size > meta.caps.max_file_bytes {
            return Err(SnapError::FileTooLarge {
                size: request.size,
                limit: meta.caps.max_file_bytes,
            });
        }

        let key = object_key(id, path);
        let signed = self.signer.presign_put(
            &key,
            Some(content_type.as_str()),
            self.upload_url_ttl_secs,
            now,
        )?;
        debug!(snapshot_id = %id, path, size = request.size, "upload authorized");

        Ok(UploadAuthorization {
            url: signed.url,
            method: "PUT".to_string(),
            key,
            content_type,
            expires_in: self.upload_url_ttl_secs,
        })
    }

    /// Store one file directly, for deployments without a presigning bucket
    ///
    /// Applies the same checks as [`authorize_upload`](Self::authorize_upload)
    /// and returns the manifest entry to pass to finalize.
    pub async fn store_file(
        &self,
        owner_uid: &str,
        id: &SnapshotId,
        path: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<FileEntry> {
        let now = self.effects.now_ms();
        let meta = self.load_owned_uploading(owner_uid, id, now).await?;

        let path = validate_asset_path(path)?;
        let content_type = check_content_type(content_type)?;
        let size = body.len() as u64;
        if size > meta.caps.max_file_bytes {
            return Err(SnapError::FileTooLarge {
                size,
                limit: meta.caps.max_file_bytes,
            });
        }

        let entry = FileEntry {
            name: path.to_string(),
            size,
            hash: generate::content_hash(&body),
            content_type,
        };
        let key = object_key(id, path);
        self.objects
            .put(&key, body, Some(entry.content_type.as_str()))
            .await
            .map_err(|err| {
                tracing::error!(key = %key, error = %err, "object store write failed");
                SnapError::internal(format!("object store put failed: {err}"))
            })?;
        debug!(snapshot_id = %id, path, size, "file stored");
        Ok(entry)
    }

    /// Record the manifest and flip the snapshot to `active`
    ///
    /// Replays overwrite the manifest (last write wins). The quota is checked
    /// again here since `creating` snapshots do not hold a slot.
    pub async fn finalize(
        &self,
        owner_uid: &str,
        id: &SnapshotId,
        request: FinalizeSnapshot,
    ) -> Result<SnapshotSummary> {
        let now = self.effects.now_ms();
        let mut meta = self.load_owned_live(owner_uid, id, now).await?;
        let caps = meta.caps;

        if request.total_bytes > caps.max_bundle_bytes {
            return Err(SnapError::BundleTooLarge {
                size: request.total_bytes,
                limit: caps.max_bundle_bytes,
            });
        }
        if request.files.is_empty() {
            return Err(SnapError::bad_request("manifest has no files"));
        }

        let mut seen = HashSet::new();
        let mut files = Vec::with_capacity(request.files.len());
        let mut sum: u64 = 0;
        for mut file in request.files {
            validate_asset_path(&file.name)?;
            if !seen.insert(file.name.clone()) {
                return Err(SnapError::bad_request(format!(
                    "duplicate file {}",
                    file.name
                )));
            }
            file.content_type = check_content_type(&file.content_type)?;
            if file.size > caps.max_file_bytes {
                return Err(SnapError::FileTooLarge {
                    size: file.size,
                    limit: caps.max_file_bytes,
                });
            }
            sum = sum.saturating_add(file.size);
            files.push(file);
        }
        if sum != request.total_bytes {
            return Err(SnapError::bad_request(format!(
                "totalBytes {} does not match file sizes {sum}",
                request.total_bytes
            )));
        }

        let mut listed = self.active_snapshots(owner_uid, now).await?;
        if !listed.contains(id) {
            if listed.len() >= MAX_ACTIVE_SNAPSHOTS {
                debug!(owner = owner_uid, active = listed.len(), "quota reached at finalize");
                return Err(SnapError::QuotaExceeded {
                    active: listed.len(),
                    limit: MAX_ACTIVE_SNAPSHOTS,
                });
            }
            listed.push(id.clone());
        }

        meta.files = files;
        meta.total_bytes = request.total_bytes;
        meta.status = SnapshotStatus::Active;
        self.store.put_snapshot(&meta).await?;

        // Second, separate write: a crash here leaves the record active but unlisted
        self.store.put_owner_snapshots(owner_uid, &listed).await?;
        info!(
            snapshot_id = %id,
            owner = owner_uid,
            total_bytes = meta.total_bytes,
            files = meta.files.len(),
            "snapshot finalized"
        );
        Ok(SnapshotSummary::from_metadata(&meta, now))
    }

    /// Push expiry out by `days`, never past `created_at + max_days`
    pub async fn extend(
        &self,
        owner_uid: &str,
        id: &SnapshotId,
        request: ExtendSnapshot,
    ) -> Result<SnapshotSummary> {
        let now = self.effects.now_ms();
        let mut meta = self.load_owned_live(owner_uid, id, now).await?;

        let days = meta.caps.clamp_days(request.days);
        let extended = meta.expires_at.saturating_add(days.saturating_mul(DAY_MS));
        meta.expires_at = extended.min(meta.max_expires_at()).max(meta.expires_at);
        self.store.put_snapshot(&meta).await?;
        info!(snapshot_id = %id, owner = owner_uid, expires_at = meta.expires_at, "snapshot extended");

        Ok(SnapshotSummary::from_metadata(&meta, now))
    }

    /// Force the snapshot to `expired`
    pub async fn revoke(&self, owner_uid: &str, id: &SnapshotId) -> Result<SnapshotSummary> {
        let now = self.effects.now_ms();
        let mut meta = self.load_owned_live(owner_uid, id, now).await?;

        meta.status = SnapshotStatus::Expired;
        meta.expires_at = now.saturating_sub(1);
        self.store.put_snapshot(&meta).await?;

        let listed: Vec<SnapshotId> = self
            .store
            .owner_snapshots(owner_uid)
            .await?
            .into_iter()
            .filter(|listed| listed != id)
            .collect();
        self.store.put_owner_snapshots(owner_uid, &listed).await?;
        info!(snapshot_id = %id, owner = owner_uid, "snapshot revoked");

        Ok(SnapshotSummary::from_metadata(&meta, now))
    }

    /// Replace the gate password with a generated one
    pub async fn rotate_password(
        &self,
        owner_uid: &str,
        id: &SnapshotId,
    ) -> Result<RotatedPassword> {
        let now = self.effects.now_ms();
        let mut meta = self.load_owned_live(owner_uid, id, now).await?;

        let password = generate::gate_password(self.effects.random.as_ref());
        meta.password_hash = self
            .hasher
            .hash_new(&password, self.effects.random.as_ref())?;
        meta.password = Some(password.clone());
        self.store.put_snapshot(&meta).await?;
        info!(snapshot_id = %id, owner = owner_uid, "gate password rotated");

        Ok(RotatedPassword { password })
    }

    /// Snapshots listed for `owner_uid`, with lazy expiry applied
    pub async fn list_owner_snapshots(&self, owner_uid: &str) -> Result<Vec<SnapshotSummary>> {
        let now = self.effects.now_ms();
        let mut summaries = Vec::new();
        for id in self.store.owner_snapshots(owner_uid).await? {
            if let Some(meta) = self.store.get_snapshot(&id).await? {
                if meta.owner_uid == owner_uid {
                    summaries.push(SnapshotSummary::from_metadata(&meta, now));
                }
            }
        }
        Ok(summaries)
    }

    /// Owner-only detail view, expired snapshots included
    pub async fn get_snapshot(&self, owner_uid: &str, id: &SnapshotId) -> Result<SnapshotDetail> {
        let meta = self.load_owned(owner_uid, id).await?;
        Ok(SnapshotDetail::from_metadata(&meta, self.effects.now_ms()))
    }
}
