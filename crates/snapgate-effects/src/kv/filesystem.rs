//! Filesystem-backed key-value store
//!
//! One JSON envelope per key under the base directory. File names are the
//! hex encoding of the key, so arbitrary keys (`snapshot:{id}`,
//! `owner:{uid}:snapshots`) map to flat, traversal-free names and can be
//! decoded back for prefix listing. Keys whose hex form would not fit in a
//! file name are stored as `h-{sha256}.json` instead; listing recovers
//! those keys from the envelope.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use snapgate_core::effects::{KvStoreEffects, PutOptions, StoreError, TimeSource};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

const EXTENSION: &str = "json";

/// Longest file name most filesystems accept
const MAX_FILE_NAME: usize = 255;

/// Prefix of hashed file names; hex names never contain `-`
const HASHED_PREFIX: &str = "h-";

/// Longest key accepted at all
pub const MAX_KEY_LEN: usize = 4096;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<u64>,
}

/// Filesystem key-value store for single-node deployments
pub struct FilesystemKvStore {
    base_path: PathBuf,
    time: Arc<dyn TimeSource>,
}

impl FilesystemKvStore {
    /// Store rooted at `base_path`; the directory is created on first write
    pub fn new(base_path: PathBuf, time: Arc<dyn TimeSource>) -> Self {
        Self { base_path, time }
    }

    fn file_name(key: &str) -> String {
        let hexed = hex::encode(key.as_bytes());
        if hexed.len() + EXTENSION.len() + 1 <= MAX_FILE_NAME {
            format!("{hexed}.{EXTENSION}")
        } else {
            let digest = hex::encode(Sha256::digest(key.as_bytes()));
            format!("{HASHED_PREFIX}{digest}.{EXTENSION}")
        }
    }

    fn key_to_path(&self, key: &str) -> PathBuf {
        self.base_path.join(Self::file_name(key))
    }

    fn validate_key(key: &str) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey {
                reason: "Key cannot be empty".to_string(),
            });
        }
        if key.len() > MAX_KEY_LEN {
            return Err(StoreError::InvalidKey {
                reason: format!("Key too long ({} bytes)", key.len()),
            });
        }
        Ok(())
    }

    /// Key of a hex-named file; `None` for hashed or foreign names
    fn path_to_key(name: &str) -> Option<String> {
        let stem = name.strip_suffix(EXTENSION)?.strip_suffix('.')?;
        String::from_utf8(hex::decode(stem).ok()?).ok()
    }

    async fn read_envelope(&self, key: &str) -> Result<Option<Envelope>, StoreError> {
        match self.read_path(&self.key_to_path(key)).await? {
            // A hashed name holding a different key is a digest collision
            Some(envelope) if envelope.key.as_deref().map_or(true, |k| k == key) => {
                Ok(Some(envelope))
            }
            _ => Ok(None),
        }
    }

    async fn read_path(&self, path: &Path) -> Result<Option<Envelope>, StoreError> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Unavailable(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )))
            }
        };
        let envelope: Envelope = serde_json::from_slice(&bytes).map_err(|e| {
            StoreError::Unavailable(format!("Corrupt entry {}: {e}", path.display()))
        })?;
        let now = self.time.now_ms();
        Ok(envelope
            .expires_at
            .map_or(true, |at| now < at)
            .then_some(envelope))
    }
}

#[async_trait]
impl KvStoreEffects for FilesystemKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_envelope(key).await?.map(|e| e.value))
    }

    async fn put(&self, key: &str, value: String, options: PutOptions) -> Result<(), StoreError> {
        Self::validate_key(key)?;
        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            StoreError::Unavailable(format!("Failed to create directory: {e}"))
        })?;

        let envelope = Envelope {
            key: Some(key.to_string()),
            value,
            expires_at: options
                .ttl_secs
                .map(|ttl| self.time.now_ms().saturating_add(ttl.saturating_mul(1000))),
        };
        let bytes = serde_json::to_vec(&envelope)
            .map_err(|e| StoreError::Unavailable(format!("Failed to encode entry: {e}")))?;

        // Write-then-rename so readers never observe a torn entry
        let path = self.key_to_path(key);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to write file: {e}")))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to commit file: {e}")))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let existed = self.read_envelope(key).await?.is_some();
        match fs::remove_file(self.key_to_path(key)).await {
            Ok(()) => Ok(existed),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Unavailable(format!("Failed to remove file: {e}"))),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Unavailable(format!(
                    "Failed to read directory: {e}"
                )))
            }
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to read entry: {e}")))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let key = if name.starts_with(HASHED_PREFIX) && name.ends_with(EXTENSION) {
                match self.read_path(&entry.path()).await? {
                    Some(Envelope { key: Some(key), .. }) => key,
                    _ => continue,
                }
            } else {
                match Self::path_to_key(name) {
                    Some(key) => key,
                    None => continue,
                }
            };
            if key.starts_with(prefix) && self.read_envelope(&key).await?.is_some() {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}
