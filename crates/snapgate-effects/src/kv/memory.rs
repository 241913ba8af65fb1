//! In-memory key-value store with TTL

use async_trait::async_trait;
use snapgate_core::effects::{KvStoreEffects, PutOptions, StoreError, TimeSource};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at_ms: Option<u64>,
}

impl Entry {
    fn is_live(&self, now_ms: u64) -> bool {
        self.expires_at_ms.map_or(true, |at| now_ms < at)
    }
}

/// In-memory key-value store
///
/// Expired keys are hidden on read and dropped lazily on the next write to
/// the same key. TTLs are measured against the injected clock.
pub struct MemoryKvStore {
    data: Arc<RwLock<BTreeMap<String, Entry>>>,
    time: Arc<dyn TimeSource>,
}

impl MemoryKvStore {
    /// Create an empty store measuring TTLs against `time`
    pub fn new(time: Arc<dyn TimeSource>) -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
            time,
        }
    }

    /// Number of live keys
    pub async fn len(&self) -> usize {
        let now = self.time.now_ms();
        self.data.read().await.values().filter(|e| e.is_live(now)).count()
    }

    /// Whether no live keys remain
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KvStoreEffects for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = self.time.now_ms();
        let data = self.data.read().await;
        Ok(data
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    async fn put(&self, key: &str, value: String, options: PutOptions) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey {
                reason: "Key cannot be empty".to_string(),
            });
        }
        let expires_at_ms = options
            .ttl_secs
            .map(|ttl| self.time.now_ms().saturating_add(ttl.saturating_mul(1000)));
        let mut data = self.data.write().await;
        data.insert(
            key.to_string(),
            Entry {
                value,
                expires_at_ms,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let now = self.time.now_ms();
        let mut data = self.data.write().await;
        Ok(data.remove(key).is_some_and(|e| e.is_live(now)))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let now = self.time.now_ms();
        let data = self.data.read().await;
        Ok(data
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .filter(|(_, e)| e.is_live(now))
            .map(|(k, _)| k.clone())
            .collect())
    }
}
