//! In-memory object store

use async_trait::async_trait;
use snapgate_core::effects::{ObjectStoreEffects, ObjectStoreError, StoredObject};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory object store
#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<RwLock<BTreeMap<String, StoredObject>>>,
}

impl MemoryObjectStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStoreEffects for MemoryObjectStore {
    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), ObjectStoreError> {
        if key.is_empty() {
            return Err(ObjectStoreError::InvalidKey("empty key".to_string()));
        }
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.map(str::to_string),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, ObjectStoreError> {
        Ok(self.objects.read().await.get(key).cloned())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), ObjectStoreError> {
        let mut objects = self.objects.write().await;
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, ObjectStoreError> {
        let objects = self.objects.read().await;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}
