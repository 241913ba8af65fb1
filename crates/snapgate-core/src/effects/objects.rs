//! External object store holding snapshot files
//!
//! Uploads normally bypass this interface entirely (clients PUT to a
//! presigned URL); the core only reads objects back for serving.

use async_trait::async_trait;
use std::sync::Arc;

/// Error type for object store operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObjectStoreError {
    /// Backend failed the request
    #[error("Object store unavailable: {0}")]
    Unavailable(String),
    /// Key was rejected by the backend
    #[error("Invalid object key: {0}")]
    InvalidKey(String),
}

/// An object read back from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Object bytes
    pub body: Vec<u8>,
    /// Content type recorded at upload time, if any
    pub content_type: Option<String>,
}

/// Object store operations
#[async_trait]
pub trait ObjectStoreEffects: Send + Sync {
    /// Store an object
    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), ObjectStoreError>;

    /// Fetch an object
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, ObjectStoreError>;

    /// Delete objects; missing keys are ignored
    async fn delete(&self, keys: &[String]) -> Result<(), ObjectStoreError>;

    /// List object keys under a prefix, sorted
    async fn list(&self, prefix: &str) -> Result<Vec<String>, ObjectStoreError>;
}

#[async_trait]
impl<T: ObjectStoreEffects + ?Sized> ObjectStoreEffects for Arc<T> {
    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), ObjectStoreError> {
        (**self).put(key, body, content_type).await
    }

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, ObjectStoreError> {
        (**self).get(key).await
    }

    async fn delete(&self, keys: &[String]) -> Result<(), ObjectStoreError> {
        (**self).delete(keys).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, ObjectStoreError> {
        (**self).list(prefix).await
    }
}
