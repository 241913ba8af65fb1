//! External metadata key-value store
//!
//! Read-modify-write at key granularity, optional per-key TTL, prefix
//! listing. There are no multi-key transactions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Error type for key-value store operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum StoreError {
    /// The store asked us to slow down; safe to retry
    #[error("Rate limited: {0}")]
    RateLimited(String),
    /// The store could not be reached or failed the request
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    /// Key was rejected by the store
    #[error("Invalid key: {reason}")]
    InvalidKey {
        /// Why the key was rejected
        reason: String,
    },
}

impl StoreError {
    /// Whether the operation may succeed if repeated
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

/// Options for a put
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PutOptions {
    /// Seconds until the key disappears
    pub ttl_secs: Option<u64>,
}

impl PutOptions {
    /// Put with an expiry
    pub fn with_ttl(ttl_secs: u64) -> Self {
        Self {
            ttl_secs: Some(ttl_secs),
        }
    }
}

/// Key-value store operations
#[async_trait]
pub trait KvStoreEffects: Send + Sync {
    /// Fetch a value; `None` if absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one
    async fn put(&self, key: &str, value: String, options: PutOptions) -> Result<(), StoreError>;

    /// Delete a key; returns whether it existed
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// List live keys starting with `prefix`, sorted
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

#[async_trait]
impl<T: KvStoreEffects + ?Sized> KvStoreEffects for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, value: String, options: PutOptions) -> Result<(), StoreError> {
        (**self).put(key, value, options).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        (**self).delete(key).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        (**self).list(prefix).await
    }
}
