//! Fault-injecting key-value store wrapper
//!
//! Fails a scripted number of upcoming calls before delegating to the inner
//! store, or every put under a key prefix. Used to exercise the retry path
//! of the metadata adapter and partial-write handling above it.

use async_trait::async_trait;
use parking_lot::Mutex;
use snapgate_core::effects::{KvStoreEffects, PutOptions, StoreError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Wraps a store and fails queued calls
pub struct FaultInjectingKvStore<S> {
    inner: S,
    faults: Mutex<VecDeque<StoreError>>,
    failing_prefix: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl<S: KvStoreEffects> FaultInjectingKvStore<S> {
    /// Wrap `inner` with no faults queued
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            faults: Mutex::new(VecDeque::new()),
            failing_prefix: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail the next `count` calls with `RateLimited`
    pub fn rate_limit_next(&self, count: usize) {
        let mut faults = self.faults.lock();
        for _ in 0..count {
            faults.push_back(StoreError::RateLimited("injected".to_string()));
        }
    }

    /// Fail the next call with `error`
    pub fn fail_next(&self, error: StoreError) {
        self.faults.lock().push_back(error);
    }

    /// Fail every put to a key starting with `prefix` until [`heal`](Self::heal)
    pub fn fail_puts_under(&self, prefix: &str) {
        *self.failing_prefix.lock() = Some(prefix.to_string());
    }

    /// Stop failing puts by prefix
    pub fn heal(&self) {
        *self.failing_prefix.lock() = None;
    }

    /// Calls seen so far, failed ones included
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The wrapped store
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn intercept(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.faults.lock().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<S: KvStoreEffects> KvStoreEffects for FaultInjectingKvStore<S> {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.intercept()?;
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: String, options: PutOptions) -> Result<(), StoreError> {
        self.intercept()?;
        let failing = self
            .failing_prefix
            .lock()
            .as_deref()
            .is_some_and(|prefix| key.starts_with(prefix));
        if failing {
            return Err(StoreError::Unavailable(format!("injected failure for {key}")));
        }
        self.inner.put(key, value, options).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.intercept()?;
        self.inner.delete(key).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.intercept()?;
        self.inner.list(prefix).await
    }
}
