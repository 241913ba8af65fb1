//! Randomness handlers
//!
//! This is the one place allowed to reach the OS RNG directly.

#![allow(clippy::disallowed_methods)]

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use snapgate_core::effects::RandomSource;
use std::sync::Arc;

/// Cryptographically secure OS-backed randomness
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandomSource;

impl OsRandomSource {
    /// Create a new OS random source
    pub fn new() -> Self {
        Self
    }
}

impl RandomSource for OsRandomSource {
    fn fill_bytes(&self, dest: &mut [u8]) {
        rand::thread_rng().fill_bytes(dest);
    }
}

/// Seeded deterministic RNG for tests
///
/// Clones share one generator state.
#[derive(Debug, Clone)]
pub struct SeededRandomSource {
    rng: Arc<Mutex<StdRng>>,
}

impl SeededRandomSource {
    /// Create a generator from a seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }
}

impl Default for SeededRandomSource {
    fn default() -> Self {
        Self::new(0)
    }
}

impl RandomSource for SeededRandomSource {
    fn fill_bytes(&self, dest: &mut [u8]) {
        self.rng.lock().fill_bytes(dest);
    }
}
