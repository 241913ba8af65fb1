//! Randomness source
//!
//! All identifiers, salts and generated passwords draw from an injected
//! source so tests can run against a seeded generator.

use std::sync::Arc;

/// Abstract randomness source
pub trait RandomSource: Send + Sync {
    /// Fill a byte buffer with random data
    fn fill_bytes(&self, dest: &mut [u8]);

    /// Allocate and fill `len` random bytes
    fn random_bytes(&self, len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        self.fill_bytes(&mut bytes);
        bytes
    }
}

impl<T: RandomSource + ?Sized> RandomSource for Arc<T> {
    fn fill_bytes(&self, dest: &mut [u8]) {
        (**self).fill_bytes(dest);
    }
}
