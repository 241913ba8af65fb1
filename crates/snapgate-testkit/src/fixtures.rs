//! Fixed configuration and inputs shared by tests

use snapgate_core::{ObjectStoreConfig, PlanTier, RetryConfig, Secret, SnapgateConfig};
use snapgate_crypto::{CredentialHasher, ScryptCost};

/// 32-byte session secret
pub const TEST_SECRET: &str = "snapgate-test-secret-0123456789ab";

/// Configuration that passes validation and points at a fake bucket
pub fn test_config() -> SnapgateConfig {
    SnapgateConfig {
        session_secret: Secret::new(TEST_SECRET),
        default_plan: PlanTier::Free,
        object_store: ObjectStoreConfig {
            endpoint: "https://acct.r2.cloudflarestorage.com".to_string(),
            bucket: "snapshots".to_string(),
            region: "auto".to_string(),
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: Secret::new("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY"),
        },
        retry: RetryConfig {
            max_attempts: 1,
            initial_delay_ms: 1,
            max_delay_ms: 1,
        },
        ..SnapgateConfig::default()
    }
}

/// scrypt at the smallest legal cost, fast enough for unoptimised tests
pub fn fast_hasher() -> CredentialHasher {
    CredentialHasher::new(ScryptCost {
        work_factor: 16,
        block_size: 1,
        parallelism: 1,
    })
    .expect("minimal scrypt cost is valid")
}

/// An HTML document of exactly `len` bytes
pub fn html_of_len(len: usize) -> Vec<u8> {
    let mut page = b"<!doctype html><p>".to_vec();
    page.resize(len.max(page.len()), b'x');
    page.truncate(len);
    page
}
