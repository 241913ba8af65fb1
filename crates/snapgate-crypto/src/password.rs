//! Salted password hashing with scrypt
//!
//! Stored digests have the shape `scrypt$<hex hash>$<hex salt>`. The work
//! factor, block size and parallelism are fixed per hasher instance rather
//! than encoded in the digest, so changing them invalidates stored hashes.

use snapgate_core::effects::RandomSource;
use snapgate_core::{Result, SnapError};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Algorithm tag written as the first digest field
pub const ALGORITHM: &str = "scrypt";

/// Salt length in bytes
pub const SALT_LEN: usize = 16;

/// Derived key length in bytes
pub const KEY_LEN: usize = 32;

/// scrypt cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScryptCost {
    /// CPU/memory cost `N`; must be a power of two greater than one
    pub work_factor: u64,
    /// Block size `r`
    pub block_size: u32,
    /// Parallelism `p`
    pub parallelism: u32,
}

impl ScryptCost {
    /// Production parameters (N=16384, r=8, p=1: 16 MiB per hash)
    pub const DEFAULT: Self = Self {
        work_factor: 16_384,
        block_size: 8,
        parallelism: 1,
    };
}

impl Default for ScryptCost {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Hashes and verifies gate passwords
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    params: scrypt::Params,
    cost: ScryptCost,
}

impl CredentialHasher {
    /// Build a hasher, failing on invalid cost parameters
    pub fn new(cost: ScryptCost) -> Result<Self> {
        if cost.work_factor < 2 || !cost.work_factor.is_power_of_two() {
            return Err(SnapError::crypto(format!(
                "scrypt work factor must be a power of two > 1, got {}",
                cost.work_factor
            )));
        }
        let log_n = cost.work_factor.trailing_zeros() as u8;
        let params = scrypt::Params::new(log_n, cost.block_size, cost.parallelism, KEY_LEN)
            .map_err(|e| SnapError::crypto(format!("invalid scrypt parameters: {e}")))?;
        Ok(Self { params, cost })
    }

    /// Hasher with the production parameters
    pub fn with_defaults() -> Result<Self> {
        Self::new(ScryptCost::DEFAULT)
    }

    /// Cost parameters in use
    pub fn cost(&self) -> ScryptCost {
        self.cost
    }

    /// Hash `password` with an explicit salt
    pub fn hash(&self, password: &str, salt: &[u8]) -> Result<String> {
        let mut derived = Zeroizing::new([0u8; KEY_LEN]);
        scrypt::scrypt(password.as_bytes(), salt, &self.params, &mut derived[..])
            .map_err(|e| SnapError::crypto(format!("scrypt failed: {e}")))?;
        Ok(format!(
            "{ALGORITHM}${}${}",
            hex::encode(&derived[..]),
            hex::encode(salt)
        ))
    }

    /// Hash `password` with a fresh random salt
    pub fn hash_new(&self, password: &str, random: &dyn RandomSource) -> Result<String> {
        let salt = random.random_bytes(SALT_LEN);
        self.hash(password, &salt)
    }

    /// Check `password` against a stored digest
    ///
    /// A malformed digest is a mismatch, never an error.
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        let mut parts = stored.split('$');
        let (Some(algorithm), Some(hash_hex), Some(salt_hex), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        if algorithm != ALGORITHM || hash_hex.len() != KEY_LEN * 2 {
            return false;
        }
        let Ok(salt) = hex::decode(salt_hex) else {
            return false;
        };
        let Ok(recomputed) = self.hash(password, &salt) else {
            return false;
        };
        recomputed.as_bytes().ct_eq(stored.as_bytes()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Cheap parameters; only the vector test pays for the real cost
    fn fast_hasher() -> CredentialHasher {
        CredentialHasher::new(ScryptCost {
            work_factor: 16,
            block_size: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    #[test]
    fn matches_reference_vector() {
        let hasher = CredentialHasher::with_defaults().unwrap();
        let salt: Vec<u8> = (0u8..16).collect();
        let digest = hasher.hash("correct horse", &salt).unwrap();
        assert_eq!(
            digest,
            "scrypt$25b376840366f4d3b0e21e414476676e3cd0e89af4430356a234ce0b65a021b5\
             $000102030405060708090a0b0c0d0e0f"
        );
        assert!(hasher.verify("correct horse", &digest));
        assert!(!hasher.verify("correct horse ", &digest));
    }

    #[test]
    fn rejects_non_power_of_two_cost() {
        let err = CredentialHasher::new(ScryptCost {
            work_factor: 1000,
            block_size: 8,
            parallelism: 1,
        })
        .unwrap_err();
        assert_eq!(err.code(), "internal");
        assert!(CredentialHasher::new(ScryptCost {
            work_factor: 1,
            block_size: 8,
            parallelism: 1,
        })
        .is_err());
    }

    #[test]
    fn malformed_digests_never_verify() {
        let hasher = fast_hasher();
        for stored in [
            "",
            "scrypt",
            "scrypt$abcd",
            "bcrypt$00$00",
            "scrypt$zz$00",
            "scrypt$0000000000000000000000000000000000000000000000000000000000000000$nothex",
            "scrypt$00$00$extra",
        ] {
            assert!(!hasher.verify("pw", stored), "{stored:?}");
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn hash_round_trip(
            password in ".{0,40}",
            other in ".{0,40}",
            salt in prop::collection::vec(any::<u8>(), SALT_LEN),
        ) {
            let hasher = fast_hasher();
            let digest = hasher.hash(&password, &salt).unwrap();
            prop_assert!(hasher.verify(&password, &digest));
            if other != password {
                prop_assert!(!hasher.verify(&other, &digest));
            }
        }
    }
}
