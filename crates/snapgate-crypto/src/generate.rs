//! Identifier, password and fingerprint generation

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};
use snapgate_core::effects::RandomSource;
use snapgate_core::{Result, SnapError, SnapshotId};

/// Random bytes behind a snapshot id (16 URL-safe characters)
pub const ID_BYTES: usize = 12;

/// Length of generated gate passwords
pub const PASSWORD_LEN: usize = 18;

/// Password alphabet without look-alike characters (`0 O 1 l I i o`)
pub const PASSWORD_ALPHABET: &[u8] = b"abcdefghjkmnpqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Fresh random snapshot identifier
pub fn snapshot_id(random: &dyn RandomSource) -> Result<SnapshotId> {
    let encoded = URL_SAFE_NO_PAD.encode(random.random_bytes(ID_BYTES));
    SnapshotId::parse(&encoded)
        .ok_or_else(|| SnapError::internal("generated snapshot id is not URL-safe"))
}

/// Fresh random gate password
///
/// Bytes at or above the largest multiple of the alphabet size are
/// discarded so every character is equally likely.
pub fn gate_password(random: &dyn RandomSource) -> String {
    let alphabet_len = PASSWORD_ALPHABET.len();
    let limit = 256 - (256 % alphabet_len);
    let mut password = String::with_capacity(PASSWORD_LEN);
    let mut buf = [0u8; 32];
    while password.len() < PASSWORD_LEN {
        random.fill_bytes(&mut buf);
        for &b in buf.iter().filter(|&&b| (b as usize) < limit) {
            if password.len() == PASSWORD_LEN {
                break;
            }
            password.push(PASSWORD_ALPHABET[b as usize % alphabet_len] as char);
        }
    }
    password
}

/// Stable per-viewer fingerprint: hex SHA-256 of `ip|user-agent`
pub fn viewer_fingerprint(client_ip: &str, user_agent: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(client_ip.as_bytes());
    hasher.update(b"|");
    hasher.update(user_agent.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hex SHA-256 of file contents, recorded in the manifest
pub fn content_hash(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU8, Ordering};

    /// Emits 0, 1, 2, ... wrapping at 256
    struct Counter(AtomicU8);

    impl RandomSource for Counter {
        fn fill_bytes(&self, dest: &mut [u8]) {
            for b in dest {
                *b = self.0.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Emits only bytes that must be rejected
    struct AlwaysHigh(AtomicU8);

    impl RandomSource for AlwaysHigh {
        fn fill_bytes(&self, dest: &mut [u8]) {
            let calls = self.0.fetch_add(1, Ordering::Relaxed);
            let value = if calls < 3 { 255 } else { 0 };
            dest.fill(value);
        }
    }

    #[test]
    fn alphabet_has_no_lookalikes() {
        assert_eq!(PASSWORD_ALPHABET.len(), 55);
        for c in b"0O1lIio" {
            assert!(!PASSWORD_ALPHABET.contains(c));
        }
    }

    #[test]
    fn passwords_use_the_alphabet() {
        let password = gate_password(&Counter(AtomicU8::new(0)));
        assert_eq!(password.len(), PASSWORD_LEN);
        assert_eq!(password, "abcdefghjkmnpqrstu");
        assert!(password.bytes().all(|b| PASSWORD_ALPHABET.contains(&b)));
    }

    #[test]
    fn biased_bytes_are_skipped() {
        let password = gate_password(&AlwaysHigh(AtomicU8::new(0)));
        assert_eq!(password, "a".repeat(PASSWORD_LEN));
    }

    #[test]
    fn ids_are_url_safe() {
        let random = Counter(AtomicU8::new(250));
        let id = snapshot_id(&random).unwrap();
        assert_eq!(id.as_str().len(), 16);
        assert_ne!(id, snapshot_id(&random).unwrap());
    }

    #[test]
    fn fingerprint_reference() {
        assert_eq!(
            viewer_fingerprint("203.0.113.7", "Mozilla/5.0"),
            "e71837e3cd723943da9bb07f05d094b8954e6b7fbf71510963851af63d139ca3"
        );
        assert_ne!(
            viewer_fingerprint("203.0.113.7", "Mozilla/5.0"),
            viewer_fingerprint("203.0.113.8", "Mozilla/5.0")
        );
    }

    #[test]
    fn content_hash_is_hex_sha256() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
