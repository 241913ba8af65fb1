//! Producer sessions
//!
//! A producer session is a signed `{uid}` token. How the uid was obtained
//! (passkey, OAuth, password) is the identity provider's business.

use snapgate_core::effects::TimeSource;
use snapgate_core::{Result, SnapError};
use snapgate_crypto::{ProducerClaims, TokenCodec};
use std::sync::Arc;

/// Longest accepted producer identity
pub const MAX_UID_LEN: usize = 128;

/// Issues and authenticates producer session tokens
#[derive(Clone)]
pub struct ProducerSessions {
    codec: TokenCodec,
    ttl_secs: u64,
    time: Arc<dyn TimeSource>,
}

impl std::fmt::Debug for ProducerSessions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProducerSessions")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl ProducerSessions {
    /// Sessions signed by `codec` and valid for `ttl_secs`
    pub fn new(codec: TokenCodec, ttl_secs: u64, time: Arc<dyn TimeSource>) -> Self {
        Self {
            codec,
            ttl_secs,
            time,
        }
    }

    /// Session lifetime in seconds
    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Sign a session for `uid`
    pub fn issue(&self, uid: &str) -> Result<String> {
        let uid = uid.trim();
        if uid.is_empty() || uid.len() > MAX_UID_LEN || uid.contains(':') {
            return Err(SnapError::bad_request("invalid producer identity"));
        }
        let token = self.codec.sign(
            &ProducerClaims {
                uid: uid.to_string(),
            },
            self.ttl_secs,
            self.time.now_secs(),
        )?;
        tracing::info!(owner = uid, ttl_secs = self.ttl_secs, "issued producer session");
        Ok(token)
    }

    /// Resolve a session token to its producer identity
    pub fn authenticate(&self, token: &str) -> Result<String> {
        self.codec
            .verify::<ProducerClaims>(token, self.time.now_secs())
            .map(|claims| claims.uid)
            .filter(|uid| !uid.is_empty())
            .ok_or_else(|| SnapError::unauthorized("invalid or expired session"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapgate_effects::SimulatedTimeSource;

    #[test]
    fn sessions_round_trip_until_expiry() {
        let clock = SimulatedTimeSource::new(1_705_322_096_000);
        let sessions = ProducerSessions::new(
            TokenCodec::new(b"0123456789abcdef0123456789abcdef"),
            60,
            Arc::new(clock.clone()),
        );
        let token = sessions.issue("user-1").unwrap();
        assert_eq!(sessions.authenticate(&token).unwrap(), "user-1");

        clock.advance_secs(61);
        assert_eq!(
            sessions.authenticate(&token).unwrap_err().code(),
            "unauthorized"
        );
        assert!(sessions.authenticate("garbage").is_err());
    }

    #[test]
    fn rejects_unusable_identities() {
        let sessions = ProducerSessions::new(
            TokenCodec::new(b"secret"),
            60,
            Arc::new(SimulatedTimeSource::new(0)),
        );
        assert!(sessions.issue("").is_err());
        assert!(sessions.issue("  ").is_err());
        assert!(sessions.issue("a:b").is_err());
        assert!(sessions.issue(&"x".repeat(MAX_UID_LEN + 1)).is_err());
    }
}
