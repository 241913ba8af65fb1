//! Compact signed bearer tokens
//!
//! `base64url(json(claims + exp)) "." base64url(HMAC-SHA256(left, secret))`
//!
//! Producer sessions and viewer gates are both instances of this codec and
//! differ only in claim shape. Tokens are not revocable before `exp`;
//! rotating the secret invalidates every outstanding token at once.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use snapgate_core::{Result, SnapError, SnapshotId};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Claims carried by a producer session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerClaims {
    /// Producer identity from the identity provider
    pub uid: String,
}

/// Sentinel marking a viewer gate token
pub const VIEWER_GATE_SENTINEL: &str = "viewer";

/// Claims carried by a viewer gate cookie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerGateClaims {
    /// Always [`VIEWER_GATE_SENTINEL`]
    pub gate: String,
    /// Snapshot the gate was passed for
    pub sid: SnapshotId,
}

impl ViewerGateClaims {
    /// Gate claims for one snapshot
    pub fn for_snapshot(id: &SnapshotId) -> Self {
        Self {
            gate: VIEWER_GATE_SENTINEL.to_string(),
            sid: id.clone(),
        }
    }

    /// Whether these claims open `id`
    pub fn grants(&self, id: &SnapshotId) -> bool {
        self.gate == VIEWER_GATE_SENTINEL && &self.sid == id
    }
}

/// Signs and verifies tokens with one HMAC secret
#[derive(Clone)]
pub struct TokenCodec {
    secret: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Codec keyed with `secret`
    pub fn new(secret: &[u8]) -> Self {
        Self {
            secret: Zeroizing::new(secret.to_vec()),
        }
    }

    fn mac(&self, data: &[u8]) -> Vec<u8> {
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.secret) else {
            unreachable!("HMAC accepts keys of any length");
        };
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }

    /// Sign `claims`, adding `exp = now_secs + ttl_secs`
    ///
    /// Claims must serialise to a JSON object without an `exp` field.
    pub fn sign<C: Serialize>(&self, claims: &C, ttl_secs: u64, now_secs: u64) -> Result<String> {
        let serde_json::Value::Object(mut payload) = serde_json::to_value(claims)? else {
            return Err(SnapError::bad_request("token claims must be a JSON object"));
        };
        if payload.contains_key("exp") {
            return Err(SnapError::bad_request("token claims must not set exp"));
        }
        payload.insert(
            "exp".to_string(),
            serde_json::Value::from(now_secs.saturating_add(ttl_secs)),
        );

        let body = serde_json::to_vec(&payload)?;
        let left = URL_SAFE_NO_PAD.encode(body);
        let signature = URL_SAFE_NO_PAD.encode(self.mac(left.as_bytes()));
        Ok(format!("{left}.{signature}"))
    }

    /// Verify `token` and return its claims
    ///
    /// `None` on a bad signature, bad encoding, a missing or non-numeric
    /// `exp`, or when `now_secs > exp`.
    pub fn verify<C: DeserializeOwned>(&self, token: &str, now_secs: u64) -> Option<C> {
        let (left, signature) = token.split_once('.')?;
        let provided = URL_SAFE_NO_PAD.decode(signature).ok()?;
        let expected = self.mac(left.as_bytes());
        if !bool::from(expected.ct_eq(&provided)) {
            return None;
        }

        let body = URL_SAFE_NO_PAD.decode(left).ok()?;
        let serde_json::Value::Object(mut payload) = serde_json::from_slice(&body).ok()? else {
            return None;
        };
        let exp = payload.remove("exp")?.as_f64()?;
        if now_secs as f64 > exp {
            return None;
        }
        serde_json::from_value(serde_json::Value::Object(payload)).ok()
    }
}
