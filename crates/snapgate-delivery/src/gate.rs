//! Viewer gate cookies

use snapgate_core::SnapshotId;

/// Prefix of the per-snapshot gate cookie name
pub const GATE_COOKIE_PREFIX: &str = "snapgate_gate_";

/// Name of the gate cookie for `id`
pub fn gate_cookie_name(id: &SnapshotId) -> String {
    format!("{GATE_COOKIE_PREFIX}{id}")
}

/// Route prefix the gate cookie is scoped to
pub fn gate_cookie_path(id: &SnapshotId) -> String {
    format!("/s/{id}")
}

/// A passed gate: the signed token and how to set it as a cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatePass {
    /// Signed viewer gate token
    pub token: String,
    /// Cookie name
    pub cookie_name: String,
    /// Cookie path
    pub cookie_path: String,
    /// Cookie lifetime, equal to the token lifetime
    pub max_age_secs: u64,
}

impl GatePass {
    /// Gate pass for `id` carrying `token`
    pub fn new(id: &SnapshotId, token: String, max_age_secs: u64) -> Self {
        Self {
            token,
            cookie_name: gate_cookie_name(id),
            cookie_path: gate_cookie_path(id),
            max_age_secs,
        }
    }

    /// `Set-Cookie` header value
    pub fn set_cookie_header(&self) -> String {
        format!(
            "{}={}; Path={}; Max-Age={}; HttpOnly; SameSite=Lax; Secure",
            self.cookie_name, self.token, self.cookie_path, self.max_age_secs
        )
    }
}
