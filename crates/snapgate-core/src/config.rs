//! Service configuration
//!
//! Loaded from a TOML file, overlaid with `SNAPGATE_*` environment
//! variables, then validated once at startup.

use crate::reliability::RetryPolicy;
use crate::types::PlanTier;
use crate::{Result, SnapError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "SNAPGATE_";

/// Minimum session secret length in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// A string that never prints itself
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the secret value
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

/// Object storage endpoint and credentials used for presigning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectStoreConfig {
    /// Scheme and host, e.g. `https://<account>.r2.cloudflarestorage.com`
    pub endpoint: String,
    /// Bucket holding snapshot files
    pub bucket: String,
    /// Signing region
    pub region: String,
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: Secret,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9000".to_string(),
            bucket: "snapshots".to_string(),
            region: "auto".to_string(),
            access_key_id: String::new(),
            secret_access_key: Secret::default(),
        }
    }
}

/// Retry settings for the metadata store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// First backoff delay
    pub initial_delay_ms: u64,
    /// Backoff ceiling
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 50,
            max_delay_ms: 2000,
        }
    }
}

impl RetryConfig {
    /// Build the policy described by this configuration
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::exponential()
            .with_max_attempts(self.max_attempts)
            .with_initial_delay(Duration::from_millis(self.initial_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
    }
}

/// Top-level Snapgate configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapgateConfig {
    /// Listen address of the HTTP surface
    pub bind_address: String,
    /// Directory for the filesystem-backed stores
    pub data_dir: PathBuf,
    /// HMAC secret for producer sessions and viewer gates
    pub session_secret: Secret,
    /// Producer session lifetime
    pub session_ttl_seconds: u64,
    /// Viewer gate cookie lifetime
    pub gate_ttl_seconds: u64,
    /// Lifetime of presigned upload URLs
    pub upload_url_ttl_seconds: u64,
    /// Tier applied when no billing collaborator is wired in
    pub default_plan: PlanTier,
    /// Object storage used for uploads
    pub object_store: ObjectStoreConfig,
    /// Metadata store retry settings
    pub retry: RetryConfig,
}

impl Default for SnapgateConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8787".to_string(),
            data_dir: PathBuf::from("./snapgate-data"),
            session_secret: Secret::default(),
            session_ttl_seconds: 30 * 86_400,
            gate_ttl_seconds: 3_600,
            upload_url_ttl_seconds: 900,
            default_plan: PlanTier::Free,
            object_store: ObjectStoreConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl SnapgateConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SnapError::internal(format!("Failed to read config file: {e}")))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| SnapError::bad_request(format!("Invalid TOML: {e}")))
    }

    /// Overlay `SNAPGATE_*` variables from the process environment
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Overlay `SNAPGATE_*` variables from an explicit list
    pub fn merge_with_vars<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(name) = key.strip_prefix(ENV_PREFIX) {
                self.set_from_string(&name.to_ascii_lowercase(), &value)?;
            }
        }
        Ok(())
    }

    /// Set one value by its flattened snake_case name
    pub fn set_from_string(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "bind_address" => self.bind_address = value.to_string(),
            "data_dir" => self.data_dir = PathBuf::from(value),
            "session_secret" => self.session_secret = Secret::new(value),
            "session_ttl_seconds" => self.session_ttl_seconds = parse_u64(key, value)?,
            "gate_ttl_seconds" => self.gate_ttl_seconds = parse_u64(key, value)?,
            "upload_url_ttl_seconds" => self.upload_url_ttl_seconds = parse_u64(key, value)?,
            "default_plan" => {
                self.default_plan = match value {
                    "free" => PlanTier::Free,
                    "pro" => PlanTier::Pro,
                    other => {
                        return Err(SnapError::bad_request(format!("Unknown plan: {other}")))
                    }
                }
            }
            "object_store_endpoint" => self.object_store.endpoint = value.to_string(),
            "object_store_bucket" => self.object_store.bucket = value.to_string(),
            "object_store_region" => self.object_store.region = value.to_string(),
            "object_store_access_key_id" => self.object_store.access_key_id = value.to_string(),
            "object_store_secret_access_key" => {
                self.object_store.secret_access_key = Secret::new(value);
            }
            "retry_max_attempts" => self.retry.max_attempts = parse_u64(key, value)? as u32,
            "retry_initial_delay_ms" => self.retry.initial_delay_ms = parse_u64(key, value)?,
            "retry_max_delay_ms" => self.retry.max_delay_ms = parse_u64(key, value)?,
            // Unrelated SNAPGATE_* variables are ignored
            _ => tracing::debug!(key, "ignoring unknown configuration key"),
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.session_secret.expose().len() < MIN_SECRET_LEN {
            return Err(SnapError::bad_request(format!(
                "session_secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        if self.session_ttl_seconds == 0
            || self.gate_ttl_seconds == 0
            || self.upload_url_ttl_seconds == 0
        {
            return Err(SnapError::bad_request("TTLs must be non-zero"));
        }
        if !(self.object_store.endpoint.starts_with("https://")
            || self.object_store.endpoint.starts_with("http://"))
        {
            return Err(SnapError::bad_request(
                "object_store.endpoint must include a scheme",
            ));
        }
        if self.object_store.bucket.is_empty() {
            return Err(SnapError::bad_request("object_store.bucket is required"));
        }
        if self.retry.max_attempts == 0 {
            return Err(SnapError::bad_request("retry.max_attempts must be >= 1"));
        }
        Ok(())
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| SnapError::bad_request(format!("{key} must be an unsigned integer")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn parses_toml_with_defaults() {
        let config = SnapgateConfig::from_toml(
            r#"
            bind_address = "0.0.0.0:9000"
            session_secret = "0123456789abcdef0123456789abcdef"
            default_plan = "pro"

            [object_store]
            endpoint = "https://acct.r2.cloudflarestorage.com"
            bucket = "snaps"
            "#,
        )
        .unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:9000");
        assert_eq!(config.default_plan, PlanTier::Pro);
        assert_eq!(config.object_store.region, "auto");
        assert_eq!(config.gate_ttl_seconds, 3_600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = SnapgateConfig::default();
        config
            .merge_with_vars(vec![
                ("SNAPGATE_SESSION_SECRET".to_string(), SECRET.to_string()),
                ("SNAPGATE_GATE_TTL_SECONDS".to_string(), "60".to_string()),
                (
                    "SNAPGATE_OBJECT_STORE_SECRET_ACCESS_KEY".to_string(),
                    "s3cr3t".to_string(),
                ),
                ("HOME".to_string(), "/root".to_string()),
            ])
            .unwrap();

        assert_eq!(config.session_secret.expose(), SECRET);
        assert_eq!(config.gate_ttl_seconds, 60);
        assert_eq!(config.object_store.secret_access_key.expose(), "s3cr3t");
    }

    #[test]
    fn rejects_bad_numbers_and_short_secrets() {
        let mut config = SnapgateConfig::default();
        assert!(config
            .set_from_string("gate_ttl_seconds", "soon")
            .is_err());
        assert!(config.validate().is_err());
    }

    #[test]
    fn secrets_are_redacted_in_debug_output() {
        let mut config = SnapgateConfig::default();
        config.session_secret = Secret::new(SECRET);
        let rendered = format!("{config:?}");
        assert!(!rendered.contains(SECRET));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapgate.toml");
        std::fs::write(&path, format!("session_secret = \"{SECRET}\"\n")).unwrap();
        let config = SnapgateConfig::load_from_file(&path).unwrap();
        assert_eq!(config.session_secret.expose(), SECRET);
    }
}
