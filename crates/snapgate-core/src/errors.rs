//! Unified error taxonomy for Snapgate
//!
//! Every outcome the core hands back to a caller is one of these variants.
//! All of them except `Internal` and `Crypto` are expected, user-facing
//! results: they are never retried and never logged as failures.

use serde::{Deserialize, Serialize};

/// Unified error type for all Snapgate operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum SnapError {
    /// No caller identity, or an invalid one, where one is required
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// What was missing or invalid
        message: String,
    },

    /// Caller identity present but not allowed to act on this resource
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Why access was refused
        message: String,
    },

    /// Resource id does not resolve (also used for non-owner access)
    #[error("Not found: {message}")]
    NotFound {
        /// What was not found
        message: String,
    },

    /// Resource exists but has expired or been revoked
    #[error("Gone: {message}")]
    Gone {
        /// What expired
        message: String,
    },

    /// Owner already holds the maximum number of active snapshots
    #[error("Quota exceeded: {active} of {limit} active snapshots in use")]
    QuotaExceeded {
        /// Active snapshots currently held
        active: usize,
        /// Maximum allowed
        limit: usize,
    },

    /// Malformed input (missing fields, traversal attempt, bad schema)
    #[error("Bad request: {message}")]
    BadRequest {
        /// Description of the malformed input
        message: String,
    },

    /// A single file exceeds the per-file cap
    #[error("File too large: {size} bytes exceeds {limit}")]
    FileTooLarge {
        /// Declared size
        size: u64,
        /// Per-file cap
        limit: u64,
    },

    /// The bundle exceeds the bundle cap
    #[error("Bundle too large: {size} bytes exceeds {limit}")]
    BundleTooLarge {
        /// Declared bundle size
        size: u64,
        /// Bundle cap
        limit: u64,
    },

    /// Content type outside the upload allow-list
    #[error("Content type not allowed: {content_type}")]
    TypeNotAllowed {
        /// The rejected content type
        content_type: String,
    },

    /// Cryptographic configuration problem (invalid KDF parameters, bad key)
    #[error("Crypto error: {message}")]
    Crypto {
        /// Error message describing the cryptographic failure
        message: String,
    },

    /// Unexpected collaborator failure after retries were exhausted
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl SnapError {
    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a forbidden error
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a gone error
    pub fn gone(message: impl Into<String>) -> Self {
        Self::Gone {
            message: message.into(),
        }
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Create a crypto error
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable machine-readable code surfaced to clients
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "unauthorized",
            Self::Forbidden { .. } => "forbidden",
            Self::NotFound { .. } => "not_found",
            Self::Gone { .. } => "gone",
            Self::QuotaExceeded { .. } => "quota_exceeded",
            Self::BadRequest { .. } => "bad_request",
            Self::FileTooLarge { .. } => "file_too_large",
            Self::BundleTooLarge { .. } => "bundle_too_large",
            Self::TypeNotAllowed { .. } => "type_not_allowed",
            Self::Crypto { .. } | Self::Internal { .. } => "internal",
        }
    }

    /// HTTP status used when the error crosses the network boundary
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Unauthorized { .. } => 401,
            Self::Forbidden { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::Gone { .. } => 410,
            Self::QuotaExceeded { .. } => 429,
            Self::BadRequest { .. } => 400,
            Self::FileTooLarge { .. } | Self::BundleTooLarge { .. } => 413,
            Self::TypeNotAllowed { .. } => 415,
            Self::Crypto { .. } | Self::Internal { .. } => 500,
        }
    }

    /// Whether this is an expected outcome rather than a system failure
    pub fn is_expected(&self) -> bool {
        !matches!(self, Self::Crypto { .. } | Self::Internal { .. })
    }
}

/// Standard Result type for Snapgate operations
pub type Result<T> = std::result::Result<T, SnapError>;

impl From<serde_json::Error> for SnapError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("Serialization failed: {err}"))
    }
}
