//! Snapgate Lifecycle - producer-side snapshot operations
//!
//! Drives a snapshot from creation through upload authorization and
//! finalize to extension, revocation and expiry, and issues the producer
//! session tokens that authenticate those calls.

#![forbid(unsafe_code)]

pub mod manager;
pub mod sessions;
pub mod types;

pub use manager::SnapshotLifecycle;
pub use sessions::{ProducerSessions, MAX_UID_LEN};
pub use types::{
    CreateSnapshot, CreatedSnapshot, ExtendSnapshot, FinalizeSnapshot, RotatedPassword,
    SnapshotDetail, SnapshotSummary, UploadAuthorization, UploadRequest, DEFAULT_EXPIRY_DAYS,
    MAX_PASSWORD_LEN, MIN_PASSWORD_LEN,
};
