//! Snapgate Core - foundation types and effect interfaces
//!
//! Defines the persisted snapshot record, the error taxonomy surfaced to
//! callers, and the effect traits through which every other crate reaches
//! the clock, randomness, the metadata store and the object store.
//!
//! # What lives here
//!
//! - `SnapshotMetadata` and its parts (`Caps`, `FileEntry`, `ViewBucket`)
//! - `SnapError` with stable codes and HTTP statuses
//! - Effect traits (`TimeSource`, `RandomSource`, `KvStoreEffects`,
//!   `ObjectStoreEffects`, `CommentThreadEffects`, `PlanEffects`)
//! - Asset path / content-type policy shared by upload and serve
//! - Retry policy and service configuration
//!
//! Handlers implementing the effect traits live in `snapgate-effects`.

#![forbid(unsafe_code)]

/// Service configuration
pub mod config;

/// Effect trait definitions
pub mod effects;

/// Unified error handling
pub mod errors;

/// Asset path and content-type policy
pub mod policy;

/// Retry with backoff
pub mod reliability;

/// Snapshot domain types
pub mod types;

pub use config::{ObjectStoreConfig, RetryConfig, Secret, SnapgateConfig};
pub use errors::{Result, SnapError};
pub use reliability::{BackoffStrategy, RetryPolicy};
pub use types::{
    period_key, Caps, FileEntry, PlanTier, SnapshotId, SnapshotMetadata, SnapshotStatus,
    ViewBucket, DAY_MS, DAY_SECS, MAX_ACTIVE_SNAPSHOTS,
};
