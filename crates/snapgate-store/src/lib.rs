//! Snapgate Store - snapshot metadata store adapter
//!
//! Owns the persisted layout of snapshot records, view counters, owner
//! snapshot lists and viewer dedup markers:
//!
//! | Key | Value |
//! |---|---|
//! | `snapshot:{id}` | `SnapshotMetadata` as camelCase JSON |
//! | `views:{id}` | monthly `ViewBucket` as JSON |
//! | `owner:{uid}:snapshots` | JSON array of snapshot ids |
//! | `viewer-dedup:{id}:{fingerprint}` | `"1"`, one-day TTL |
//!
//! The store has no multi-key transactions. The record and the owner list
//! are written separately, so a crash between the two can leave an active
//! record that is missing from its owner's list.

#![forbid(unsafe_code)]

pub mod adapter;
pub mod keys;

pub use adapter::{MetadataStore, DEDUP_TTL_SECS};
