//! Effect trait definitions
//!
//! Pure trait definitions for every side effect the core performs. This
//! module defines **what** effects exist; `snapgate-effects` provides the
//! handlers that define **how**.
//!
//! # Effect Classification
//!
//! ## Infrastructure Effects (handlers in `snapgate-effects`)
//! - **Time**: wall clock in milliseconds
//! - **Random**: identifier, salt and password entropy
//! - **KvStore**: the external metadata key-value store
//! - **ObjectStore**: the external blob store holding snapshot files
//!
//! ## Collaborator Effects (external systems, interface only)
//! - **CommentThread**: per-snapshot single-writer comment log
//! - **Plan**: maps a producer to a plan tier
//!
//! All domain crates take these as constructor arguments so tests can
//! substitute deterministic handlers.

pub mod comments;
pub mod kv;
pub mod objects;
pub mod plan;
pub mod random;
pub mod time;

pub use comments::{Comment, CommentThreadEffects, NewComment};
pub use kv::{KvStoreEffects, PutOptions, StoreError};
pub use objects::{ObjectStoreEffects, ObjectStoreError, StoredObject};
pub use plan::{FixedPlan, PlanEffects};
pub use random::RandomSource;
pub use time::TimeSource;
