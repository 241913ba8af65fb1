//! Snapgate Effects - handlers for the core effect traits
//!
//! Production handlers (system clock, OS randomness, filesystem-backed
//! stores) sit next to the deterministic ones used by tests (simulated
//! clock, seeded randomness, in-memory stores, fault injection). Every
//! domain crate receives these through constructor arguments.

#![forbid(unsafe_code)]

pub mod comments;
pub mod context;
pub mod kv;
pub mod objects;
pub mod random;
pub mod time;

pub use comments::MemoryCommentThreads;
pub use context::Effects;
pub use kv::{FaultInjectingKvStore, FilesystemKvStore, MemoryKvStore};
pub use objects::{FilesystemObjectStore, MemoryObjectStore};
pub use random::{OsRandomSource, SeededRandomSource};
pub use time::{SimulatedTimeSource, SystemTimeSource};
