//! Key-value store handlers
//!
//! Implementations of `KvStoreEffects` from snapgate-core.

pub mod faulty;
pub mod filesystem;
pub mod memory;

pub use faulty::FaultInjectingKvStore;
pub use filesystem::FilesystemKvStore;
pub use memory::MemoryKvStore;
