//! Object store handlers
//!
//! Implementations of `ObjectStoreEffects` from snapgate-core.

pub mod filesystem;
pub mod memory;

pub use filesystem::FilesystemObjectStore;
pub use memory::MemoryObjectStore;
