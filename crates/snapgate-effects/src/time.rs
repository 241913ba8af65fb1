//! Time source handlers
//!
//! Production handler reads the system clock; the simulated handler only
//! moves when a test tells it to.

use parking_lot::Mutex;
use snapgate_core::effects::TimeSource;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// System clock time source for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl SystemTimeSource {
    /// Create a new system time source
    pub fn new() -> Self {
        Self
    }
}

impl TimeSource for SystemTimeSource {
    #[allow(clippy::disallowed_methods)]
    fn now_ms(&self) -> u64 {
        // Only effect handlers read the wall clock directly
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_millis() as u64
    }
}

/// Simulated time source for deterministic tests
///
/// Clones share the same clock.
#[derive(Debug, Clone)]
pub struct SimulatedTimeSource {
    current_ms: Arc<Mutex<u64>>,
}

impl SimulatedTimeSource {
    /// Start the clock at `initial_ms`
    pub fn new(initial_ms: u64) -> Self {
        Self {
            current_ms: Arc::new(Mutex::new(initial_ms)),
        }
    }

    /// Start at 2024-01-15T12:34:56Z
    pub fn from_recent() -> Self {
        Self::new(1_705_322_096_000)
    }

    /// Move the clock forward
    pub fn advance_ms(&self, ms: u64) {
        let mut now = self.current_ms.lock();
        *now = now.saturating_add(ms);
    }

    /// Move the clock forward by whole seconds
    pub fn advance_secs(&self, secs: u64) {
        self.advance_ms(secs.saturating_mul(1000));
    }

    /// Jump to an absolute time
    pub fn set_ms(&self, ms: u64) {
        *self.current_ms.lock() = ms;
    }
}

impl TimeSource for SimulatedTimeSource {
    fn now_ms(&self) -> u64 {
        *self.current_ms.lock()
    }

    fn is_simulated(&self) -> bool {
        true
    }
}
