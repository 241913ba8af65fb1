//! Wall-clock time source
//!
//! - Production: system clock (`snapgate-effects::SystemTimeSource`)
//! - Testing: simulated clock that only moves when told to

use std::sync::Arc;

/// Abstract time source
pub trait TimeSource: Send + Sync {
    /// Current Unix time in milliseconds
    fn now_ms(&self) -> u64;

    /// Current Unix time in whole seconds
    fn now_secs(&self) -> u64 {
        self.now_ms() / 1000
    }

    /// Whether this clock is simulated
    fn is_simulated(&self) -> bool {
        false
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }

    fn is_simulated(&self) -> bool {
        (**self).is_simulated()
    }
}
