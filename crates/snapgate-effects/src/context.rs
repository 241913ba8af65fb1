//! Bundle of injectable clock and randomness

use crate::{OsRandomSource, SeededRandomSource, SimulatedTimeSource, SystemTimeSource};
use snapgate_core::effects::{RandomSource, TimeSource};
use std::sync::Arc;

/// Clock and randomness passed to every domain component
#[derive(Clone)]
pub struct Effects {
    /// Wall clock
    pub time: Arc<dyn TimeSource>,
    /// Entropy for ids, salts and passwords
    pub random: Arc<dyn RandomSource>,
}

impl Effects {
    /// System clock and OS randomness
    pub fn production() -> Self {
        Self {
            time: Arc::new(SystemTimeSource::new()),
            random: Arc::new(OsRandomSource::new()),
        }
    }

    /// Simulated clock and seeded randomness
    pub fn deterministic(seed: u64, clock: SimulatedTimeSource) -> Self {
        Self {
            time: Arc::new(clock),
            random: Arc::new(SeededRandomSource::new(seed)),
        }
    }

    /// Current time in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.time.now_ms()
    }

    /// Current time in whole seconds
    pub fn now_secs(&self) -> u64 {
        self.time.now_secs()
    }
}

impl std::fmt::Debug for Effects {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effects")
            .field("simulated", &self.time.is_simulated())
            .finish_non_exhaustive()
    }
}

impl Default for Effects {
    fn default() -> Self {
        Self::production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_effects_follow_the_shared_clock() {
        let clock = SimulatedTimeSource::new(5_000);
        let effects = Effects::deterministic(1, clock.clone());
        clock.advance_secs(1);
        assert_eq!(effects.now_ms(), 6_000);
        assert_eq!(effects.now_secs(), 6);
        assert!(effects.time.is_simulated());
        assert_eq!(
            effects.random.random_bytes(8),
            Effects::deterministic(1, clock).random.random_bytes(8)
        );
    }
}
