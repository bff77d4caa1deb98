//! Time sources for rate limit decisions.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Time source abstraction so decisions can be made deterministic in tests.
///
/// `now` returns the time elapsed since the clock's epoch. The epoch itself is
/// arbitrary, but every component sharing a set of stored states must use the
/// same one: wall-clock semantics are required when multiple processes share
/// a store.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current time as a duration since the clock's epoch.
    fn now(&self) -> Duration;
}

/// Wall clock measured from the UNIX epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
    }
}

/// Manually driven clock.
///
/// Time only moves when told to, which makes every decision reproducible.
/// Used throughout the test suite and useful for simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    /// Create a clock starting at the given offset from its epoch.
    pub fn new(start: Duration) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Create a clock positioned at `secs` seconds, fractions allowed.
    pub fn at_secs_f64(secs: f64) -> Self {
        Self::new(Duration::from_secs_f64(secs))
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    /// Jump the clock to an absolute offset. Jumping backwards is allowed;
    /// the algorithms clamp negative elapsed time to zero.
    pub fn set(&self, to: Duration) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::default();
        assert_eq!(clock.now(), Duration::ZERO);

        clock.advance(Duration::from_millis(1500));
        assert_eq!(clock.now(), Duration::from_millis(1500));

        clock.set(Duration::from_secs(3));
        assert_eq!(clock.now(), Duration::from_secs(3));
    }

    #[test]
    fn test_manual_clock_fractional_start() {
        let clock = ManualClock::at_secs_f64(0.5);
        assert_eq!(clock.now(), Duration::from_millis(500));
    }

    #[test]
    fn test_system_clock_is_nonzero() {
        let clock = SystemClock;
        assert!(clock.now() > Duration::ZERO);
    }
}
