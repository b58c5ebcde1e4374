//! Time source abstraction
//!
//! All timestamps are Unix nanoseconds. Services take an `Arc<dyn Clock>`
//! so tests can pin time with `ManualClock`.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Current time in Unix nanoseconds
    fn now_nanos(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_nanos(&self) -> i64 {
        Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_nanos: i64) -> Self {
        Self {
            now: AtomicI64::new(start_nanos),
        }
    }

    pub fn set(&self, nanos: i64) {
        self.now.store(nanos, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.now.fetch_add(secs * NANOS_PER_SECOND, Ordering::SeqCst);
    }

    pub fn advance_nanos(&self, nanos: i64) {
        self.now.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_nanos(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(1_000);
        clock.advance_nanos(500);
        assert_eq!(clock.now_nanos(), 1_500);

        clock.advance_secs(2);
        assert_eq!(clock.now_nanos(), 1_500 + 2 * NANOS_PER_SECOND);

        clock.set(42);
        assert_eq!(clock.now_nanos(), 42);
    }

    #[test]
    fn test_system_clock_is_after_2024() {
        // 2024-01-01T00:00:00Z
        assert!(SystemClock.now_nanos() > 1_704_067_200 * NANOS_PER_SECOND);
    }
}
