//! Monotonic time source for frame-age computation
//!
//! Telemetry and controllers share one clock so frame ages are comparable
//! across both sources.

use std::sync::Arc;
use std::time::Instant;

/// Monotonic clock reporting nanoseconds since creation
///
/// Backend frame timestamps are expressed on this timebase; a clone shares
/// the same zero point.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    start: Arc<Instant>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Arc::new(Instant::now()),
        }
    }

    /// Share an existing timebase between components
    pub fn from_instant(start: Instant) -> Self {
        Self {
            start: Arc::new(start),
        }
    }

    /// Nanoseconds elapsed since the clock's zero point
    #[inline]
    pub fn now_ns(&self) -> i64 {
        self.start.elapsed().as_nanos() as i64
    }

    /// Age in milliseconds of an event stamped at `timestamp_ns`, or `None`
    /// for the 0 sentinel (no event observed yet)
    pub fn age_ms(&self, timestamp_ns: i64) -> Option<f64> {
        if timestamp_ns <= 0 {
            return None;
        }
        Some((self.now_ns() - timestamp_ns) as f64 / 1_000_000.0)
    }

    pub fn start_instant(&self) -> Instant {
        *self.start
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_is_monotonic() {
        let clock = MonotonicClock::new();
        let a = clock.now_ns();
        let b = clock.now_ns();
        assert!(b >= a);
    }

    #[test]
    fn test_no_frame_sentinel() {
        let clock = MonotonicClock::new();
        assert!(clock.age_ms(0).is_none());
        assert!(clock.age_ms(-1).is_none());
    }

    #[test]
    fn test_shared_timebase() {
        let clock = MonotonicClock::new();
        let other = MonotonicClock::from_instant(clock.start_instant());
        let stamp = clock.now_ns();
        let age = other.age_ms(stamp).unwrap();
        assert!(age >= 0.0);
    }
}
