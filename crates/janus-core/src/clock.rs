// Janus Clock
// Monotonic timestamps and deadline arithmetic

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// A point on a monotonic timeline, stored as the offset from the clock's origin.
///
/// Timestamps from different clocks are not comparable. Wall-clock changes
/// (NTP, DST) never move them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(Duration);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(Duration::ZERO);

    pub fn from_millis(ms: u64) -> Self {
        Timestamp(Duration::from_millis(ms))
    }

    pub fn as_millis(self) -> u64 {
        self.0.as_millis() as u64
    }

    pub fn add(self, delta: Duration) -> Self {
        Timestamp(self.0.saturating_add(delta))
    }

    /// `self - earlier`, clamped at zero when `earlier` is actually later
    pub fn saturating_since(self, earlier: Timestamp) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}ms", self.0.as_secs_f64() * 1000.0)
    }
}

/// Source of monotonic time for the engine
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Real clock backed by `Instant` (CLOCK_MONOTONIC on Linux)
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.origin.elapsed())
    }
}

/// Manually driven clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Timestamp>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, at: Timestamp) {
        self.now.set(at);
    }

    pub fn set_millis(&self, ms: u64) {
        self.set(Timestamp::from_millis(ms));
    }

    pub fn advance(&self, delta: Duration) {
        self.now.set(self.now.get().add(delta));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_arithmetic() {
        let t = Timestamp::from_millis(100);
        let deadline = t.add(Duration::from_millis(200));
        assert_eq!(deadline.as_millis(), 300);
        assert_eq!(deadline.saturating_since(t), Duration::from_millis(200));
        assert_eq!(t.saturating_since(deadline), Duration::ZERO);
        assert!(t < deadline);
    }

    #[test]
    fn test_timestamp_submillisecond_precision() {
        let t = Timestamp::ZERO.add(Duration::from_micros(1500));
        assert_eq!(t.as_millis(), 1);
        assert_eq!(t.saturating_since(Timestamp::ZERO), Duration::from_micros(1500));
        assert!(t > Timestamp::from_millis(1));
    }

    #[test]
    fn test_monotonic_clock_never_goes_back() {
        let clock = MonotonicClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.set_millis(50);
        other.advance(Duration::from_millis(25));
        assert_eq!(clock.now(), Timestamp::from_millis(75));
    }
}
