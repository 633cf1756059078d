//! Clock sources

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use super::time::ClockTime;

/// A monotonic time source.
///
/// Successive calls to [`Clock::now`] on one clock never decrease. Clocks are
/// shared read-only between the clock provider and every session pipeline,
/// so reads must be safe from any thread without locking.
pub trait Clock: Send + Sync {
    /// Current clock value
    fn now(&self) -> ClockTime;

    /// Human-readable name
    fn name(&self) -> &str {
        "clock"
    }

    /// Whether the clock tracks its reference. Local clocks always do;
    /// network clocks only after their first successful exchange.
    fn is_synced(&self) -> bool {
        true
    }

    /// Read the clock together with the local instant of capture
    fn read(&self) -> ClockReading {
        let value = self.now();
        ClockReading {
            value,
            captured_at: Instant::now(),
        }
    }
}

/// A clock value and the local instant it was captured at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockReading {
    pub value: ClockTime,
    pub captured_at: Instant,
}

/// Monotonic system clock with its epoch at construction.
///
/// This is the server's authoritative clock source.
#[derive(Debug)]
pub struct SystemClock {
    epoch: Instant,
    name: String,
    // Last value handed out, so reads stay monotonic across threads
    last: AtomicU64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::with_name("system-monotonic")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            epoch: Instant::now(),
            name: name.into(),
            last: AtomicU64::new(0),
        }
    }

    /// Instant corresponding to clock value zero
    pub fn epoch(&self) -> Instant {
        self.epoch
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> ClockTime {
        let elapsed = ClockTime::from(self.epoch.elapsed()).nanos();
        let prev = self.last.fetch_max(elapsed, Ordering::AcqRel);
        ClockTime::from_nanos(prev.max(elapsed))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_clock_monotonic() {
        let clock = SystemClock::new();
        let mut prev = clock.now();
        for _ in 0..1000 {
            let now = clock.now();
            assert!(now >= prev);
            prev = now;
        }
    }

    #[test]
    fn test_concurrent_readers() {
        let clock = Arc::new(SystemClock::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let clock = Arc::clone(&clock);
                std::thread::spawn(move || {
                    let mut prev = ClockTime::ZERO;
                    for _ in 0..10_000 {
                        let now = clock.now();
                        assert!(now >= prev);
                        prev = now;
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_read_captures_instant() {
        let clock = SystemClock::with_name("test");
        let before = Instant::now();
        let reading = clock.read();
        assert!(reading.captured_at >= before);
        assert!(reading.value.is_some());
        assert_eq!(clock.name(), "test");
    }
}
