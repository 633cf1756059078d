//! Nanosecond clock values

use std::time::Duration;

/// Clock value in nanoseconds since a clock's epoch.
///
/// `ClockTime::NONE` marks an undetermined value, such as a running-time
/// origin that is fixed only when the first buffer arrives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u64);

impl ClockTime {
    /// Zero time
    pub const ZERO: Self = Self(0);

    /// Largest valid value
    pub const MAX: Self = Self(u64::MAX - 1);

    /// Undetermined time
    pub const NONE: Self = Self(u64::MAX);

    #[inline]
    pub const fn from_nanos(ns: u64) -> Self {
        Self(ns)
    }

    #[inline]
    pub const fn from_micros(us: u64) -> Self {
        Self(us.saturating_mul(1_000))
    }

    #[inline]
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms.saturating_mul(1_000_000))
    }

    #[inline]
    pub const fn from_secs(s: u64) -> Self {
        Self(s.saturating_mul(1_000_000_000))
    }

    #[inline]
    pub const fn nanos(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn millis(self) -> u64 {
        self.0 / 1_000_000
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u64::MAX
    }

    #[inline]
    pub const fn is_some(self) -> bool {
        self.0 != u64::MAX
    }

    /// `None` for the NONE sentinel
    #[inline]
    pub const fn to_option(self) -> Option<Self> {
        if self.is_none() {
            None
        } else {
            Some(self)
        }
    }

    /// Saturating addition, NONE if either side is NONE
    #[inline]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        if self.is_none() || rhs.is_none() {
            return Self::NONE;
        }
        let sum = self.0.saturating_add(rhs.0);
        if sum == u64::MAX {
            Self::MAX
        } else {
            Self(sum)
        }
    }

    /// Saturating subtraction, NONE if either side is NONE
    #[inline]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        if self.is_none() || rhs.is_none() {
            return Self::NONE;
        }
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Apply a signed nanosecond offset, clamping at zero and MAX
    pub fn offset_by(self, offset_ns: i64) -> Self {
        if self.is_none() {
            return Self::NONE;
        }
        let shifted = self.0 as i128 + offset_ns as i128;
        Self(shifted.clamp(0, Self::MAX.0 as i128) as u64)
    }

    /// Signed difference `self - rhs` in nanoseconds
    pub fn signed_diff(self, rhs: Self) -> i64 {
        (self.0 as i128 - rhs.0 as i128).clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }
}

impl std::ops::Add for ClockTime {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        self.saturating_add(rhs)
    }
}

impl std::ops::Sub for ClockTime {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        self.saturating_sub(rhs)
    }
}

impl From<Duration> for ClockTime {
    fn from(d: Duration) -> Self {
        Self(d.as_nanos().min(Self::MAX.0 as u128) as u64)
    }
}

impl From<ClockTime> for Duration {
    fn from(t: ClockTime) -> Self {
        if t.is_none() {
            Duration::ZERO
        } else {
            Duration::from_nanos(t.0)
        }
    }
}

impl std::fmt::Display for ClockTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_none() {
            write!(f, "NONE")
        } else {
            let secs = self.0 / 1_000_000_000;
            let nanos = self.0 % 1_000_000_000;
            write!(f, "{}.{:09}s", secs, nanos)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_propagates() {
        assert!((ClockTime::NONE + ClockTime::from_secs(1)).is_none());
        assert!((ClockTime::from_secs(1) - ClockTime::NONE).is_none());
        assert_eq!(ClockTime::NONE.to_option(), None);
    }

    #[test]
    fn test_offset_by() {
        let t = ClockTime::from_millis(500);
        assert_eq!(t.offset_by(10_000_000), ClockTime::from_millis(510));
        assert_eq!(t.offset_by(-600_000_000), ClockTime::ZERO);
        assert!(ClockTime::NONE.offset_by(5).is_none());
    }

    #[test]
    fn test_signed_diff() {
        let a = ClockTime::from_millis(510);
        let b = ClockTime::from_millis(700);
        assert_eq!(a.signed_diff(b), -190_000_000);
        assert_eq!(b.signed_diff(a), 190_000_000);
    }

    #[test]
    fn test_display() {
        assert_eq!(ClockTime::from_millis(1500).to_string(), "1.500000000s");
        assert_eq!(ClockTime::NONE.to_string(), "NONE");
    }
}
