use core::fmt;
use core::ops::{Add, Sub};

/// A `TIME` value: a signed duration in microseconds.
///
/// Microseconds is the natural resolution here because the task model
/// already measures cyclic periods in microseconds (`interval_us`) and
/// timer function blocks (`TON`/`TOF`/`TP`) compare their accumulated
/// elapsed time against a `PT` preset of the same unit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Time(pub i64);

impl Time {
    /// Zero duration.
    pub const ZERO: Time = Time(0);

    /// Construct from a microsecond count.
    pub const fn from_micros(us: i64) -> Self {
        Self(us)
    }

    /// Construct from a millisecond count.
    pub const fn from_millis(ms: i64) -> Self {
        Self(ms * 1_000)
    }

    /// Microsecond count.
    pub const fn as_micros(self) -> i64 {
        self.0
    }

    /// Millisecond count, truncating any sub-millisecond remainder.
    pub const fn as_millis(self) -> i64 {
        self.0 / 1_000
    }
}

impl Add for Time {
    type Output = Time;
    fn add(self, rhs: Time) -> Time {
        Time(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Time {
    type Output = Time;
    fn sub(self, rhs: Time) -> Time {
        Time(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us", self.0)
    }
}
