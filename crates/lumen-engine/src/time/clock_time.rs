use std::fmt;
use std::time::Duration;

/// A point on the stream timeline in nanoseconds.
///
/// Absent timestamps are modelled as `Option<ClockTime>` rather than a
/// sentinel value.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u64);

impl ClockTime {
    pub const ZERO: Self = Self(0);
    pub const NSECOND: u64 = 1;
    pub const MSECOND: u64 = 1_000_000;
    pub const SECOND: u64 = 1_000_000_000;

    #[inline]
    pub const fn from_nseconds(ns: u64) -> Self {
        Self(ns)
    }

    #[inline]
    pub const fn from_mseconds(ms: u64) -> Self {
        Self(ms.saturating_mul(Self::MSECOND))
    }

    #[inline]
    pub const fn from_seconds(s: u64) -> Self {
        Self(s.saturating_mul(Self::SECOND))
    }

    #[inline]
    pub const fn nseconds(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn mseconds(self) -> u64 {
        self.0 / Self::MSECOND
    }

    /// Milliseconds with sub-millisecond precision, used by animation curves.
    #[inline]
    pub fn mseconds_f64(self) -> f64 {
        self.0 as f64 / Self::MSECOND as f64
    }

    /// Timestamp of frame `index` at `num/den` frames per second.
    pub fn for_frame(index: u64, num: u32, den: u32) -> Self {
        if num == 0 {
            return Self::ZERO;
        }
        let ns = (index as u128 * den as u128 * Self::SECOND as u128) / num as u128;
        Self(ns.min(u64::MAX as u128) as u64)
    }
}

impl From<Duration> for ClockTime {
    fn from(d: Duration) -> Self {
        Self(d.as_nanos().min(u64::MAX as u128) as u64)
    }
}

impl From<ClockTime> for Duration {
    fn from(t: ClockTime) -> Self {
        Duration::from_nanos(t.0)
    }
}

impl fmt::Display for ClockTime {
    /// `h:mm:ss.nnnnnnnnn`, the usual media timestamp layout.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0 / Self::SECOND;
        let nanos = self.0 % Self::SECOND;
        write!(f, "{}:{:02}:{:02}.{:09}", secs / 3600, (secs / 60) % 60, secs % 60, nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_layout() {
        let t = ClockTime::from_nseconds(3_723_000_000_005);
        assert_eq!(t.to_string(), "1:02:03.000000005");
    }

    #[test]
    fn frame_timestamps_at_ntsc_rate() {
        assert_eq!(ClockTime::for_frame(0, 30000, 1001), ClockTime::ZERO);
        assert_eq!(ClockTime::for_frame(30000, 30000, 1001), ClockTime::from_seconds(1001));
    }

    #[test]
    fn mseconds_round_down() {
        assert_eq!(ClockTime::from_nseconds(1_999_999).mseconds(), 1);
        assert!((ClockTime::from_nseconds(1_500_000).mseconds_f64() - 1.5).abs() < 1e-9);
    }
}
