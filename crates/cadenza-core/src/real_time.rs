//! Fixed-precision time values (seconds + nanoseconds).
//!
//! `RealTime` is used both as a point on the playback timeline and as a
//! duration. The nanosecond field is always kept in `[0, 1e9)`; negative
//! values floor the seconds field, so `-0.25s` is stored as `{-1, 750_000_000}`.
//! With that normalization the derived ordering on `(sec, nsec)` is the
//! numeric ordering.

use core::fmt;
use core::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const NANOS_PER_SEC: i64 = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct RealTime {
    sec: i32,
    nsec: i32,
}

impl RealTime {
    pub const ZERO: RealTime = RealTime { sec: 0, nsec: 0 };

    /// Smallest representable step.
    pub const NANOSECOND: RealTime = RealTime { sec: 0, nsec: 1 };

    /// Build from components, carrying excess or negative nanoseconds into
    /// the seconds field.
    #[inline]
    pub fn new(sec: i32, nsec: i32) -> Self {
        Self::from_nanos(sec as i64 * NANOS_PER_SEC + nsec as i64)
    }

    /// Saturates at the `i32` seconds range.
    pub fn from_nanos(nanos: i64) -> Self {
        let sec = nanos
            .div_euclid(NANOS_PER_SEC)
            .clamp(i32::MIN as i64, i32::MAX as i64);
        Self {
            sec: sec as i32,
            nsec: nanos.rem_euclid(NANOS_PER_SEC) as i32,
        }
    }

    /// Like [`RealTime::from_nanos`] but rejects values that do not fit.
    pub fn try_from_nanos(nanos: i64) -> Result<Self> {
        let sec = nanos.div_euclid(NANOS_PER_SEC);
        if sec < i32::MIN as i64 || sec > i32::MAX as i64 {
            return Err(Error::TimeOutOfRange(nanos));
        }
        Ok(Self::from_nanos(nanos))
    }

    #[inline]
    pub fn from_micros(micros: i64) -> Self {
        Self::from_nanos(micros.saturating_mul(1_000))
    }

    #[inline]
    pub fn from_millis(millis: i64) -> Self {
        Self::from_nanos(millis.saturating_mul(1_000_000))
    }

    /// Rounds to the nearest nanosecond. NaN maps to zero.
    pub fn from_seconds(seconds: f64) -> Self {
        Self::from_nanos((seconds * NANOS_PER_SEC as f64).round() as i64)
    }

    /// Time of `frame` at `sample_rate` frames per second.
    pub fn from_frame(frame: i64, sample_rate: u32) -> Self {
        if sample_rate == 0 {
            return Self::ZERO;
        }
        let nanos = frame as i128 * NANOS_PER_SEC as i128 / sample_rate as i128;
        Self::from_nanos(nanos.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }

    #[inline]
    pub const fn sec(&self) -> i32 {
        self.sec
    }

    #[inline]
    pub const fn nsec(&self) -> i32 {
        self.nsec
    }

    #[inline]
    pub const fn to_nanos(&self) -> i64 {
        self.sec as i64 * NANOS_PER_SEC + self.nsec as i64
    }

    #[inline]
    pub fn to_seconds(&self) -> f64 {
        self.sec as f64 + self.nsec as f64 / NANOS_PER_SEC as f64
    }

    #[inline]
    pub fn to_millis(&self) -> i64 {
        self.to_nanos().div_euclid(1_000_000)
    }

    /// Frame index containing this time at `sample_rate` (floors).
    pub fn to_frame(&self, sample_rate: u32) -> i64 {
        let frames = (self.to_nanos() as i128 * sample_rate as i128).div_euclid(NANOS_PER_SEC as i128);
        frames.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.sec == 0 && self.nsec == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.sec < 0
    }

    /// `None` for negative values.
    pub fn to_duration(&self) -> Option<Duration> {
        if self.is_negative() {
            return None;
        }
        Some(Duration::new(self.sec as u64, self.nsec as u32))
    }

    /// Clamp negative values to zero.
    #[inline]
    pub fn max_zero(self) -> Self {
        if self.is_negative() {
            Self::ZERO
        } else {
            self
        }
    }
}

impl From<Duration> for RealTime {
    fn from(duration: Duration) -> Self {
        let nanos = duration.as_nanos().min(i64::MAX as u128) as i64;
        Self::from_nanos(nanos)
    }
}

impl From<(i32, i32)> for RealTime {
    fn from((sec, nsec): (i32, i32)) -> Self {
        Self::new(sec, nsec)
    }
}

impl From<RealTime> for (i32, i32) {
    fn from(time: RealTime) -> Self {
        (time.sec, time.nsec)
    }
}

impl Add for RealTime {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self::from_nanos(self.to_nanos().saturating_add(other.to_nanos()))
    }
}

impl AddAssign for RealTime {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for RealTime {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self::from_nanos(self.to_nanos().saturating_sub(other.to_nanos()))
    }
}

impl SubAssign for RealTime {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Neg for RealTime {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::from_nanos(self.to_nanos().saturating_neg())
    }
}

impl Mul<i32> for RealTime {
    type Output = Self;

    #[inline]
    fn mul(self, factor: i32) -> Self {
        Self::from_nanos(self.to_nanos().saturating_mul(factor as i64))
    }
}

impl fmt::Display for RealTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nanos = self.to_nanos();
        let sign = if nanos < 0 { "-" } else { "" };
        let abs = nanos.unsigned_abs();
        write!(
            f,
            "{}{}.{:09}",
            sign,
            abs / NANOS_PER_SEC as u64,
            abs % NANOS_PER_SEC as u64
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalization() {
        let t = RealTime::new(1, 1_500_000_000);
        assert_eq!(t.sec(), 2);
        assert_eq!(t.nsec(), 500_000_000);

        let t = RealTime::new(0, -250_000_000);
        assert_eq!(t.sec(), -1);
        assert_eq!(t.nsec(), 750_000_000);
        assert!(t.is_negative());
    }

    #[test]
    fn test_ordering_across_zero() {
        let a = RealTime::from_millis(-250);
        let b = RealTime::ZERO;
        let c = RealTime::from_millis(250);
        assert!(a < b && b < c);
        assert_eq!(-c, a);
    }

    #[test]
    fn test_arithmetic() {
        let a = RealTime::from_millis(1500);
        let b = RealTime::from_millis(750);
        assert_eq!(a + b, RealTime::from_millis(2250));
        assert_eq!(b - a, RealTime::from_millis(-750));
        assert_eq!(b * 4, RealTime::from_seconds(3.0));
    }

    #[test]
    fn test_display() {
        assert_eq!(RealTime::from_millis(1500).to_string(), "1.500000000");
        assert_eq!(RealTime::from_millis(-250).to_string(), "-0.250000000");
        assert_eq!(RealTime::ZERO.to_string(), "0.000000000");
    }

    #[test]
    fn test_frame_conversion() {
        assert_eq!(RealTime::from_seconds(1.0).to_frame(48000), 48000);
        assert_eq!(RealTime::from_frame(24000, 48000), RealTime::from_millis(500));
        assert_eq!(RealTime::from_frame(100, 0), RealTime::ZERO);
    }

    #[test]
    fn test_duration_conversion() {
        let d = Duration::from_millis(1250);
        let t = RealTime::from(d);
        assert_eq!(t.to_duration(), Some(d));
        assert_eq!(RealTime::from_millis(-1).to_duration(), None);
    }

    #[test]
    fn test_try_from_nanos_range() {
        assert!(RealTime::try_from_nanos(5).is_ok());
        assert_eq!(
            RealTime::try_from_nanos(i64::MAX),
            Err(Error::TimeOutOfRange(i64::MAX))
        );
    }

    proptest! {
        #[test]
        fn prop_nsec_always_in_range(nanos in -1_000_000_000_000_000i64..1_000_000_000_000_000i64) {
            let t = RealTime::from_nanos(nanos);
            prop_assert!(t.nsec() >= 0 && t.nsec() < 1_000_000_000);
            prop_assert_eq!(t.to_nanos(), nanos);
        }

        #[test]
        fn prop_ordering_matches_nanos(a in -1_000_000_000_000i64..1_000_000_000_000i64,
                                       b in -1_000_000_000_000i64..1_000_000_000_000i64) {
            let (ta, tb) = (RealTime::from_nanos(a), RealTime::from_nanos(b));
            prop_assert_eq!(ta.cmp(&tb), a.cmp(&b));
            prop_assert_eq!((ta + tb) - tb, ta);
        }
    }
}
