use serde::{Deserialize, Serialize};
use std::fmt;

pub const PICOS_PER_SECOND: u64 = 1_000_000_000_000;

/// Fixed-point stream time: whole seconds plus a picosecond fraction.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    pub seconds: u64,
    pub picoseconds: u64,
}

impl Timestamp {
    /// Builds a timestamp, carrying any whole seconds held in the fraction.
    pub fn new(seconds: u64, picoseconds: u64) -> Self {
        Self {
            seconds: seconds + picoseconds / PICOS_PER_SECOND,
            picoseconds: picoseconds % PICOS_PER_SECOND,
        }
    }

    /// Time of the sample `samples` positions after this one.
    pub fn advanced_by_samples(&self, samples: u64, sample_rate: f64) -> Self {
        let offset = (samples as f64 * PICOS_PER_SECOND as f64 / sample_rate) as u64;
        Self::new(self.seconds, self.picoseconds + offset)
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.seconds as f64 + self.picoseconds as f64 / PICOS_PER_SECOND as f64
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.picoseconds / 1_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advancing_carries_into_seconds() {
        let ts = Timestamp::new(10, 999_999_000_000);
        let next = ts.advanced_by_samples(2, 1e6);
        assert_eq!(next, Timestamp::new(11, 1_000_000));
    }

    #[test]
    fn display_uses_nanosecond_precision() {
        let ts = Timestamp::new(1_700_000_000, 250_000_000_000);
        assert_eq!(ts.to_string(), "1700000000.250000000");
        assert!((ts.as_secs_f64() - 1_700_000_000.25).abs() < 1e-6);
    }
}
