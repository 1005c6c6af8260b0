use std::fmt;
use std::time::{Duration, Instant};

use crate::math::stats::StatsHelper;
use crate::stream::DataBlock;

/// Full scale of a signed 16-bit sample component.
pub const FULL_SCALE: f64 = 32768.0;

/// Throughput and dynamic-range snapshot produced once per reporting tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    pub rate_sps: f64,
    /// Mean |I| relative to full scale on a log2 scale, in percent.
    pub full_scale_percent: f64,
    pub used_bits: f64,
    pub total_bits: u32,
    /// Fraction of samples within 1% of full scale.
    pub clip_fraction: f64,
}

impl ProgressSample {
    pub fn measure(rate_sps: f64, block: &DataBlock) -> Self {
        let magnitudes: Vec<f64> = block.iq().map(|sample| sample.re as f64).collect();
        let mean = StatsHelper::mean_abs(&magnitudes);
        let clipped = magnitudes
            .iter()
            .filter(|m| m.abs() > FULL_SCALE * 0.99)
            .count();
        let clip_fraction = if magnitudes.is_empty() {
            0.0
        } else {
            clipped as f64 / magnitudes.len() as f64
        };

        Self {
            rate_sps,
            full_scale_percent: 100.0 * mean.log2() / FULL_SCALE.log2(),
            used_bits: (mean.log2() + 1.0).ceil(),
            total_bits: (FULL_SCALE.log2() + 1.0).ceil() as u32,
            clip_fraction,
        }
    }
}

impl fmt::Display for ProgressSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.3} Msps, {:.0}% I ({:.0} of {} bits), {:.0}% I clip",
            self.rate_sps / 1e6,
            self.full_scale_percent,
            self.used_bits,
            self.total_bits,
            100.0 * self.clip_fraction
        )
    }
}

/// Wall-clock driven throughput and level reporting on the raw sample stream.
pub struct ProgressReporter {
    interval: Duration,
    last_update: Instant,
    samples: u64,
}

impl ProgressReporter {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_update: now,
            samples: 0,
        }
    }

    /// Starts a fresh reporting window, e.g. once acquisition is aligned.
    pub fn restart(&mut self, now: Instant) {
        self.last_update = now;
        self.samples = 0;
    }

    /// Counts a data block; yields a report when the interval has elapsed.
    pub fn observe(&mut self, now: Instant, block: &DataBlock) -> Option<ProgressSample> {
        self.samples += block.len() as u64;
        let elapsed = now.saturating_duration_since(self.last_update);
        if elapsed < self.interval {
            return None;
        }

        let seconds = elapsed.as_secs_f64();
        let rate = if seconds > 0.0 {
            self.samples as f64 / seconds
        } else {
            0.0
        };
        self.samples = 0;
        self.last_update = now;
        Some(ProgressSample::measure(rate, block))
    }
}
