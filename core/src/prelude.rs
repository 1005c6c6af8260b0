use serde::{Deserialize, Serialize};

use crate::stream::{StreamContext, Timestamp};

/// When the pipeline starts accepting samples relative to the stream clock.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AlignmentMode {
    /// Accept frames as soon as a context has been seen.
    #[default]
    None,
    /// Wait for the fractional-second timestamp to wrap.
    IntegerSecond,
    /// Wait for a second boundary that is also a multiple of the integration time.
    IntegerInterval,
}

/// Optional scalar columns emitted ahead of the spectrum in every record.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RecordFields {
    pub center_frequency: bool,
    pub temperature: bool,
    pub pointing: bool,
}

/// User-facing configuration of the integration pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub num_bins: usize,
    pub bin_size_hz: Option<f64>,
    pub power_of_two: bool,
    pub integrations: Option<u32>,
    pub integration_time_s: f64,
    pub tau_s: Option<f64>,
    /// Bandpass polynomial, highest degree first.
    pub poly: Vec<f64>,
    pub db: bool,
    pub suppress_dc: bool,
    pub alignment: AlignmentMode,
    pub continue_on_lost_data: bool,
    pub hold_min_max: bool,
    pub fields: RecordFields,
    pub channel: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            num_bins: 1000,
            bin_size_hz: None,
            power_of_two: false,
            integrations: None,
            integration_time_s: 1.0,
            tau_s: None,
            poly: Vec::new(),
            db: false,
            suppress_dc: false,
            alignment: AlignmentMode::None,
            continue_on_lost_data: false,
            hold_min_max: false,
            fields: RecordFields::default(),
            channel: 0,
        }
    }
}

impl PipelineConfig {
    /// Checks everything that can be rejected before any context is seen.
    pub fn validate(&self) -> SpectrumResult<()> {
        if !(self.integration_time_s.is_finite() && self.integration_time_s > 0.0) {
            return Err(SpectrumError::Config(format!(
                "integration time must be positive, got {}",
                self.integration_time_s
            )));
        }
        if self.alignment == AlignmentMode::IntegerInterval && self.alignment_interval_s() < 1 {
            return Err(SpectrumError::Config(
                "integer-interval alignment requires an integration time of at least 1 second"
                    .into(),
            ));
        }
        if self.integrations == Some(0) {
            return Err(SpectrumError::Config(
                "integrations must be at least 1".into(),
            ));
        }
        if let Some(tau) = self.tau_s {
            if !(tau.is_finite() && tau > 0.0) {
                return Err(SpectrumError::Config(format!(
                    "smoothing time constant must be positive, got {}",
                    tau
                )));
            }
        }
        match self.bin_size_hz {
            Some(width) if !(width.is_finite() && width > 0.0) => {
                return Err(SpectrumError::Config(format!(
                    "bin size must be positive, got {}",
                    width
                )));
            }
            None if self.num_bins == 0 => {
                return Err(SpectrumError::Config("bin count must be positive".into()));
            }
            _ => {}
        }
        if self.channel >= u32::BITS {
            return Err(SpectrumError::Config(format!(
                "channel {} outside the 32-bit stream mask",
                self.channel
            )));
        }
        Ok(())
    }

    /// Integration time rounded to whole seconds, used by interval alignment.
    pub fn alignment_interval_s(&self) -> u64 {
        self.integration_time_s.round().max(0.0) as u64
    }

    /// Steady-state smoothing coefficient `1 - exp(-dt/tau)`.
    pub fn smoothing_alpha(&self) -> Option<f64> {
        self.tau_s
            .map(|tau| 1.0 - (-self.integration_time_s / tau).exp())
    }

    /// Derives the bin layout and window length for one acquisition.
    pub fn resolve(&self, context: &StreamContext) -> SpectrumResult<SpectrumGeometry> {
        if !(context.sample_rate.is_finite() && context.sample_rate > 0.0) {
            return Err(SpectrumError::Config(format!(
                "stream context carries an unusable sample rate {}",
                context.sample_rate
            )));
        }

        let bins = match self.bin_size_hz {
            Some(width) => {
                let raw = (context.sample_rate / width) as usize;
                if self.power_of_two && raw > 0 {
                    let exponent = ((raw as f64).log2() + 0.8) as u32;
                    1usize << exponent
                } else {
                    raw
                }
            }
            None => self.num_bins,
        };

        if bins == 0 {
            return Err(SpectrumError::Config(
                "bin size exceeds the sample rate, no bins left".into(),
            ));
        }
        if self.suppress_dc && bins < 3 {
            return Err(SpectrumError::Config(format!(
                "DC suppression needs at least 3 bins, got {}",
                bins
            )));
        }

        let integrations = match self.integrations {
            Some(count) => count,
            None => {
                let frame_time = bins as f64 / context.sample_rate;
                ((self.integration_time_s / frame_time).round() as u32).max(1)
            }
        };

        Ok(SpectrumGeometry {
            bins,
            integrations,
            sample_rate: context.sample_rate,
            center_frequency: context.center_frequency,
        })
    }
}

/// Resolved per-acquisition layout shared by every stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectrumGeometry {
    pub bins: usize,
    pub integrations: u32,
    pub sample_rate: f64,
    pub center_frequency: f64,
}

impl SpectrumGeometry {
    pub fn bin_width(&self) -> f64 {
        self.sample_rate / self.bins as f64
    }

    /// Frequency offset of `bin` from the center frequency.
    pub fn offset(&self, bin: usize) -> f64 {
        bin as f64 * self.bin_width() - self.sample_rate / 2.0
    }

    pub fn frequency(&self, bin: usize) -> f64 {
        self.center_frequency + self.offset(bin)
    }

    pub fn frequencies(&self) -> Vec<f64> {
        (0..self.bins).map(|bin| self.frequency(bin)).collect()
    }

    pub fn center_bin(&self) -> usize {
        self.bins / 2
    }

    /// Effective wall time covered by one integration window.
    pub fn integration_time(&self) -> f64 {
        self.integrations as f64 * self.bins as f64 / self.sample_rate
    }
}

/// Common error type for the integration core.
#[derive(thiserror::Error, Debug)]
pub enum SpectrumError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("decoder reported lost data at {timestamp}")]
    DataLoss { timestamp: Timestamp },
    #[error("internal failure: {0}")]
    Internal(String),
    #[error("sink i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

pub type SpectrumResult<T> = Result<T, SpectrumError>;

/// Stages that own bin-count-sized state and are rebuilt on every context change.
pub trait PipelineStage {
    fn initialize(&mut self, geometry: &SpectrumGeometry) -> SpectrumResult<()>;
    fn cleanup(&mut self);
}
