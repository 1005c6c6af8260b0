use ndarray::Array1;

use crate::math::stats::StatsHelper;
use crate::prelude::{PipelineConfig, PipelineStage, SpectrumError, SpectrumGeometry, SpectrumResult};

/// Turns window-mean power into calibrated output values.
///
/// Order of operations: DC suppression, accelerated exponential smoothing,
/// bandpass polynomial correction, optional dB conversion.
pub struct CalibrationStage {
    suppress_dc: bool,
    alpha: Option<f64>,
    poly: Vec<f64>,
    db: bool,
    /// Per-bin polynomial correction, precomputed for the active geometry.
    correction: Array1<f64>,
    filtered: Array1<f64>,
    emissions: u64,
}

impl CalibrationStage {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            suppress_dc: config.suppress_dc,
            alpha: config.smoothing_alpha(),
            poly: config.poly.clone(),
            db: config.db,
            correction: Array1::zeros(0),
            filtered: Array1::zeros(0),
            emissions: 0,
        }
    }

    /// Emissions produced since the last (re)initialisation.
    pub fn emissions(&self) -> u64 {
        self.emissions
    }

    pub fn calibrate(&mut self, mut mean: Array1<f64>) -> SpectrumResult<Vec<f64>> {
        let bins = self.filtered.len();
        if bins == 0 || mean.len() != bins {
            return Err(SpectrumError::Internal(format!(
                "calibration sized for {} bins, got {}",
                bins,
                mean.len()
            )));
        }

        if self.suppress_dc {
            let center = bins / 2;
            mean[center] = (mean[center - 1] + mean[center + 1]) / 2.0;
        }

        self.emissions += 1;
        match self.alpha {
            Some(alpha) => {
                let effective = (1.0 / self.emissions as f64).max(alpha);
                self.filtered
                    .zip_mut_with(&mean, |filtered, &m| *filtered += effective * (m - *filtered));
            }
            None => self.filtered.assign(&mean),
        }

        let values = self
            .filtered
            .iter()
            .zip(self.correction.iter())
            .map(|(&value, &correction)| {
                if self.db {
                    StatsHelper::power_to_db(value) - StatsHelper::power_to_db(correction)
                } else {
                    value / correction
                }
            })
            .collect();
        Ok(values)
    }
}

impl PipelineStage for CalibrationStage {
    fn initialize(&mut self, geometry: &SpectrumGeometry) -> SpectrumResult<()> {
        if self.suppress_dc && geometry.bins < 3 {
            return Err(SpectrumError::Config(format!(
                "DC suppression needs at least 3 bins, got {}",
                geometry.bins
            )));
        }
        self.correction = if self.poly.is_empty() {
            Array1::ones(geometry.bins)
        } else {
            Array1::from_iter(
                (0..geometry.bins).map(|bin| StatsHelper::horner(&self.poly, geometry.offset(bin))),
            )
        };
        self.filtered = Array1::zeros(geometry.bins);
        self.emissions = 0;
        Ok(())
    }

    fn cleanup(&mut self) {
        self.correction = Array1::zeros(0);
        self.filtered = Array1::zeros(0);
        self.emissions = 0;
    }
}
