use ndarray::Array1;
use num_complex::Complex64;

use crate::math::fft::FftHelper;
use crate::prelude::{PipelineStage, SpectrumError, SpectrumGeometry, SpectrumResult};

/// Transforms full frames and averages their power spectra over a window.
pub struct SpectralAccumulator {
    fft: Option<FftHelper>,
    sums: Array1<f64>,
    counter: u32,
    integrations: u32,
}

impl SpectralAccumulator {
    pub fn new() -> Self {
        Self {
            fft: None,
            sums: Array1::zeros(0),
            counter: 0,
            integrations: 0,
        }
    }

    /// Frames integrated into the current window so far.
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Adds one frame. Returns the mean power per bin when the window completes.
    ///
    /// The frame is transformed in place.
    pub fn accumulate(&mut self, frame: &mut [Complex64]) -> SpectrumResult<Option<Array1<f64>>> {
        let fft = self
            .fft
            .as_mut()
            .ok_or_else(|| SpectrumError::Internal("accumulator not initialized".into()))?;

        fft.forward_in_place(frame)?;
        self.sums
            .iter_mut()
            .zip(frame.iter())
            .for_each(|(sum, bin)| *sum += bin.norm_sqr());
        self.counter += 1;

        if self.counter < self.integrations {
            return Ok(None);
        }

        let mean = &self.sums / self.integrations as f64;
        self.sums.fill(0.0);
        self.counter = 0;
        Ok(Some(mean))
    }
}

impl Default for SpectralAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStage for SpectralAccumulator {
    fn initialize(&mut self, geometry: &SpectrumGeometry) -> SpectrumResult<()> {
        if geometry.integrations == 0 {
            return Err(SpectrumError::Config("integrations must be at least 1".into()));
        }
        self.fft = Some(FftHelper::new(geometry.bins));
        self.sums = Array1::zeros(geometry.bins);
        self.counter = 0;
        self.integrations = geometry.integrations;
        Ok(())
    }

    fn cleanup(&mut self) {
        self.fft = None;
        self.sums = Array1::zeros(0);
        self.counter = 0;
    }
}
