use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use crate::prelude::{SpectrumError, SpectrumResult};

/// Helper that wraps a planned forward `rustfft` transform for reuse.
pub struct FftHelper {
    fft: Arc<dyn Fft<f64>>,
    scratch: Vec<Complex64>,
    size: usize,
}

impl FftHelper {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let scratch = vec![Complex64::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        Self { fft, scratch, size }
    }

    /// Unnormalised forward DFT, in place.
    pub fn forward_in_place(&mut self, buffer: &mut [Complex64]) -> SpectrumResult<()> {
        if buffer.len() != self.size {
            return Err(SpectrumError::Internal(format!(
                "FFT planned for {} points, got {}",
                self.size,
                buffer.len()
            )));
        }
        self.fft.process_with_scratch(buffer, &mut self.scratch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impulse_transforms_to_flat_spectrum() {
        let mut helper = FftHelper::new(4);
        let mut buffer = vec![
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
        ];
        helper.forward_in_place(&mut buffer).unwrap();
        for bin in buffer {
            assert!((bin - Complex64::new(1.0, 0.0)).norm() < 1e-12);
        }
    }

    #[test]
    fn mismatched_length_is_rejected() {
        let mut helper = FftHelper::new(8);
        let mut buffer = vec![Complex64::new(0.0, 0.0); 4];
        assert!(helper.forward_in_place(&mut buffer).is_err());
    }
}
