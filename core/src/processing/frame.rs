use num_complex::Complex64;

use crate::prelude::{PipelineStage, SpectrumGeometry, SpectrumResult};
use crate::stream::unpack_iq;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Filling,
    Ready,
}

/// Collects IQ words into FFT-sized frames.
///
/// Every sample is multiplied by `(-1)^n`, `n` being its position within the
/// frame, which moves zero frequency to the center bin after the transform.
/// The fill position survives block boundaries.
pub struct FrameAssembler {
    frame: Vec<Complex64>,
    fill: usize,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self {
            frame: Vec::new(),
            fill: 0,
        }
    }

    /// Writes one raw word at the fill position.
    pub fn push(&mut self, word: u32) -> FrameStatus {
        if self.frame.is_empty() {
            return FrameStatus::Filling;
        }

        let sample = unpack_iq(word);
        let sign = if self.fill % 2 == 0 { 1.0 } else { -1.0 };
        self.frame[self.fill] = Complex64::new(sign * sample.re as f64, sign * sample.im as f64);
        self.fill += 1;

        if self.fill == self.frame.len() {
            self.fill = 0;
            FrameStatus::Ready
        } else {
            FrameStatus::Filling
        }
    }

    /// The completed frame. Only meaningful right after `push` returned `Ready`.
    pub fn frame_mut(&mut self) -> &mut [Complex64] {
        &mut self.frame
    }

    pub fn fill(&self) -> usize {
        self.fill
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStage for FrameAssembler {
    fn initialize(&mut self, geometry: &SpectrumGeometry) -> SpectrumResult<()> {
        self.frame = vec![Complex64::new(0.0, 0.0); geometry.bins];
        self.fill = 0;
        Ok(())
    }

    fn cleanup(&mut self) {
        self.frame = Vec::new();
        self.fill = 0;
    }
}
