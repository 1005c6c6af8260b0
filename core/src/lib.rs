//! Streaming spectral integration core.
//!
//! Decoded sample blocks are framed, transformed and averaged into power
//! spectra, then calibrated and assembled into output records that one of
//! the sinks renders.

pub mod math;
pub mod pipeline;
pub mod prelude;
pub mod processing;
pub mod sink;
pub mod stream;
pub mod telemetry;

pub use pipeline::{Acquisition, BlockOutcome, SpectrumPipeline};
pub use prelude::{PipelineConfig, SpectrumError, SpectrumResult};
