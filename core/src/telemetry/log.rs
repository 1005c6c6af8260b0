use log::{info, warn};

use crate::prelude::SpectrumGeometry;
use crate::stream::StreamContext;

/// Thin wrapper over the `log` facade for acquisition-level messages.
pub struct LogManager {
    pointing_warned: bool,
}

impl LogManager {
    pub fn new() -> Self {
        Self {
            pointing_warned: false,
        }
    }

    pub fn record(&self, message: &str) {
        info!("{}", message);
    }

    pub fn acquisition(&self, context: &StreamContext, geometry: &SpectrumGeometry) {
        info!(
            "context: stream {:#x}, {:.1} Hz center, {:.1} sps, {:.1} Hz bandwidth, gain {:.1}, {:.2} degC, reference {}, time {}",
            context.stream_id,
            context.center_frequency,
            context.sample_rate,
            context.bandwidth,
            context.gain,
            context.temperature,
            if context.reference_locked { "external" } else { "internal" },
            if context.time_calibrated { "pps" } else { "internal" },
        );
        info!(
            "spectrum: {} bins of {:.2} Hz, {} integrations, {:.2} s per record",
            geometry.bins,
            geometry.bin_width(),
            geometry.integrations,
            geometry.integration_time()
        );
    }

    /// Warns about unrequested pointing metadata, once per run.
    pub fn ignored_pointing(&mut self) {
        if !self.pointing_warned {
            warn!("pointing metadata is present in the stream but ignored; enable pointing fields to record it");
            self.pointing_warned = true;
        }
    }

    pub fn pointing_warned(&self) -> bool {
        self.pointing_warned
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new()
    }
}
