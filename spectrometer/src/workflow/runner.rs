use anyhow::Context;
use log::{info, warn};
use spectracore::sink::OutputSink;
use spectracore::stream::BlockPayload;
use spectracore::telemetry::{LogManager, ProgressReporter, RunMetrics};
use spectracore::{SpectrumError, SpectrumPipeline};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::source::{BlockSource, Received};
use crate::workflow::config::WorkflowConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Source exhausted or the sample/time budget was reached.
    Completed,
    Cancelled,
    /// The decoder reported lost data and continuing was not requested.
    DataLossAborted,
}

impl RunStatus {
    pub fn exit_code(self) -> u8 {
        match self {
            RunStatus::DataLossAborted => 2,
            RunStatus::Completed | RunStatus::Cancelled => 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub status: RunStatus,
    pub metrics: RunMetrics,
    pub progress_reports: u64,
}

/// Drives blocks from a source through the pipeline into a sink.
pub struct Runner {
    config: WorkflowConfig,
    stop: Arc<AtomicBool>,
}

impl Runner {
    pub fn new(config: WorkflowConfig, stop: Arc<AtomicBool>) -> Self {
        Self { config, stop }
    }

    pub fn execute<W: Write>(
        &self,
        source: &mut dyn BlockSource,
        sink: &mut OutputSink<W>,
    ) -> anyhow::Result<RunSummary> {
        let limits = &self.config.run;
        let mut pipeline = SpectrumPipeline::new(self.config.pipeline.clone())
            .context("validating pipeline configuration")?;
        let logger = LogManager::new();

        let wall_limit =
            (limits.duration_s > 0.0).then(|| Duration::from_secs_f64(limits.duration_s));
        let mut sample_budget = limits.max_samples;
        let mut samples_taken: u64 = 0;
        // Runs from startup; restarted once the stream is aligned.
        let mut started_at = Instant::now();
        let mut progress = limits.progress.then(|| {
            ProgressReporter::new(
                Duration::from_secs_f64(limits.progress_interval_s.max(0.0)),
                started_at,
            )
        });
        let mut progress_reports: u64 = 0;

        let status = loop {
            if self.stop.load(Ordering::Relaxed) {
                pipeline.discard();
                break RunStatus::Cancelled;
            }
            if sample_budget > 0 && samples_taken >= sample_budget {
                info!("sample budget of {} reached", sample_budget);
                break RunStatus::Completed;
            }
            if let Some(limit) = wall_limit {
                if started_at.elapsed() >= limit {
                    info!("run duration of {:.1} s elapsed", limit.as_secs_f64());
                    break RunStatus::Completed;
                }
            }

            let block = match source.receive()? {
                Some(Received::Block(block)) => block,
                Some(Received::Unrecognized(reason)) => {
                    warn!("skipping unrecognized packet: {}", reason);
                    pipeline.record_unrecognized();
                    continue;
                }
                None => break RunStatus::Completed,
            };

            if let (Some(reporter), BlockPayload::Data(data)) = (progress.as_mut(), &block.payload) {
                if block.selects(self.config.pipeline.channel) {
                    if let Some(sample) = reporter.observe(Instant::now(), data) {
                        info!("{}", sample);
                        progress_reports += 1;
                    }
                }
            }

            let outcome = match pipeline.process_block(&block) {
                Ok(outcome) => outcome,
                Err(SpectrumError::DataLoss { timestamp }) => {
                    warn!(
                        "lost data at {}, stopping; pass --continue to integrate across gaps",
                        timestamp
                    );
                    break RunStatus::DataLossAborted;
                }
                Err(err) => return Err(err).context("processing decoded block"),
            };

            if let Some(acquisition) = &outcome.started {
                if limits.duration_s > 0.0 {
                    sample_budget = (limits.duration_s * acquisition.geometry.sample_rate) as u64;
                }
                sink.begin(acquisition)
                    .with_context(|| format!("writing {} header", sink.name()))?;
            }
            if outcome.aligned {
                started_at = Instant::now();
                if let Some(reporter) = progress.as_mut() {
                    reporter.restart(started_at);
                }
            }

            for record in &outcome.records {
                sink.render(record)
                    .with_context(|| format!("writing {} record", sink.name()))?;
            }
            samples_taken += outcome.samples as u64;
        };

        let metrics = pipeline.metrics();
        logger.record(&format!(
            "run {:?}: {} blocks, {} samples, {} records, {} unrecognized, {} lost-data markers",
            status,
            metrics.blocks,
            metrics.samples,
            metrics.records,
            metrics.unrecognized,
            metrics.lost_data
        ));
        Ok(RunSummary {
            status,
            metrics,
            progress_reports,
        })
    }
}
