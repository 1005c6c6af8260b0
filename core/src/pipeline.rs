//! The single-owner integration pipeline.
//!
//! One decoded block at a time flows through framing, transform and
//! averaging, calibration and record assembly. All bin-count-sized state is
//! owned here and rebuilt only when the stream context changes.

use log::{debug, info, warn};
use std::sync::Arc;

use crate::prelude::{
    PipelineConfig, PipelineStage, SpectrumError, SpectrumGeometry, SpectrumResult,
};
use crate::processing::align::{AcquisitionAligner, Admission};
use crate::processing::frame::FrameStatus;
use crate::processing::record::{OutputRecord, RecordField};
use crate::processing::{CalibrationStage, FrameAssembler, RecordBuilder, SpectralAccumulator};
use crate::stream::{BlockPayload, DataBlock, DecodedBlock, PointingContext, StreamContext};
use crate::telemetry::{LogManager, RunMetrics};

/// Description of the acquisition currently feeding the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Acquisition {
    pub context: StreamContext,
    pub geometry: SpectrumGeometry,
    pub frequencies: Arc<[f64]>,
    pub layout: Vec<RecordField>,
    pub db: bool,
}

/// What a single block produced.
#[derive(Debug, Default)]
pub struct BlockOutcome {
    /// Set when the block started a new acquisition; sinks emit a header.
    pub started: Option<Acquisition>,
    /// Set on the block that satisfied the alignment policy.
    pub aligned: bool,
    /// Samples taken into frames.
    pub samples: usize,
    pub records: Vec<OutputRecord>,
}

pub struct SpectrumPipeline {
    config: PipelineConfig,
    active: Option<Acquisition>,
    pointing: Option<PointingContext>,
    aligner: AcquisitionAligner,
    assembler: FrameAssembler,
    accumulator: SpectralAccumulator,
    calibration: CalibrationStage,
    builder: RecordBuilder,
    logger: LogManager,
    metrics: RunMetrics,
}

impl SpectrumPipeline {
    /// Validates the configuration; errors here are fatal at startup.
    pub fn new(config: PipelineConfig) -> SpectrumResult<Self> {
        config.validate()?;
        Ok(Self {
            aligner: AcquisitionAligner::new(config.alignment, config.alignment_interval_s()),
            assembler: FrameAssembler::new(),
            accumulator: SpectralAccumulator::new(),
            calibration: CalibrationStage::new(&config),
            builder: RecordBuilder::new(&config.fields, config.hold_min_max),
            logger: LogManager::new(),
            metrics: RunMetrics::new(),
            active: None,
            pointing: None,
            config,
        })
    }

    pub fn metrics(&self) -> RunMetrics {
        self.metrics.snapshot()
    }

    pub fn is_aligned(&self) -> bool {
        self.aligner.is_satisfied()
    }

    /// Counts a packet the decoder could not make sense of.
    pub fn record_unrecognized(&mut self) {
        self.metrics.record_unrecognized();
    }

    pub fn process_block(&mut self, block: &DecodedBlock) -> SpectrumResult<BlockOutcome> {
        self.metrics.record_block();
        if !block.selects(self.config.channel) {
            debug!(
                "ignoring block for stream {:#x}, channel {} selected",
                block.stream_id, self.config.channel
            );
            return Ok(BlockOutcome::default());
        }

        match &block.payload {
            BlockPayload::Context(context) => self.on_context(context),
            BlockPayload::Pointing(pointing) => {
                self.on_pointing(pointing);
                Ok(BlockOutcome::default())
            }
            BlockPayload::Data(data) => self.on_data(data),
        }
    }

    /// Drops the acquisition and any partially integrated window.
    pub fn discard(&mut self) {
        if self.active.take().is_some() {
            debug!(
                "discarding acquisition with {} frames in the open window",
                self.accumulator.counter()
            );
        }
        self.assembler.cleanup();
        self.accumulator.cleanup();
        self.calibration.cleanup();
    }

    fn on_context(&mut self, context: &StreamContext) -> SpectrumResult<BlockOutcome> {
        if let Some(active) = self.active.as_mut() {
            if active.context.same_acquisition(context) {
                active.context = context.clone();
                return Ok(BlockOutcome::default());
            }
            warn!(
                "stream context changed, discarding {} frames of the open integration window",
                self.accumulator.counter()
            );
        }

        let geometry = self.config.resolve(context)?;
        self.assembler.initialize(&geometry)?;
        self.accumulator.initialize(&geometry)?;
        self.calibration.initialize(&geometry)?;
        self.logger.acquisition(context, &geometry);
        self.metrics.record_acquisition();

        let acquisition = Acquisition {
            context: context.clone(),
            frequencies: Arc::from(geometry.frequencies()),
            geometry,
            layout: self.builder.layout().to_vec(),
            db: self.config.db,
        };
        self.active = Some(acquisition.clone());

        Ok(BlockOutcome {
            started: Some(acquisition),
            ..Default::default()
        })
    }

    fn on_pointing(&mut self, pointing: &PointingContext) {
        if self.config.fields.pointing {
            self.pointing = Some(*pointing);
        } else {
            self.logger.ignored_pointing();
        }
    }

    fn on_data(&mut self, data: &DataBlock) -> SpectrumResult<BlockOutcome> {
        let mut outcome = BlockOutcome::default();
        let Some(active) = self.active.as_ref() else {
            debug!("data block at {} before any context, dropped", data.timestamp);
            return Ok(outcome);
        };

        if data.lost_data {
            self.metrics.record_lost_data();
            if !self.config.continue_on_lost_data {
                return Err(SpectrumError::DataLoss {
                    timestamp: data.timestamp,
                });
            }
            warn!("decoder reported lost data at {}, continuing", data.timestamp);
        }

        match self.aligner.admit(&data.timestamp) {
            Admission::Discard => return Ok(outcome),
            Admission::Aligned => {
                info!("acquisition aligned at {}", data.timestamp);
                outcome.aligned = true;
            }
            Admission::Accept => {}
        }

        for (index, &word) in data.words.iter().enumerate() {
            if self.assembler.push(word) != FrameStatus::Ready {
                continue;
            }
            let Some(mean) = self.accumulator.accumulate(self.assembler.frame_mut())? else {
                continue;
            };

            let timestamp = data
                .timestamp
                .advanced_by_samples(index as u64 + 1, active.geometry.sample_rate);
            let values = self.calibration.calibrate(mean)?;
            let record = self.builder.build(
                timestamp,
                values,
                active.frequencies.clone(),
                &active.context,
                self.pointing.as_ref(),
            );
            self.metrics.record_emission();
            outcome.records.push(record);
        }

        outcome.samples = data.len();
        self.metrics.record_samples(data.len());
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::{AlignmentMode, RecordFields};
    use crate::stream::Timestamp;
    use num_complex::Complex;
    use std::f64::consts::PI;

    const STREAM: u32 = 1;

    fn context(sample_rate: f64) -> DecodedBlock {
        DecodedBlock::context(
            STREAM,
            StreamContext {
                sample_rate,
                center_frequency: 1.42e9,
                bandwidth: sample_rate,
                stream_id: STREAM,
                ..Default::default()
            },
        )
    }

    fn data(timestamp: Timestamp, samples: &[Complex<i16>]) -> DecodedBlock {
        DecodedBlock::data(STREAM, DataBlock::from_iq(timestamp, samples))
    }

    fn tone(len: usize, bins: usize, cycles: f64, amplitude: f64) -> Vec<Complex<i16>> {
        (0..len)
            .map(|n| {
                let phase = 2.0 * PI * cycles * n as f64 / bins as f64;
                Complex::new(
                    (amplitude * phase.cos()).round() as i16,
                    (amplitude * phase.sin()).round() as i16,
                )
            })
            .collect()
    }

    fn pipeline(config: PipelineConfig) -> SpectrumPipeline {
        SpectrumPipeline::new(config).unwrap()
    }

    #[test]
    fn four_bin_regression_spectrum() {
        let mut pipeline = pipeline(PipelineConfig {
            num_bins: 4,
            integrations: Some(1),
            ..Default::default()
        });
        let started = pipeline.process_block(&context(4.0)).unwrap().started;
        assert_eq!(started.unwrap().geometry.bins, 4);

        let frame = [
            Complex::new(1, 0),
            Complex::new(0, 1),
            Complex::new(-1, 0),
            Complex::new(0, -1),
        ];
        let outcome = pipeline
            .process_block(&data(Timestamp::new(7, 0), &frame))
            .unwrap();
        assert_eq!(outcome.records.len(), 1);
        let expected = [0.0, 0.0, 0.0, 16.0];
        for (value, want) in outcome.records[0].values.iter().zip(expected) {
            assert!((value - want).abs() < 1e-12, "{value} != {want}");
        }
    }

    #[test]
    fn single_tone_lands_at_offset_bin() {
        let bins = 64;
        let integrations = 4;
        let amplitude = 10_000.0;
        let mut pipeline = pipeline(PipelineConfig {
            num_bins: bins,
            integrations: Some(integrations),
            ..Default::default()
        });
        pipeline.process_block(&context(64_000.0)).unwrap();

        let samples = tone(bins * integrations as usize, bins, 5.0, amplitude);
        let outcome = pipeline
            .process_block(&data(Timestamp::new(1, 0), &samples))
            .unwrap();
        assert_eq!(outcome.records.len(), 1);

        let record = &outcome.records[0];
        let peak_bin = bins / 2 + 5;
        let expected = (amplitude * bins as f64).powi(2);
        assert!((record.values[peak_bin] - expected).abs() < 1e-3 * expected);
        assert!((record.frequencies[peak_bin] - (1.42e9 + 5_000.0)).abs() < 1e-6);
        for (bin, &value) in record.values.iter().enumerate() {
            if bin != peak_bin {
                assert!(value < 1e-6 * expected, "bin {bin} leaked {value}");
            }
        }
    }

    #[test]
    fn record_timestamp_marks_last_sample_of_window() {
        let mut pipeline = pipeline(PipelineConfig {
            num_bins: 4,
            integrations: Some(2),
            ..Default::default()
        });
        pipeline.process_block(&context(1_000.0)).unwrap();

        // Window of 8 samples spans two blocks of 5; it completes at index 2
        // of the second block.
        let samples = vec![Complex::new(1, 1); 5];
        let first = pipeline
            .process_block(&data(Timestamp::new(100, 0), &samples))
            .unwrap();
        assert!(first.records.is_empty());
        let second = pipeline
            .process_block(&data(Timestamp::new(100, 5_000_000_000), &samples))
            .unwrap();
        assert_eq!(second.records.len(), 1);
        assert_eq!(second.records[0].timestamp, Timestamp::new(100, 8_000_000_000));
    }

    #[test]
    fn integer_second_alignment_waits_for_wrap() {
        let bins = 8;
        let mut pipeline = pipeline(PipelineConfig {
            num_bins: bins,
            integrations: Some(1),
            alignment: AlignmentMode::IntegerSecond,
            ..Default::default()
        });
        pipeline.process_block(&context(32.0)).unwrap();

        // Blocks of 8 samples at 32 sps advance a quarter second each.
        let samples = vec![Complex::new(100, 0); bins];
        let quarter = 250_000_000_000u64;
        let mut first_record_block = None;
        for n in 0..8u64 {
            let ts = Timestamp::new(50, n * quarter + quarter / 2);
            let outcome = pipeline.process_block(&data(ts, &samples)).unwrap();
            if !outcome.records.is_empty() && first_record_block.is_none() {
                assert!(outcome.aligned);
                first_record_block = Some(n);
            }
        }
        // Fractions .125 .375 .625 .875, wrap at n = 4.
        assert_eq!(first_record_block, Some(4));
        assert!(pipeline.is_aligned());
    }

    #[test]
    fn lost_data_aborts_by_default() {
        let mut pipeline = pipeline(PipelineConfig {
            num_bins: 4,
            integrations: Some(1),
            ..Default::default()
        });
        pipeline.process_block(&context(4.0)).unwrap();

        let mut lost = DataBlock::from_iq(Timestamp::new(3, 0), &[Complex::new(1, 0); 4]);
        lost.lost_data = true;
        let result = pipeline.process_block(&DecodedBlock::data(STREAM, lost));
        assert!(matches!(result, Err(SpectrumError::DataLoss { .. })));
        assert_eq!(pipeline.metrics().lost_data, 1);
    }

    #[test]
    fn lost_data_continues_when_configured() {
        let mut pipeline = pipeline(PipelineConfig {
            num_bins: 4,
            integrations: Some(2),
            continue_on_lost_data: true,
            ..Default::default()
        });
        pipeline.process_block(&context(4.0)).unwrap();

        let samples = [Complex::new(2, 0); 4];
        let first = pipeline
            .process_block(&data(Timestamp::new(1, 0), &samples))
            .unwrap();
        assert!(first.records.is_empty());

        let mut lost = DataBlock::from_iq(Timestamp::new(3, 0), &samples);
        lost.lost_data = true;
        let resumed = pipeline
            .process_block(&DecodedBlock::data(STREAM, lost))
            .unwrap();
        // The window spanning the gap is averaged like any other.
        assert_eq!(resumed.records.len(), 1);
        let clean = pipeline
            .process_block(&data(Timestamp::new(4, 0), &samples))
            .unwrap();
        assert!(clean.records.is_empty());
        let next = pipeline
            .process_block(&data(Timestamp::new(5, 0), &samples))
            .unwrap();
        assert_eq!(next.records.len(), 1);
        assert_eq!(next.records[0].values, resumed.records[0].values);
    }

    #[test]
    fn context_change_resets_open_window() {
        // One bin per hertz: 4 bins at 4 sps, 8 bins at 8 sps.
        let mut pipeline = pipeline(PipelineConfig {
            bin_size_hz: Some(1.0),
            integrations: Some(2),
            ..Default::default()
        });
        pipeline.process_block(&context(4.0)).unwrap();
        let samples = [Complex::new(1, 0); 6];
        pipeline
            .process_block(&data(Timestamp::new(1, 0), &samples))
            .unwrap();

        // Same acquisition re-announced: nothing is reset.
        let repeat = pipeline.process_block(&context(4.0)).unwrap();
        assert!(repeat.started.is_none());
        let outcome = pipeline
            .process_block(&data(Timestamp::new(2, 0), &samples[..2]))
            .unwrap();
        assert_eq!(outcome.records.len(), 1);

        // A new sample rate restarts framing and integration from scratch.
        pipeline
            .process_block(&data(Timestamp::new(3, 0), &samples))
            .unwrap();
        let changed = pipeline.process_block(&context(8.0)).unwrap();
        let acquisition = changed.started.expect("new acquisition");
        assert_eq!(acquisition.geometry.bins, 8);
        assert_eq!(acquisition.frequencies.len(), 8);

        // The open window was dropped; the next one takes 16 fresh samples.
        let wide = [Complex::new(1, 0); 8];
        let after = pipeline
            .process_block(&data(Timestamp::new(4, 0), &wide))
            .unwrap();
        assert!(after.records.is_empty());
        let next = pipeline
            .process_block(&data(Timestamp::new(5, 0), &wide))
            .unwrap();
        assert_eq!(next.records.len(), 1);
        assert_eq!(next.records[0].values.len(), 8);
        assert_eq!(next.records[0].frequencies.len(), 8);
        assert_eq!(pipeline.metrics().acquisitions, 2);
    }

    #[test]
    fn pointing_fields_follow_extended_context() {
        let mut pipeline = pipeline(PipelineConfig {
            num_bins: 4,
            integrations: Some(1),
            fields: RecordFields {
                center_frequency: true,
                temperature: false,
                pointing: true,
            },
            ..Default::default()
        });
        pipeline.process_block(&context(4.0)).unwrap();
        pipeline
            .process_block(&DecodedBlock::pointing(
                STREAM,
                PointingContext {
                    elevation: PI / 4.0,
                    focusbox: 3.0,
                    ..Default::default()
                },
            ))
            .unwrap();
        let outcome = pipeline
            .process_block(&data(Timestamp::new(1, 0), &[Complex::new(1, 0); 4]))
            .unwrap();
        let scalars = &outcome.records[0].scalars;
        assert_eq!(scalars.len(), 12);
        assert_eq!(scalars[0].value, 1.42e9);
        assert!((scalars[2].value - 45.0).abs() < 1e-9);
        assert_eq!(scalars[11].value, 3.0);
    }

    #[test]
    fn unrequested_pointing_is_discarded() {
        let mut pipeline = pipeline(PipelineConfig {
            num_bins: 4,
            integrations: Some(1),
            ..Default::default()
        });
        pipeline.process_block(&context(4.0)).unwrap();
        for _ in 0..3 {
            pipeline
                .process_block(&DecodedBlock::pointing(STREAM, PointingContext::default()))
                .unwrap();
        }
        assert!(pipeline.logger.pointing_warned());
        assert!(pipeline.pointing.is_none());
    }

    #[test]
    fn other_channels_and_early_data_are_ignored() {
        let mut pipeline = pipeline(PipelineConfig {
            num_bins: 4,
            integrations: Some(1),
            ..Default::default()
        });
        let early = pipeline
            .process_block(&data(Timestamp::new(1, 0), &[Complex::new(1, 0); 4]))
            .unwrap();
        assert!(early.records.is_empty());

        pipeline.process_block(&context(4.0)).unwrap();
        let foreign = DecodedBlock::data(
            0b10,
            DataBlock::from_iq(Timestamp::new(2, 0), &[Complex::new(1, 0); 4]),
        );
        assert!(pipeline.process_block(&foreign).unwrap().records.is_empty());
    }

    #[test]
    fn invalid_configuration_is_rejected_up_front() {
        let result = SpectrumPipeline::new(PipelineConfig {
            integration_time_s: 0.3,
            alignment: AlignmentMode::IntegerInterval,
            ..Default::default()
        });
        assert!(matches!(result, Err(SpectrumError::Config(_))));
    }
}
