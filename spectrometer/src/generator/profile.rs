use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use spectracore::stream::{
    DataBlock, DecodedBlock, PointingContext, StreamContext, Timestamp, PICOS_PER_SECOND,
};
use std::collections::VecDeque;
use std::f64::consts::PI;

use crate::source::{BlockSource, Received};

/// Configuration for generating a synthetic decoded stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    pub sample_rate: f64,
    pub center_frequency: f64,
    pub stream_id: u32,
    pub temperature: f64,
    pub block_size: usize,
    pub tone_offset_hz: f64,
    pub tone_amplitude: f64,
    pub noise: f64,
    pub seed: u64,
    pub start_seconds: u64,
    pub start_fraction: f64,
    /// Data blocks to emit; 0 keeps going forever.
    pub blocks: u64,
    /// Re-announce the context every this many data blocks.
    pub context_every: u64,
    /// Flag every n-th data block as following lost packets.
    pub lost_every: Option<u64>,
    pub pointing: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 1e6,
            center_frequency: 1.42e9,
            stream_id: 1,
            temperature: 25.0,
            block_size: 1000,
            tone_offset_hz: 100e3,
            tone_amplitude: 8000.0,
            noise: 500.0,
            seed: 0,
            start_seconds: 1_700_000_000,
            start_fraction: 0.3,
            blocks: 0,
            context_every: 100,
            lost_every: None,
            pointing: false,
        }
    }
}

impl GeneratorConfig {
    fn context(&self) -> StreamContext {
        StreamContext {
            sample_rate: self.sample_rate,
            center_frequency: self.center_frequency,
            bandwidth: self.sample_rate,
            stream_id: self.stream_id,
            gain: 0.0,
            temperature: self.temperature,
            reference_locked: true,
            time_calibrated: true,
        }
    }

    fn start(&self) -> Timestamp {
        let fraction = self.start_fraction.clamp(0.0, 1.0);
        Timestamp::new(self.start_seconds, (fraction * PICOS_PER_SECOND as f64) as u64)
    }
}

/// Tone-plus-noise stream standing in for a live decoder.
pub struct SyntheticSource {
    config: GeneratorConfig,
    rng: StdRng,
    sample_index: u64,
    data_blocks: u64,
    pending: VecDeque<DecodedBlock>,
}

impl SyntheticSource {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            sample_index: 0,
            data_blocks: 0,
            pending: VecDeque::new(),
        }
    }

    fn jitter(&mut self) -> f64 {
        if self.config.noise > 0.0 {
            self.rng.gen_range(-self.config.noise..self.config.noise)
        } else {
            0.0
        }
    }

    fn next_data(&mut self) -> DecodedBlock {
        let config = &self.config;
        let timestamp = config
            .start()
            .advanced_by_samples(self.sample_index, config.sample_rate);
        let step = 2.0 * PI * config.tone_offset_hz / config.sample_rate;
        let amplitude = config.tone_amplitude;
        let first = self.sample_index;
        let len = config.block_size;

        let words = (0..len as u64)
            .map(|n| {
                let phase = step * (first + n) as f64;
                let re = amplitude * phase.cos() + self.jitter();
                let im = amplitude * phase.sin() + self.jitter();
                num_complex::Complex::new(clamp_i16(re), clamp_i16(im))
            })
            .collect::<Vec<_>>();

        self.sample_index += len as u64;
        self.data_blocks += 1;

        let mut block = DataBlock::from_iq(timestamp, &words);
        if let Some(every) = self.config.lost_every.filter(|&n| n > 0) {
            block.lost_data = self.data_blocks % every == 0;
        }
        DecodedBlock::data(self.config.stream_id, block)
    }
}

fn clamp_i16(value: f64) -> i16 {
    value.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

impl BlockSource for SyntheticSource {
    fn receive(&mut self) -> anyhow::Result<Option<Received>> {
        if let Some(block) = self.pending.pop_front() {
            return Ok(Some(Received::Block(block)));
        }
        if self.config.blocks > 0 && self.data_blocks >= self.config.blocks {
            return Ok(None);
        }

        let every = self.config.context_every.max(1);
        if self.data_blocks % every == 0 {
            let stream_id = self.config.stream_id;
            self.pending
                .push_back(DecodedBlock::context(stream_id, self.config.context()));
            if self.config.pointing {
                self.pending.push_back(DecodedBlock::pointing(
                    stream_id,
                    PointingContext {
                        azimuth: 1.2,
                        elevation: 0.7,
                        ra_current: 2.0,
                        dec_current: 0.4,
                        ra_setpoint: 2.0,
                        dec_setpoint: 0.4,
                        focusbox: 10.0,
                        ..Default::default()
                    },
                ));
            }
        }
        let data = self.next_data();
        self.pending.push_back(data);

        Ok(self.pending.pop_front().map(Received::Block))
    }
}
