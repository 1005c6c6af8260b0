use num_complex::Complex;
use serde::{Deserialize, Serialize};

use super::{PointingContext, StreamContext, Timestamp};

/// One packet as handed over by the protocol decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedBlock {
    /// Channel selector mask of the originating stream.
    pub stream_id: u32,
    pub payload: BlockPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockPayload {
    Context(StreamContext),
    Data(DataBlock),
    Pointing(PointingContext),
}

/// Timestamped run of raw IQ words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataBlock {
    pub timestamp: Timestamp,
    /// Packed samples: I in the low half-word, Q in the high half-word.
    pub words: Vec<u32>,
    /// Set by the decoder when packets were lost ahead of this one.
    #[serde(default)]
    pub lost_data: bool,
}

impl DecodedBlock {
    pub fn context(stream_id: u32, context: StreamContext) -> Self {
        Self {
            stream_id,
            payload: BlockPayload::Context(context),
        }
    }

    pub fn data(stream_id: u32, block: DataBlock) -> Self {
        Self {
            stream_id,
            payload: BlockPayload::Data(block),
        }
    }

    pub fn pointing(stream_id: u32, pointing: PointingContext) -> Self {
        Self {
            stream_id,
            payload: BlockPayload::Pointing(pointing),
        }
    }

    /// Whether the block belongs to `channel`.
    pub fn selects(&self, channel: u32) -> bool {
        self.stream_id & (1u32 << channel) != 0
    }
}

impl DataBlock {
    pub fn from_iq(timestamp: Timestamp, samples: &[Complex<i16>]) -> Self {
        Self {
            timestamp,
            words: samples.iter().map(|&sample| pack_iq(sample)).collect(),
            lost_data: false,
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn iq(&self) -> impl Iterator<Item = Complex<i16>> + '_ {
        self.words.iter().map(|&word| unpack_iq(word))
    }
}

#[inline]
pub fn unpack_iq(word: u32) -> Complex<i16> {
    Complex::new((word & 0xffff) as u16 as i16, (word >> 16) as u16 as i16)
}

#[inline]
pub fn pack_iq(sample: Complex<i16>) -> u32 {
    (sample.re as u16 as u32) | ((sample.im as u16 as u32) << 16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_keep_sign_of_both_components() {
        let sample = Complex::new(-3i16, 32767);
        let word = pack_iq(sample);
        assert_eq!(word & 0xffff, 0xfffd);
        assert_eq!(unpack_iq(word), sample);
    }

    #[test]
    fn channel_mask_selects_stream() {
        let block = DecodedBlock::data(0b10, DataBlock::from_iq(Timestamp::default(), &[]));
        assert!(block.selects(1));
        assert!(!block.selects(0));
    }
}
