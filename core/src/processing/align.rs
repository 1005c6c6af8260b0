use crate::prelude::AlignmentMode;
use crate::stream::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Still waiting for a boundary; drop the block.
    Discard,
    /// This block is the first one on the boundary.
    Aligned,
    /// Alignment already satisfied or not requested.
    Accept,
}

/// One-shot gate that holds acquisition back until a second (or interval) boundary.
pub struct AcquisitionAligner {
    mode: AlignmentMode,
    interval_s: u64,
    last_fraction: Option<u64>,
    satisfied: bool,
}

impl AcquisitionAligner {
    pub fn new(mode: AlignmentMode, interval_s: u64) -> Self {
        Self {
            mode,
            interval_s: interval_s.max(1),
            last_fraction: None,
            satisfied: mode == AlignmentMode::None,
        }
    }

    pub fn is_satisfied(&self) -> bool {
        self.satisfied
    }

    pub fn admit(&mut self, timestamp: &Timestamp) -> Admission {
        if self.satisfied {
            return Admission::Accept;
        }

        let wrapped = matches!(self.last_fraction, Some(last) if timestamp.picoseconds < last);
        self.last_fraction = Some(timestamp.picoseconds);
        if !wrapped {
            return Admission::Discard;
        }

        if self.mode == AlignmentMode::IntegerInterval && timestamp.seconds % self.interval_s != 0 {
            return Admission::Discard;
        }

        self.satisfied = true;
        Admission::Aligned
    }
}
