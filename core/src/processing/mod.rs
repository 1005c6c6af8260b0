pub mod accumulator;
pub mod align;
pub mod calibration;
pub mod frame;
pub mod record;

pub use accumulator::SpectralAccumulator;
pub use align::{AcquisitionAligner, Admission};
pub use calibration::CalibrationStage;
pub use frame::{FrameAssembler, FrameStatus};
pub use record::{MinMaxHold, OutputRecord, RecordBuilder, RecordField, ScalarField};
