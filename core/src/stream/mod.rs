pub mod block;
pub mod context;
pub mod timestamp;

pub use block::{pack_iq, unpack_iq, BlockPayload, DataBlock, DecodedBlock};
pub use context::{PointingContext, StreamContext, POINTING_FIELD_COUNT};
pub use timestamp::{Timestamp, PICOS_PER_SECOND};
