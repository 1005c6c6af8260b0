//! Where decoded blocks come from. The protocol decoder and transport live
//! outside this crate; sources only hand over what they produce.

pub mod jsonl;

use spectracore::stream::DecodedBlock;

pub enum Received {
    Block(DecodedBlock),
    /// Something arrived that is not a recognized packet; always skipped.
    Unrecognized(String),
}

pub trait BlockSource {
    /// Blocks until the next packet. `None` ends the stream.
    fn receive(&mut self) -> anyhow::Result<Option<Received>>;
}
