use std::io::Write;

use crate::prelude::SpectrumResult;
use crate::processing::OutputRecord;

/// Fixed-width little-endian f64 stream: timestamp, scalar fields, bin values.
pub struct BinarySink<W: Write> {
    writer: W,
}

impl<W: Write> BinarySink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn render(&mut self, record: &OutputRecord) -> SpectrumResult<()> {
        let scalars = record.scalars.iter().map(|scalar| scalar.value);
        let values = std::iter::once(record.timestamp.as_secs_f64())
            .chain(scalars)
            .chain(record.values.iter().copied());
        for value in values {
            self.writer.write_all(&value.to_le_bytes())?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
