use std::io::Write;

use crate::pipeline::Acquisition;
use crate::prelude::SpectrumResult;
use crate::processing::{OutputRecord, RecordField};

/// Comma-separated rows, preceded by either a plain or an ECSV header.
pub struct TextSink<W: Write> {
    writer: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn begin_plain(&mut self, acquisition: &Acquisition) -> SpectrumResult<()> {
        let geometry = &acquisition.geometry;
        let w = &mut self.writer;
        writeln!(w, "# Spectrum parameters:")?;
        writeln!(w, "#    Bins: {}", geometry.bins)?;
        writeln!(w, "#    Bin size [Hz]: {:.2}", geometry.bin_width())?;
        writeln!(w, "#    Integrations: {}", geometry.integrations)?;
        writeln!(w, "#    Integration Time [sec]: {:.2}", geometry.integration_time())?;
        self.column_header(acquisition)
    }

    /// Astropy ECSV 1.0 header describing every column and the acquisition.
    pub fn begin_ecsv(&mut self, acquisition: &Acquisition) -> SpectrumResult<()> {
        let context = &acquisition.context;
        let geometry = &acquisition.geometry;
        let w = &mut self.writer;

        writeln!(w, "# %ECSV 1.0")?;
        writeln!(w, "# ---")?;
        writeln!(w, "# datatype:")?;
        writeln!(w, "# - {{name: timestamp, datatype: float64}}")?;
        for field in &acquisition.layout {
            match field.unit() {
                Some(unit) => writeln!(
                    w,
                    "# - {{name: {}, unit: {}, datatype: float64}}",
                    field.name(),
                    unit
                )?,
                None => writeln!(w, "# - {{name: {}, datatype: float64}}", field.name())?,
            }
        }
        for frequency in acquisition.frequencies.iter() {
            writeln!(w, "# - {{name: '{:.0}', datatype: float64}}", frequency)?;
        }
        writeln!(w, "# delimiter: ','")?;
        writeln!(w, "# meta: !!omap")?;
        writeln!(w, "# - vrt: !!omap")?;
        writeln!(w, "#   - {{stream_id: {}}}", context.stream_id)?;
        writeln!(w, "#   - {{channel: {}}}", context.channel().unwrap_or(0))?;
        writeln!(w, "#   - {{sample_rate: {:.1}}}", context.sample_rate)?;
        writeln!(w, "#   - {{frequency: {:.1}}}", context.center_frequency)?;
        writeln!(w, "#   - {{bandwidth: {:.1}}}", context.bandwidth)?;
        writeln!(w, "#   - {{rx_gain: {:.1}}}", context.gain)?;
        writeln!(
            w,
            "#   - {{reference: {}}}",
            if context.reference_locked { "external" } else { "internal" }
        )?;
        writeln!(
            w,
            "#   - {{time_source: {}}}",
            if context.time_calibrated { "pps" } else { "internal" }
        )?;
        writeln!(w, "# - spectrum: !!omap")?;
        writeln!(w, "#   - {{db: {}}}", if acquisition.db { "True" } else { "False" })?;
        writeln!(w, "#   - {{bins: {}}}", geometry.bins)?;
        writeln!(w, "#   - {{col_first_bin: {}}}", 1 + acquisition.layout.len())?;
        writeln!(w, "#   - {{bin_size: {:.2}}}", geometry.bin_width())?;
        writeln!(w, "#   - {{integrations: {}}}", geometry.integrations)?;
        writeln!(w, "#   - {{integration_time: {:.2}}}", geometry.integration_time())?;
        writeln!(w, "# schema: astropy-2.0")?;
        self.column_header(acquisition)
    }

    pub fn render(&mut self, record: &OutputRecord) -> SpectrumResult<()> {
        let w = &mut self.writer;
        write!(w, "{}", record.timestamp)?;
        for scalar in &record.scalars {
            match scalar.field {
                RecordField::CenterFrequency => write!(w, ", {}", scalar.value as i64)?,
                RecordField::Temperature => write!(w, ", {:.2}", scalar.value)?,
                _ => write!(w, ", {:.3}", scalar.value)?,
            }
        }
        for value in &record.values {
            write!(w, ", {:.3}", value)?;
        }
        writeln!(w)?;
        w.flush()?;
        Ok(())
    }

    fn column_header(&mut self, acquisition: &Acquisition) -> SpectrumResult<()> {
        let w = &mut self.writer;
        write!(w, "timestamp")?;
        for field in &acquisition.layout {
            write!(w, ", {}", field.name())?;
        }
        for frequency in acquisition.frequencies.iter() {
            write!(w, ", {:.0}", frequency)?;
        }
        writeln!(w)?;
        w.flush()?;
        Ok(())
    }
}
