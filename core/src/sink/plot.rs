use std::io::Write;

use crate::pipeline::Acquisition;
use crate::prelude::SpectrumResult;
use crate::processing::OutputRecord;

#[cfg(target_os = "macos")]
pub const DEFAULT_TERMINAL: &str = "qt";
#[cfg(not(target_os = "macos"))]
pub const DEFAULT_TERMINAL: &str = "x11";

/// Streams a gnuplot script: one inline-data plot per record.
pub struct PlotSink<W: Write> {
    writer: W,
    terminal: String,
    commands: String,
    xtics_mhz: f64,
}

impl<W: Write> PlotSink<W> {
    pub fn new(writer: W, terminal: impl Into<String>, commands: impl Into<String>) -> Self {
        Self {
            writer,
            terminal: terminal.into(),
            commands: commands.into(),
            xtics_mhz: 1.0,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn begin(&mut self, acquisition: &Acquisition) {
        self.xtics_mhz = acquisition.geometry.sample_rate / 4e6;
    }

    pub fn render(&mut self, record: &OutputRecord) -> SpectrumResult<()> {
        let w = &mut self.writer;
        write!(
            w,
            "set term {} 1 noraise; set xtics {}; set xlabel \"Frequency (MHz)\"; set ylabel \"Power (dB)\"; ",
            self.terminal, self.xtics_mhz
        )?;
        write!(w, "{}; ", self.commands)?;
        match record.bounds {
            Some((min, max)) => write!(w, "set yr [{:.6}:{:.6}];", min, max)?,
            None => write!(w, "set offsets 0, 0, 0.2, 0.2;")?,
        }
        writeln!(w, "plot \"-\" u 1:2 with lines title \"signal\";")?;
        for (frequency, value) in record.frequencies.iter().zip(&record.values) {
            writeln!(w, "{:.6}, {:.6}", frequency / 1e6, value)?;
        }
        writeln!(w, "e")?;
        w.flush()?;
        Ok(())
    }
}
