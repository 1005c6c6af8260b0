//! Renderers for output records.
//!
//! The set of sinks is closed; the driver picks one variant and only ever
//! talks to it through `begin` and `render`.

pub mod binary;
pub mod plot;
pub mod text;

use std::io::Write;

use crate::pipeline::Acquisition;
use crate::prelude::SpectrumResult;
use crate::processing::OutputRecord;

pub use binary::BinarySink;
pub use plot::{PlotSink, DEFAULT_TERMINAL};
pub use text::TextSink;

pub enum OutputSink<W: Write> {
    Text(TextSink<W>),
    Ecsv(TextSink<W>),
    Binary(BinarySink<W>),
    Plot(PlotSink<W>),
    Null,
}

impl<W: Write> OutputSink<W> {
    pub fn text(writer: W) -> Self {
        OutputSink::Text(TextSink::new(writer))
    }

    pub fn ecsv(writer: W) -> Self {
        OutputSink::Ecsv(TextSink::new(writer))
    }

    pub fn binary(writer: W) -> Self {
        OutputSink::Binary(BinarySink::new(writer))
    }

    pub fn plot(writer: W, terminal: impl Into<String>, commands: impl Into<String>) -> Self {
        OutputSink::Plot(PlotSink::new(writer, terminal, commands))
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutputSink::Text(_) => "text",
            OutputSink::Ecsv(_) => "ecsv",
            OutputSink::Binary(_) => "binary",
            OutputSink::Plot(_) => "plot",
            OutputSink::Null => "null",
        }
    }

    /// Called once at the start of every acquisition.
    pub fn begin(&mut self, acquisition: &Acquisition) -> SpectrumResult<()> {
        match self {
            OutputSink::Text(sink) => sink.begin_plain(acquisition),
            OutputSink::Ecsv(sink) => sink.begin_ecsv(acquisition),
            OutputSink::Plot(sink) => {
                sink.begin(acquisition);
                Ok(())
            }
            OutputSink::Binary(_) | OutputSink::Null => Ok(()),
        }
    }

    pub fn render(&mut self, record: &OutputRecord) -> SpectrumResult<()> {
        match self {
            OutputSink::Text(sink) | OutputSink::Ecsv(sink) => sink.render(record),
            OutputSink::Binary(sink) => sink.render(record),
            OutputSink::Plot(sink) => sink.render(record),
            OutputSink::Null => Ok(()),
        }
    }

    pub fn into_inner(self) -> Option<W> {
        match self {
            OutputSink::Text(sink) | OutputSink::Ecsv(sink) => Some(sink.into_inner()),
            OutputSink::Binary(sink) => Some(sink.into_inner()),
            OutputSink::Plot(sink) => Some(sink.into_inner()),
            OutputSink::Null => None,
        }
    }
}
