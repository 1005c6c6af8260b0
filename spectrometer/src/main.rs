use anyhow::{bail, Context};
use clap::Parser;
use log::{error, info, warn};
use spectracore::prelude::AlignmentMode;
use spectracore::sink::{OutputSink, DEFAULT_TERMINAL};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;

use generator::{GeneratorConfig, SyntheticSource};
use source::BlockSource;
use workflow::{OutputFormat, Runner, SourceConfig, WorkflowConfig};

mod generator;
mod source;
mod workflow;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Integrates decoded IQ sample blocks into averaged power spectra"
)]
struct Args {
    /// Load a workflow config from YAML; acquisition flags below are ignored
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// JSON-lines decoded block stream ("-" or absent for stdin)
    #[arg(long)]
    input: Option<PathBuf>,
    /// Generate a synthetic tone-plus-noise stream instead of reading input
    #[arg(long, default_value_t = false)]
    simulate: bool,

    /// Total number of samples to integrate (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    nsamps: u64,
    /// Seconds to run (0 = unlimited); overrides --nsamps
    #[arg(long, default_value_t = 0.0)]
    duration: f64,
    /// Periodically report throughput and input levels
    #[arg(long, default_value_t = false)]
    progress: bool,
    /// Channel bit in the stream identifier
    #[arg(long, default_value_t = 0)]
    channel: u32,
    /// Start integrating on an integer second
    #[arg(long, default_value_t = false)]
    int_second: bool,
    /// Start integrating on a second that is a multiple of the integration time
    #[arg(long, default_value_t = false)]
    int_interval: bool,

    /// Number of FFT bins
    #[arg(long, default_value_t = 1000)]
    num_bins: usize,
    /// Bin width in Hz; derives the bin count from the sample rate
    #[arg(long)]
    bin_size: Option<f64>,
    /// Round a derived bin count to a power of two
    #[arg(long, default_value_t = false)]
    power2: bool,
    /// Frames averaged per record; derived from --integration-time when absent
    #[arg(long)]
    integrations: Option<u32>,
    /// Seconds per record
    #[arg(long, default_value_t = 1.0)]
    integration_time: f64,
    /// Smoothing time constant in seconds
    #[arg(long)]
    tau: Option<f64>,
    /// Bandpass correction polynomial, highest degree first
    #[arg(long, num_args = 1.., allow_negative_numbers = true)]
    poly: Vec<f64>,

    /// Stream gnuplot commands instead of text rows
    #[arg(long, default_value_t = false)]
    gnuplot: bool,
    /// Extra gnuplot commands emitted with every plot
    #[arg(long, default_value = "")]
    gnuplot_commands: String,
    /// Gnuplot terminal
    #[arg(long, default_value = DEFAULT_TERMINAL)]
    term: String,
    /// Hold the running min/max as plot bounds
    #[arg(long, default_value_t = false)]
    minmax: bool,
    /// Output power in dB
    #[arg(long, default_value_t = false)]
    db: bool,
    /// Suppress the DC bin
    #[arg(long, default_value_t = false)]
    dc: bool,
    /// Write ECSV instead of plain text
    #[arg(long, default_value_t = false)]
    ecsv: bool,
    /// Write little-endian doubles to this file
    #[arg(long)]
    bin_file: Option<PathBuf>,
    /// Add the center frequency column
    #[arg(long, default_value_t = false)]
    center_freq: bool,
    /// Add the temperature column
    #[arg(long, default_value_t = false)]
    temperature: bool,
    /// Add the pointing columns from the extended context
    #[arg(long, default_value_t = false)]
    dt_trace: bool,
    /// Discard all output
    #[arg(long, default_value_t = false)]
    null: bool,
    /// Keep integrating when the decoder reports lost data
    #[arg(long = "continue", default_value_t = false)]
    continue_on_lost_data: bool,

    /// Synthetic stream sample rate
    #[arg(long, default_value_t = 1e6)]
    sim_rate: f64,
    /// Synthetic tone offset from the center frequency in Hz
    #[arg(long, default_value_t = 100e3)]
    sim_tone: f64,
    /// Synthetic data blocks to emit (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    sim_blocks: u64,
    #[arg(long, default_value_t = 0)]
    sim_seed: u64,
    /// Mark every n-th synthetic block as following lost data
    #[arg(long)]
    sim_lost_every: Option<u64>,
}

impl Args {
    fn workflow_config(&self) -> WorkflowConfig {
        let mut config = WorkflowConfig::default();

        let pipeline = &mut config.pipeline;
        pipeline.num_bins = self.num_bins;
        pipeline.bin_size_hz = self.bin_size;
        pipeline.power_of_two = self.power2;
        pipeline.integrations = self.integrations;
        pipeline.integration_time_s = self.integration_time;
        pipeline.tau_s = self.tau;
        pipeline.poly = self.poly.clone();
        pipeline.db = self.db;
        pipeline.suppress_dc = self.dc;
        pipeline.alignment = if self.int_interval {
            AlignmentMode::IntegerInterval
        } else if self.int_second {
            AlignmentMode::IntegerSecond
        } else {
            AlignmentMode::None
        };
        pipeline.continue_on_lost_data = self.continue_on_lost_data;
        pipeline.hold_min_max = self.minmax;
        pipeline.fields.center_frequency = self.center_freq;
        pipeline.fields.temperature = self.temperature;
        pipeline.fields.pointing = self.dt_trace;
        pipeline.channel = self.channel;

        let output = &mut config.output;
        output.format = if self.null {
            OutputFormat::Null
        } else if self.bin_file.is_some() {
            OutputFormat::Binary
        } else if self.gnuplot {
            OutputFormat::Plot
        } else if self.ecsv {
            OutputFormat::Ecsv
        } else {
            OutputFormat::Text
        };
        output.path = self.bin_file.clone();
        output.terminal = self.term.clone();
        output.plot_commands = self.gnuplot_commands.clone();

        config.source = if self.simulate {
            SourceConfig::Synthetic(GeneratorConfig {
                sample_rate: self.sim_rate,
                tone_offset_hz: self.sim_tone,
                blocks: self.sim_blocks,
                seed: self.sim_seed,
                lost_every: self.sim_lost_every,
                pointing: self.dt_trace,
                ..Default::default()
            })
        } else {
            SourceConfig::Jsonl {
                path: self.input.clone(),
            }
        };

        config.run.max_samples = self.nsamps;
        config.run.duration_s = self.duration;
        config.run.progress = self.progress;

        config.normalized()
    }
}

fn open_source(config: &SourceConfig) -> anyhow::Result<Box<dyn BlockSource>> {
    match config {
        SourceConfig::Jsonl { path } => source::jsonl::open(path.as_deref()),
        SourceConfig::Synthetic(profile) => Ok(Box::new(SyntheticSource::new(profile.clone()))),
    }
}

fn open_sink(config: &WorkflowConfig) -> anyhow::Result<OutputSink<Box<dyn Write>>> {
    let output = &config.output;
    if output.format == OutputFormat::Null {
        return Ok(OutputSink::Null);
    }

    let writer: Box<dyn Write> = match &output.path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating output {}", path.display()))?,
        )),
        None if output.format == OutputFormat::Binary => {
            bail!("binary output needs a destination file")
        }
        None => Box::new(BufWriter::new(io::stdout())),
    };

    Ok(match output.format {
        OutputFormat::Text => OutputSink::text(writer),
        OutputFormat::Ecsv => OutputSink::ecsv(writer),
        OutputFormat::Binary => OutputSink::binary(writer),
        OutputFormat::Plot => {
            OutputSink::plot(writer, output.terminal.clone(), output.plot_commands.clone())
        }
        OutputFormat::Null => OutputSink::Null,
    })
}

/// First Ctrl+C asks the run loop to stop; a second one exits immediately.
fn watch_interrupts(stop: Arc<AtomicBool>) -> anyhow::Result<()> {
    let runtime = TokioBuilder::new_current_thread()
        .enable_all()
        .build()
        .context("creating runtime for signal handling")?;
    thread::Builder::new()
        .name("ctrl-c".into())
        .spawn(move || {
            runtime.block_on(async {
                while signal::ctrl_c().await.is_ok() {
                    if stop.swap(true, Ordering::SeqCst) {
                        warn!("second interrupt, exiting");
                        std::process::exit(130);
                    }
                    warn!("interrupt received, stopping after the current block");
                }
            })
        })
        .context("spawning signal watcher")?;
    Ok(())
}

fn run(args: Args) -> anyhow::Result<u8> {
    let config = match &args.workflow {
        Some(path) => WorkflowConfig::load(path)?,
        None => args.workflow_config(),
    };

    let stop = Arc::new(AtomicBool::new(false));
    watch_interrupts(stop.clone())?;

    let mut source = open_source(&config.source)?;
    let mut sink = open_sink(&config)?;
    info!("writing {} output", sink.name());

    let runner = Runner::new(config, stop);
    let summary = runner.execute(source.as_mut(), &mut sink)?;
    if let Some(mut writer) = sink.into_inner() {
        writer.flush().context("flushing output")?;
    }
    Ok(summary.status.exit_code())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(args) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_onto_workflow() {
        let args = Args::parse_from([
            "spectrometer",
            "--num-bins",
            "512",
            "--int-interval",
            "--poly",
            "1e-3",
            "-2.5",
            "1",
            "--gnuplot",
            "--continue",
            "--dt-trace",
            "--simulate",
            "--sim-blocks",
            "7",
        ]);
        let config = args.workflow_config();
        assert_eq!(config.pipeline.num_bins, 512);
        assert_eq!(config.pipeline.alignment, AlignmentMode::IntegerInterval);
        assert_eq!(config.pipeline.poly, vec![1e-3, -2.5, 1.0]);
        assert!(config.pipeline.continue_on_lost_data);
        assert!(config.pipeline.fields.pointing);
        assert_eq!(config.output.format, OutputFormat::Plot);
        assert!(config.pipeline.db, "plots are drawn in dB");
        match config.source {
            SourceConfig::Synthetic(profile) => {
                assert_eq!(profile.blocks, 7);
                assert!(profile.pointing);
            }
            other => panic!("expected synthetic source, got {other:?}"),
        }
    }

    #[test]
    fn null_output_wins_over_files() {
        let args = Args::parse_from(["spectrometer", "--null", "--bin-file", "out.bin", "--ecsv"]);
        let config = args.workflow_config();
        assert_eq!(config.output.format, OutputFormat::Null);
        assert!(matches!(open_sink(&config).unwrap(), OutputSink::Null));
    }

    #[test]
    fn binary_output_requires_a_file() {
        let mut config = WorkflowConfig::default();
        config.output.format = OutputFormat::Binary;
        assert!(open_sink(&config).is_err());

        let dir = tempfile::tempdir().unwrap();
        config.output.path = Some(dir.path().join("spectra.bin"));
        assert_eq!(open_sink(&config).unwrap().name(), "binary");
    }
}
