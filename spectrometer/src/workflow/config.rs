use anyhow::Context;
use log::info;
use serde::{Deserialize, Serialize};
use spectracore::sink::DEFAULT_TERMINAL;
use spectracore::PipelineConfig;
use std::fs;
use std::path::{Path, PathBuf};

use crate::generator::GeneratorConfig;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Text,
    Ecsv,
    Binary,
    Plot,
    Null,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Destination file; standard output when absent.
    pub path: Option<PathBuf>,
    pub terminal: String,
    pub plot_commands: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            path: None,
            terminal: DEFAULT_TERMINAL.to_string(),
            plot_commands: String::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SourceConfig {
    /// JSON-lines decoded blocks from a file, or stdin when no path is given.
    Jsonl { path: Option<PathBuf> },
    Synthetic(GeneratorConfig),
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Jsonl { path: None }
    }
}

/// Stop conditions and diagnostics for one run.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunLimits {
    /// Samples to integrate before stopping; 0 means unlimited.
    pub max_samples: u64,
    /// Seconds to run; 0 means unlimited. Overrides `max_samples` once the
    /// sample rate is known.
    pub duration_s: f64,
    pub progress: bool,
    pub progress_interval_s: f64,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_samples: 0,
            duration_s: 0.0,
            progress: false,
            progress_interval_s: 1.0,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkflowConfig {
    pub pipeline: PipelineConfig,
    pub output: OutputConfig,
    pub source: SourceConfig,
    pub run: RunLimits,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config.normalized())
    }

    /// Applies cross-section rules: plots are always drawn in dB.
    pub fn normalized(mut self) -> Self {
        if self.output.format == OutputFormat::Plot && !self.pipeline.db {
            info!("plot output draws power in dB, enabling dB conversion");
            self.pipeline.db = true;
        }
        self
    }
}
