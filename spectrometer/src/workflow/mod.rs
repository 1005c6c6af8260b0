pub mod config;
pub mod runner;

pub use config::{OutputFormat, SourceConfig, WorkflowConfig};
pub use runner::Runner;
