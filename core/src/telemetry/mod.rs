pub mod log;
pub mod metrics;
pub mod progress;

pub use log::LogManager;
pub use metrics::RunMetrics;
pub use progress::{ProgressReporter, ProgressSample};
