pub mod log;
pub mod metrics;

pub use log::RunLogger;
pub use metrics::{MetricsSnapshot, RunMetrics};
