pub mod metrics_job;

pub use metrics_job::{log_progress, BatchProgress, BatchReport, MetricsJob};
