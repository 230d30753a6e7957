// pipeguard-core/src/domain/monitor/mod.rs

pub mod metrics;
pub mod run_monitor;

pub use metrics::{MetricsUpdate, RunMetrics, RunOutcome, RunStatus};
pub use run_monitor::RunMonitor;
