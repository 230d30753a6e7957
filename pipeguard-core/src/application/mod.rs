// pipeguard-core/src/application/mod.rs

pub mod clean;
pub mod dispatcher;
pub mod pipeline;

// --- RE-EXPORTS (FACADE PATTERN) ---
// `use pipeguard_core::application::{run_quality_pipeline, clean_project, AlertDispatcher};`

pub use clean::clean_project;
pub use dispatcher::{AlertDispatcher, DeliveryFailure, DispatchReport};
pub use pipeline::{PipelineContext, PipelineOutcome, RunResult, TableSummary, run_quality_pipeline};
