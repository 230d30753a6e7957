// pipeguard-core/src/domain/alerting/mod.rs

pub mod evaluator;
pub mod thresholds;

pub use evaluator::{Alert, AlertEvaluator, AlertKind, AlertSeverity};
pub use thresholds::{AlertThresholds, QualityThresholds};
