// pipeguard-core/src/domain/quality/mod.rs

pub mod config;
pub mod gate;
pub mod report;
pub mod rule;

pub use config::{CheckSpec, QualityGateConfig, RuleSpec};
pub use gate::QualityGate;
pub use report::{ColumnScore, GateFailure, QualityReport, RuleResult, Verdict, Violation};
pub use rule::{Check, Rule, RuleCategory, RuleKind};
