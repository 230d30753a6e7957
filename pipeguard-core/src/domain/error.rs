// pipeguard-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Structural error: {0}")]
    #[diagnostic(
        code(pipeguard::domain::structure),
        help("A batch must be a sequence of records with named fields (e.g. a JSON array of objects).")
    )]
    StructuralError(String),

    #[error("Batch '{0}' contains no records")]
    #[diagnostic(
        code(pipeguard::domain::empty_batch),
        help("Ratios are undefined for an empty batch. Check the upstream extract.")
    )]
    EmptyBatch(String),

    #[error("Invalid rule '{rule}': {reason}")]
    #[diagnostic(
        code(pipeguard::domain::rule),
        help("Check the rule definition in your quality configuration.")
    )]
    InvalidRule { rule: String, reason: String },

    #[error("Invalid quality configuration: {0}")]
    #[diagnostic(code(pipeguard::domain::config))]
    InvalidConfig(String),
}
