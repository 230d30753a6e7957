// pipeguard-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(pipeguard::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    #[error("Cannot read '{path}': {source}")]
    #[diagnostic(
        code(pipeguard::infra::read),
        help("Check file permissions or path validity.")
    )]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // --- CONFIG / YAML ---
    #[error("YAML Parsing Error in '{path}': {source}")]
    #[diagnostic(
        code(pipeguard::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    YamlError {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Configuration Error: {0}")]
    #[diagnostic(code(pipeguard::infra::config))]
    ConfigError(String),

    #[error("Project configuration not found at '{0}'")]
    #[diagnostic(
        code(pipeguard::infra::config_missing),
        help("Run `pipeguard init` to scaffold a project.")
    )]
    ConfigNotFound(String),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(pipeguard::infra::validation))]
    Validation(#[from] validator::ValidationErrors),

    // --- DATA FILES ---
    #[error("JSON Error: {0}")]
    #[diagnostic(code(pipeguard::infra::json))]
    Json(#[from] serde_json::Error),

    #[error("CSV Error: {0}")]
    #[diagnostic(
        code(pipeguard::infra::csv),
        help("Every row must have as many fields as the header line.")
    )]
    Csv(#[from] csv::Error),

    #[error("Unsupported source format '{0}'")]
    #[diagnostic(
        code(pipeguard::infra::source_format),
        help("Sources must be .csv or .json files.")
    )]
    UnsupportedSource(String),
}
