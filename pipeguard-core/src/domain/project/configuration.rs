// pipeguard-core/src/domain/project/configuration.rs

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::domain::alerting::{AlertThresholds, QualityThresholds};
use crate::domain::quality::QualityGateConfig;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Validate)]
pub struct ProjectConfig {
    #[validate(length(min = 1, message = "Project name cannot be empty"))]
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(rename = "config-paths", default = "default_config_paths")]
    pub config_paths: Vec<String>,

    #[serde(rename = "target-path", default = "default_target_path")]
    pub target_path: String,

    #[serde(rename = "clean-targets", default = "default_clean_targets")]
    pub clean_targets: Vec<String>,

    #[validate(nested)]
    #[validate(custom(function = "validate_unique_tables"))]
    #[serde(default)]
    pub tables: Vec<QualityGateConfig>,

    #[validate(nested)]
    #[serde(default)]
    pub alerts: AlertsConfig,
}

/// Alerting section: run limits, quality limits and the delivery channel.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Validate)]
pub struct AlertsConfig {
    #[validate(nested)]
    #[serde(default)]
    pub thresholds: AlertThresholds,

    #[validate(nested)]
    #[serde(default)]
    pub quality: QualityThresholds,

    #[serde(rename = "webhook-url", default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    #[validate(range(min = 1, max = 300))]
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            thresholds: AlertThresholds::default(),
            quality: QualityThresholds::default(),
            webhook_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ProjectConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            environment: default_environment(),
            config_paths: default_config_paths(),
            target_path: default_target_path(),
            clean_targets: default_clean_targets(),
            tables: Vec::new(),
            alerts: AlertsConfig::default(),
        }
    }

    pub fn table(&self, name: &str) -> Option<&QualityGateConfig> {
        self.tables.iter().find(|t| t.table == name)
    }

    /// Adds a table, replacing any table with the same name in place.
    pub fn upsert_table(&mut self, table: QualityGateConfig) {
        match self.tables.iter_mut().find(|t| t.table == table.table) {
            Some(existing) => *existing = table,
            None => self.tables.push(table),
        }
    }
}

fn validate_unique_tables(tables: &[QualityGateConfig]) -> Result<(), ValidationError> {
    let mut seen = std::collections::HashSet::new();
    for table in tables {
        if !seen.insert(table.table.as_str()) {
            let mut err = ValidationError::new("duplicate_table");
            err.message = Some(format!("Table '{}' is declared twice", table.table).into());
            return Err(err);
        }
    }
    Ok(())
}

fn default_version() -> String {
    "0.1.0".to_string()
}
fn default_environment() -> String {
    "dev".to_string()
}
fn default_config_paths() -> Vec<String> {
    vec!["config".to_string()]
}
fn default_target_path() -> String {
    "target".to_string()
}
fn default_clean_targets() -> Vec<String> {
    vec!["target".to_string()]
}
fn default_timeout_secs() -> u64 {
    10
}
