// pipeguard-core/src/domain/alerting/thresholds.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Limits a finished (or running) pipeline run is checked against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AlertThresholds {
    #[validate(range(min = 0.0))]
    pub max_duration_minutes: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub max_error_rate: f64,
    #[validate(range(min = 0.0))]
    pub max_memory_usage_mb: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub max_cpu_usage_percent: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            max_duration_minutes: 60.0,
            max_error_rate: 0.05,
            max_memory_usage_mb: 4096.0,
            max_cpu_usage_percent: 90.0,
        }
    }
}

/// Minimum acceptable aggregate scores of a quality report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct QualityThresholds {
    #[validate(range(min = 0.0, max = 1.0))]
    pub completeness: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub uniqueness: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub validity: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            completeness: 0.95,
            uniqueness: 0.98,
            validity: 0.90,
        }
    }
}
