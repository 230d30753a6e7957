// pipeguard-core/src/domain/health.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn emoji(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "✅",
            HealthStatus::Degraded => "⚠️",
            HealthStatus::Unhealthy => "❌",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => f.write_str("healthy"),
            HealthStatus::Degraded => f.write_str("degraded"),
            HealthStatus::Unhealthy => f.write_str("unhealthy"),
        }
    }
}

/// Outcome of one probe against an external service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub service: String,
    pub status: HealthStatus,
    #[serde(default)]
    pub response_time_ms: f64,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Probe entry as written by the probing side: either a finished result, or
/// the age of the newest landed file, still to be classified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Probe {
    Result(HealthCheckResult),
    Freshness {
        service: String,
        hours_old: f64,
        #[serde(default)]
        response_time_ms: f64,
    },
}

impl Probe {
    pub fn into_result(self) -> HealthCheckResult {
        match self {
            Probe::Result(result) => result,
            Probe::Freshness {
                service,
                hours_old,
                response_time_ms,
            } => {
                let (status, message) = classify_freshness(hours_old);
                HealthCheckResult {
                    service,
                    status,
                    response_time_ms,
                    message,
                    details: Some(BTreeMap::from([(
                        "hours_old".to_string(),
                        serde_json::json!(hours_old),
                    )])),
                    timestamp: None,
                }
            }
        }
    }
}

/// Data older than a day is stale, older than half a day is aging.
pub fn classify_freshness(hours_old: f64) -> (HealthStatus, String) {
    if hours_old > 24.0 {
        (
            HealthStatus::Degraded,
            format!("Data is {:.1} hours old (stale)", hours_old),
        )
    } else if hours_old > 12.0 {
        (
            HealthStatus::Degraded,
            format!("Data is {:.1} hours old (aging)", hours_old),
        )
    } else {
        (
            HealthStatus::Healthy,
            format!("Data is {:.1} hours old (fresh)", hours_old),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub timestamp: DateTime<Utc>,
    pub environment: String,
    pub overall_status: HealthStatus,
    pub total_checks: usize,
    pub healthy_checks: usize,
    pub degraded_checks: usize,
    pub unhealthy_checks: usize,
    pub checks: Vec<HealthCheckResult>,
}

impl HealthReport {
    pub fn from_results(
        environment: impl Into<String>,
        timestamp: DateTime<Utc>,
        checks: Vec<HealthCheckResult>,
    ) -> Self {
        let count = |status: HealthStatus| checks.iter().filter(|c| c.status == status).count();
        let healthy_checks = count(HealthStatus::Healthy);
        let degraded_checks = count(HealthStatus::Degraded);
        let unhealthy_checks = count(HealthStatus::Unhealthy);

        let overall_status = if unhealthy_checks > 0 {
            HealthStatus::Unhealthy
        } else if degraded_checks > 0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        Self {
            timestamp,
            environment: environment.into(),
            overall_status,
            total_checks: checks.len(),
            healthy_checks,
            degraded_checks,
            unhealthy_checks,
            checks,
        }
    }

    /// Process exit code for schedulers: 0 healthy, 1 unhealthy, 2 degraded.
    pub fn exit_code(&self) -> i32 {
        match self.overall_status {
            HealthStatus::Healthy => 0,
            HealthStatus::Unhealthy => 1,
            HealthStatus::Degraded => 2,
        }
    }

    pub fn render_text(&self) -> String {
        let mut lines = vec![
            format!("Health Check Report - {}", self.environment.to_uppercase()),
            format!("Timestamp: {}", self.timestamp.to_rfc3339()),
            format!(
                "Overall Status: {}",
                self.overall_status.to_string().to_uppercase()
            ),
            format!("Total Checks: {}", self.total_checks),
            format!(
                "Healthy: {}, Degraded: {}, Unhealthy: {}",
                self.healthy_checks, self.degraded_checks, self.unhealthy_checks
            ),
            String::new(),
            "Individual Checks:".to_string(),
        ];

        for check in &self.checks {
            lines.push(format!(
                "  {} {}: {}",
                check.status.emoji(),
                check.service,
                check.status.to_string().to_uppercase()
            ));
            lines.push(format!("     Message: {}", check.message));
            lines.push(format!("     Response Time: {:.1}ms", check.response_time_ms));
            lines.push(String::new());
        }

        lines.join("\n")
    }
}
