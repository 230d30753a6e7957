// pipeguard-core/src/domain/alerting/evaluator.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::alerting::thresholds::{AlertThresholds, QualityThresholds};
use crate::domain::monitor::RunMetrics;
use crate::domain::quality::QualityReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Duration,
    ErrorRate,
    Memory,
    Cpu,
    Completeness,
    Uniqueness,
    Validity,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            AlertKind::Duration => "duration",
            AlertKind::ErrorRate => "error_rate",
            AlertKind::Memory => "memory",
            AlertKind::Cpu => "cpu",
            AlertKind::Completeness => "completeness",
            AlertKind::Uniqueness => "uniqueness",
            AlertKind::Validity => "validity",
        };
        f.write_str(tag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertSeverity::Warning => f.write_str("warning"),
            AlertSeverity::Critical => f.write_str("critical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
    pub value: f64,
    pub threshold: f64,
}

/// Turns run metrics and quality reports into alerts. Pure: never touches the
/// monitor and never sends anything.
#[derive(Debug, Clone, Default)]
pub struct AlertEvaluator {
    thresholds: AlertThresholds,
}

impl AlertEvaluator {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// Alerts come out in a fixed order: duration, error rate, memory, CPU.
    pub fn evaluate(&self, metrics: &RunMetrics) -> Vec<Alert> {
        let t = &self.thresholds;
        let mut alerts = Vec::new();

        if let Some(seconds) = metrics.duration_seconds {
            let limit = t.max_duration_minutes * 60.0;
            if seconds > limit {
                alerts.push(Alert {
                    kind: AlertKind::Duration,
                    severity: AlertSeverity::Warning,
                    message: format!(
                        "Pipeline {} has been running for {:.1} minutes",
                        metrics.pipeline_name,
                        seconds / 60.0
                    ),
                    value: seconds,
                    threshold: limit,
                });
            }
        }

        if let Some(rate) = metrics.error_rate() {
            if rate > t.max_error_rate {
                alerts.push(Alert {
                    kind: AlertKind::ErrorRate,
                    severity: AlertSeverity::Critical,
                    message: format!(
                        "High error rate: {:.2}% in pipeline {}",
                        rate * 100.0,
                        metrics.pipeline_name
                    ),
                    value: rate,
                    threshold: t.max_error_rate,
                });
            }
        }

        if let Some(mb) = metrics.memory_usage_mb {
            if mb > t.max_memory_usage_mb {
                alerts.push(Alert {
                    kind: AlertKind::Memory,
                    severity: AlertSeverity::Warning,
                    message: format!(
                        "High memory usage: {:.1}MB in pipeline {}",
                        mb, metrics.pipeline_name
                    ),
                    value: mb,
                    threshold: t.max_memory_usage_mb,
                });
            }
        }

        if let Some(pct) = metrics.cpu_usage_percent {
            if pct > t.max_cpu_usage_percent {
                alerts.push(Alert {
                    kind: AlertKind::Cpu,
                    severity: AlertSeverity::Warning,
                    message: format!(
                        "High CPU usage: {:.1}% in pipeline {}",
                        pct, metrics.pipeline_name
                    ),
                    value: pct,
                    threshold: t.max_cpu_usage_percent,
                });
            }
        }

        alerts
    }

    /// One alert per report aggregate under its threshold. Within 90% of the
    /// threshold is a warning, further below is critical.
    pub fn evaluate_quality(
        &self,
        report: &QualityReport,
        thresholds: &QualityThresholds,
    ) -> Vec<Alert> {
        let scores = [
            (AlertKind::Completeness, report.overall_completeness(), thresholds.completeness),
            (AlertKind::Uniqueness, report.key_uniqueness(), thresholds.uniqueness),
            (AlertKind::Validity, report.overall_validity(), thresholds.validity),
        ];

        scores
            .into_iter()
            .filter_map(|(kind, value, threshold)| {
                let value = value?;
                if value >= threshold {
                    return None;
                }
                let severity = if value >= threshold * 0.9 {
                    AlertSeverity::Warning
                } else {
                    AlertSeverity::Critical
                };
                Some(Alert {
                    kind,
                    severity,
                    message: format!(
                        "{} of table {} is {:.2}%, below {:.2}%",
                        kind,
                        report.table,
                        value * 100.0,
                        threshold * 100.0
                    ),
                    value,
                    threshold,
                })
            })
            .collect()
    }
}
