// pipeguard-core/src/domain/monitor/metrics.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Final status of a run. `running` is not a legal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed,
}

impl From<RunOutcome> for RunStatus {
    fn from(outcome: RunOutcome) -> Self {
        match outcome {
            RunOutcome::Completed => RunStatus::Completed,
            RunOutcome::Failed => RunStatus::Failed,
        }
    }
}

/// The closed set of fields a caller may change on a live run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum MetricsUpdate {
    /// Absolute counter. Values lower than the current one are ignored.
    RecordsProcessed(u64),
    AddRecords(u64),
    /// Records rejected by the run, added to `errors_count`.
    AddErrors(u64),
    MemoryUsageMb(f64),
    CpuUsagePercent(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub pipeline_name: String,
    pub run_id: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    pub status: RunStatus,
    #[serde(default)]
    pub records_processed: u64,
    #[serde(default)]
    pub errors_count: u64,
    #[serde(default)]
    pub warnings_count: u64,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub memory_usage_mb: Option<f64>,
    #[serde(default)]
    pub cpu_usage_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl RunMetrics {
    pub fn new(
        pipeline_name: impl Into<String>,
        run_id: impl Into<String>,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            pipeline_name: pipeline_name.into(),
            run_id: run_id.into(),
            start_time,
            end_time: None,
            status: RunStatus::Running,
            records_processed: 0,
            errors_count: 0,
            warnings_count: 0,
            duration_seconds: None,
            memory_usage_mb: None,
            cpu_usage_percent: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Applies one update. Returns `false` when the update was rejected.
    pub fn apply(&mut self, update: &MetricsUpdate) -> bool {
        match *update {
            MetricsUpdate::RecordsProcessed(n) => {
                if n < self.records_processed {
                    return false;
                }
                self.records_processed = n;
            }
            MetricsUpdate::AddRecords(n) => {
                self.records_processed = self.records_processed.saturating_add(n);
            }
            MetricsUpdate::AddErrors(n) => {
                self.errors_count = self.errors_count.saturating_add(n);
            }
            MetricsUpdate::MemoryUsageMb(mb) => self.memory_usage_mb = Some(mb),
            MetricsUpdate::CpuUsagePercent(pct) => self.cpu_usage_percent = Some(pct),
        }
        true
    }

    /// Errors per processed record; `None` before any record went through.
    pub fn error_rate(&self) -> Option<f64> {
        if self.records_processed == 0 {
            return None;
        }
        Some(self.errors_count as f64 / self.records_processed as f64)
    }

    pub fn is_finished(&self) -> bool {
        self.status != RunStatus::Running
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn metrics() -> RunMetrics {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 2, 0, 0).unwrap();
        RunMetrics::new("claims_ingestion", "run-1", start)
    }

    #[test]
    fn test_records_counter_is_monotonic() {
        let mut m = metrics();
        assert!(m.apply(&MetricsUpdate::RecordsProcessed(500)));
        assert!(m.apply(&MetricsUpdate::AddRecords(250)));
        assert!(!m.apply(&MetricsUpdate::RecordsProcessed(100)));
        assert_eq!(m.records_processed, 750);
    }

    #[test]
    fn test_error_rate() {
        let mut m = metrics();
        assert_eq!(m.error_rate(), None);
        m.records_processed = 1000;
        m.errors_count = 60;
        assert_eq!(m.error_rate(), Some(0.06));
    }

    #[test]
    fn test_rejected_records_count_as_errors() {
        let mut m = metrics();
        assert!(m.apply(&MetricsUpdate::RecordsProcessed(100)));
        assert!(m.apply(&MetricsUpdate::AddErrors(100)));
        assert_eq!(m.errors_count, 100);
        assert_eq!(m.error_rate(), Some(1.0));
    }

    #[test]
    fn test_json_snapshot_shape() {
        let mut m = metrics();
        m.apply(&MetricsUpdate::MemoryUsageMb(512.0));
        let json: serde_json::Value = serde_json::from_str(&m.to_json().unwrap()).unwrap();

        assert_eq!(json["status"], "running");
        assert_eq!(json["pipeline_name"], "claims_ingestion");
        assert_eq!(json["memory_usage_mb"], 512.0);
        assert!(json["end_time"].is_null());
        assert!(json.get("attributes").is_none());

        let back: RunMetrics = serde_json::from_value(json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_update_request_is_tagged() {
        let update: MetricsUpdate =
            serde_json::from_str(r#"{"field": "cpu_usage_percent", "value": 42.5}"#).unwrap();
        assert_eq!(update, MetricsUpdate::CpuUsagePercent(42.5));

        let typo = serde_json::from_str::<MetricsUpdate>(r#"{"field": "cpu_usage", "value": 1}"#);
        assert!(typo.is_err());
    }
}
