// pipeguard-core/src/domain/monitor/run_monitor.rs

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use tracing::{error, info, warn};

use crate::domain::monitor::metrics::{MetricsUpdate, RunMetrics, RunOutcome};

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Live table of running pipeline runs.
///
/// Owned by whoever drives the runs and shared by reference (or `Arc`).
/// Every mutation goes through one lock, so concurrent callers are serialized.
/// Callers only ever receive copies of the stored metrics.
pub struct RunMonitor {
    runs: Mutex<HashMap<String, RunMetrics>>,
    clock: Clock,
}

impl Default for RunMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RunMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunMonitor")
            .field("active_runs", &self.table().len())
            .finish()
    }
}

impl RunMonitor {
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    pub fn with_clock<F>(clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        Self {
            runs: Mutex::new(HashMap::new()),
            clock: Box::new(clock),
        }
    }

    // A panic while holding the lock leaves plain data behind; keep serving it.
    fn table(&self) -> MutexGuard<'_, HashMap<String, RunMetrics>> {
        self.runs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn start(
        &self,
        pipeline_name: &str,
        run_id: &str,
        attributes: BTreeMap<String, String>,
    ) -> RunMetrics {
        let mut metrics = RunMetrics::new(pipeline_name, run_id, (self.clock)());
        metrics.attributes = attributes;

        let previous = self.table().insert(run_id.to_string(), metrics.clone());
        if let Some(previous) = previous {
            warn!(
                run_id,
                previous_pipeline = %previous.pipeline_name,
                "Run id already active, replacing its metrics"
            );
        }

        info!(pipeline = pipeline_name, run_id, "Started pipeline run");
        metrics
    }

    pub fn update(&self, run_id: &str, updates: &[MetricsUpdate]) -> Option<RunMetrics> {
        let mut table = self.table();
        let Some(metrics) = table.get_mut(run_id) else {
            warn!(run_id, "Update for unknown run ignored");
            return None;
        };
        apply_all(metrics, updates);
        Some(metrics.clone())
    }

    pub fn log_error(&self, run_id: &str, description: &str, context: Option<&str>) {
        let known = match self.table().get_mut(run_id) {
            Some(metrics) => {
                metrics.errors_count += 1;
                true
            }
            None => false,
        };
        error!(run_id, known_run = known, context = context.unwrap_or(""), "{}", description);
    }

    pub fn log_warning(&self, run_id: &str, message: &str, context: Option<&str>) {
        let known = match self.table().get_mut(run_id) {
            Some(metrics) => {
                metrics.warnings_count += 1;
                true
            }
            None => false,
        };
        warn!(run_id, known_run = known, context = context.unwrap_or(""), "{}", message);
    }

    /// Finalizes a run and drops it from the live table.
    pub fn complete(
        &self,
        run_id: &str,
        outcome: RunOutcome,
        updates: &[MetricsUpdate],
    ) -> Option<RunMetrics> {
        let Some(mut metrics) = self.table().remove(run_id) else {
            warn!(run_id, "Completion for unknown run ignored");
            return None;
        };

        let end = (self.clock)();
        metrics.end_time = Some(end);
        metrics.status = outcome.into();
        metrics.duration_seconds = Some((end - metrics.start_time).num_milliseconds() as f64 / 1000.0);
        apply_all(&mut metrics, updates);

        info!(
            pipeline = %metrics.pipeline_name,
            run_id,
            status = %metrics.status,
            duration_seconds = metrics.duration_seconds,
            records = metrics.records_processed,
            errors = metrics.errors_count,
            "Pipeline run finished"
        );
        Some(metrics)
    }

    pub fn get(&self, run_id: &str) -> Option<RunMetrics> {
        self.table().get(run_id).cloned()
    }

    /// Running runs, oldest first.
    pub fn list_active(&self) -> Vec<RunMetrics> {
        let mut runs: Vec<RunMetrics> = self.table().values().cloned().collect();
        runs.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then_with(|| a.run_id.cmp(&b.run_id))
        });
        runs
    }

    pub fn export_json(&self, run_id: &str) -> Option<String> {
        let metrics = self.get(run_id)?;
        match metrics.to_json() {
            Ok(json) => Some(json),
            Err(e) => {
                warn!(run_id, error = %e, "Could not serialize run metrics");
                None
            }
        }
    }
}

fn apply_all(metrics: &mut RunMetrics, updates: &[MetricsUpdate]) {
    for update in updates {
        if !metrics.apply(update) {
            warn!(
                run_id = %metrics.run_id,
                current = metrics.records_processed,
                update = ?update,
                "Records counter cannot go backwards, update ignored"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::monitor::metrics::RunStatus;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    /// Monitor whose clock only moves when the test says so.
    fn manual_clock() -> (RunMonitor, Arc<Mutex<DateTime<Utc>>>) {
        let now = Arc::new(Mutex::new(Utc.with_ymd_and_hms(2024, 1, 15, 2, 0, 0).unwrap()));
        let handle = now.clone();
        let monitor = RunMonitor::with_clock(move || *handle.lock().unwrap());
        (monitor, now)
    }

    #[test]
    fn test_lifecycle() {
        let (monitor, now) = manual_clock();

        monitor.start("p", "r1", BTreeMap::new());
        assert_eq!(monitor.get("r1").unwrap().status, RunStatus::Running);

        *now.lock().unwrap() += Duration::seconds(3700);
        let done = monitor.complete("r1", RunOutcome::Completed, &[]).unwrap();

        assert_eq!(done.status, RunStatus::Completed);
        assert_eq!(done.duration_seconds, Some(3700.0));
        assert!(done.end_time.is_some());
        assert!(monitor.get("r1").is_none());
        assert!(monitor.complete("r1", RunOutcome::Completed, &[]).is_none());
    }

    #[test]
    fn test_unknown_run_is_noop() {
        let monitor = RunMonitor::new();

        assert!(monitor.update("ghost", &[MetricsUpdate::AddRecords(5)]).is_none());
        monitor.log_error("ghost", "boom", None);
        monitor.log_warning("ghost", "careful", Some("stage=load"));

        assert!(monitor.get("ghost").is_none());
        assert!(monitor.list_active().is_empty());
    }

    #[test]
    fn test_update_and_counters() {
        let monitor = RunMonitor::new();
        monitor.start("claims_ingestion", "r1", BTreeMap::new());

        monitor.update(
            "r1",
            &[
                MetricsUpdate::RecordsProcessed(1000),
                MetricsUpdate::MemoryUsageMb(2048.0),
            ],
        );
        monitor.log_error("r1", "bad row", Some("row=12"));
        monitor.log_error("r1", "bad row", None);
        monitor.log_warning("r1", "slow stage", None);

        let m = monitor.get("r1").unwrap();
        assert_eq!(m.records_processed, 1000);
        assert_eq!(m.memory_usage_mb, Some(2048.0));
        assert_eq!(m.errors_count, 2);
        assert_eq!(m.warnings_count, 1);
    }

    #[test]
    fn test_complete_merges_final_fields() {
        let monitor = RunMonitor::new();
        monitor.start("p", "r1", BTreeMap::new());
        let done = monitor
            .complete(
                "r1",
                RunOutcome::Failed,
                &[MetricsUpdate::RecordsProcessed(42), MetricsUpdate::CpuUsagePercent(95.0)],
            )
            .unwrap();

        assert_eq!(done.status, RunStatus::Failed);
        assert_eq!(done.records_processed, 42);
        assert_eq!(done.cpu_usage_percent, Some(95.0));
    }

    #[test]
    fn test_restart_replaces_previous_entry() {
        let monitor = RunMonitor::new();
        monitor.start("p", "r1", BTreeMap::new());
        monitor.update("r1", &[MetricsUpdate::AddRecords(10)]);

        let attrs = BTreeMap::from([("source".to_string(), "s3".to_string())]);
        monitor.start("p2", "r1", attrs);

        let m = monitor.get("r1").unwrap();
        assert_eq!(m.pipeline_name, "p2");
        assert_eq!(m.records_processed, 0);
        assert_eq!(m.attributes["source"], "s3");
        assert_eq!(monitor.list_active().len(), 1);
    }

    #[test]
    fn test_snapshots_are_copies() {
        let monitor = RunMonitor::new();
        monitor.start("p", "r1", BTreeMap::new());

        let mut snapshot = monitor.get("r1").unwrap();
        snapshot.errors_count = 99;

        assert_eq!(monitor.get("r1").unwrap().errors_count, 0);
    }

    #[test]
    fn test_list_active_is_ordered() {
        let (monitor, now) = manual_clock();
        monitor.start("p", "b", BTreeMap::new());
        monitor.start("p", "a", BTreeMap::new());
        *now.lock().unwrap() -= Duration::minutes(5);
        monitor.start("p", "c", BTreeMap::new());

        let ids: Vec<String> = monitor.list_active().into_iter().map(|m| m.run_id).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_export_json() {
        let monitor = RunMonitor::new();
        monitor.start("p", "r1", BTreeMap::new());
        let json = monitor.export_json("r1").unwrap();
        assert!(json.contains("\"run_id\": \"r1\""));
        assert!(monitor.export_json("missing").is_none());
    }

    #[test]
    fn test_concurrent_updates_are_serialized() {
        let monitor = Arc::new(RunMonitor::new());
        monitor.start("p", "r1", BTreeMap::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let monitor = monitor.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        monitor.update("r1", &[MetricsUpdate::AddRecords(1)]);
                        monitor.log_error("r1", "row rejected", None);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let m = monitor.get("r1").unwrap();
        assert_eq!(m.records_processed, 800);
        assert_eq!(m.errors_count, 800);
    }
}
