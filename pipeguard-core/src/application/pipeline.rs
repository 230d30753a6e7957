// pipeguard-core/src/application/pipeline.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{error, info, instrument, warn};

use crate::application::dispatcher::{AlertDispatcher, DispatchReport};
use crate::domain::alerting::{Alert, AlertEvaluator, QualityThresholds};
use crate::domain::batch::Batch;
use crate::domain::monitor::{MetricsUpdate, RunMetrics, RunMonitor, RunOutcome};
use crate::domain::quality::{QualityGateConfig, QualityReport, Verdict};
use crate::error::PipeguardError;

/// Collaborators shared by every table of a run.
pub struct PipelineContext<'a> {
    pub monitor: &'a RunMonitor,
    pub evaluator: &'a AlertEvaluator,
    pub quality_thresholds: &'a QualityThresholds,
    pub dispatcher: &'a AlertDispatcher,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub report: QualityReport,
    pub metrics: RunMetrics,
    pub duplicates_removed: usize,
    pub alerts: Vec<Alert>,
    pub dispatch: DispatchReport,
}

impl PipelineOutcome {
    pub fn passed(&self) -> bool {
        self.report.passed()
    }

    pub fn summary(&self) -> TableSummary {
        TableSummary {
            table: self.report.table.clone(),
            run_id: self.metrics.run_id.clone(),
            verdict: self.report.verdict,
            records: self.report.total_records,
            duplicates_removed: self.duplicates_removed,
            violations: self.report.total_violations(),
            failures: self.report.failures.iter().map(|f| f.to_string()).collect(),
            alerts: self.alerts.len(),
            delivery_failures: self.dispatch.failures.len(),
            duration_seconds: self.metrics.duration_seconds,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSummary {
    pub table: String,
    pub run_id: String,
    pub verdict: Verdict,
    pub records: usize,
    pub duplicates_removed: usize,
    pub violations: usize,
    pub failures: Vec<String>,
    pub alerts: usize,
    pub delivery_failures: usize,
    pub duration_seconds: Option<f64>,
}

/// Content of `run_results.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub success: bool,
    pub tables: Vec<TableSummary>,
    pub errors: Vec<String>,
}

/// Validates one batch under a monitored run: start, dedupe, gate, complete,
/// then evaluate and dispatch alerts.
///
/// The gate verdict is data: a failing batch still returns `Ok`. Only a batch
/// the gate cannot interpret (or an invalid contract) is an error, and the run
/// is then closed as failed.
#[instrument(skip(ctx, config, batch), fields(table = %config.table))]
pub async fn run_quality_pipeline(
    ctx: &PipelineContext<'_>,
    config: &QualityGateConfig,
    batch: Batch,
    run_id: &str,
) -> Result<PipelineOutcome, PipeguardError> {
    let gate = config.build()?;

    let mut attributes = BTreeMap::from([("table".to_string(), config.table.clone())]);
    if let Some(source) = &config.source {
        attributes.insert("source".to_string(), source.clone());
    }
    let pipeline_name = format!("quality_{}", config.table);
    ctx.monitor.start(&pipeline_name, run_id, attributes);

    // 1. Deduplication (first occurrence wins)
    let (batch, duplicates_removed) = match &config.dedupe_key {
        Some(key) => {
            let outcome = batch.deduplicate(key);
            if outcome.removed > 0 {
                ctx.monitor.log_warning(
                    run_id,
                    &format!("Removed {} duplicate records", outcome.removed),
                    Some(key.as_str()),
                );
            }
            (outcome.batch, outcome.removed)
        }
        None => (batch, 0),
    };

    // 2. Quality gate
    let report = match gate.evaluate(&batch) {
        Ok(report) => report,
        Err(e) => {
            ctx.monitor.log_error(run_id, &e.to_string(), Some(config.table.as_str()));
            ctx.monitor.complete(run_id, RunOutcome::Failed, &[]);
            return Err(e.into());
        }
    };

    // Error rate is per record: one error per rejected row, whatever the
    // number of rules it breaks.
    ctx.monitor.update(
        run_id,
        &[
            MetricsUpdate::RecordsProcessed(report.total_records as u64),
            MetricsUpdate::AddErrors(report.rejected_records as u64),
        ],
    );
    for failure in &report.failures {
        error!(run_id, table = %config.table, "{}", failure);
    }

    // 3. Completion
    let outcome = match report.verdict {
        Verdict::Pass => RunOutcome::Completed,
        Verdict::Fail => RunOutcome::Failed,
    };
    let metrics = ctx
        .monitor
        .complete(run_id, outcome, &[])
        .ok_or_else(|| {
            PipeguardError::InternalError(format!("run '{}' disappeared before completion", run_id))
        })?;

    info!(
        verdict = %report.verdict,
        records = report.total_records,
        violations = report.total_violations(),
        "Quality gate evaluated"
    );

    // 4. Alerts
    let mut alerts = ctx.evaluator.evaluate(&metrics);
    alerts.extend(ctx.evaluator.evaluate_quality(&report, ctx.quality_thresholds));

    let dispatch = ctx.dispatcher.dispatch(run_id, &alerts).await;
    if !dispatch.all_delivered() {
        warn!(
            failed = dispatch.failures.len(),
            "Some alerts could not be delivered"
        );
    }

    Ok(PipelineOutcome {
        report,
        metrics,
        duplicates_removed,
        alerts,
        dispatch,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::alerting::AlertKind;
    use crate::domain::batch::{Value, record};
    use crate::domain::error::DomainError;
    use crate::domain::monitor::RunStatus;
    use crate::domain::quality::{CheckSpec, RuleSpec};
    use crate::ports::notifier::{AlertNotifier, DeliveryError};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    // --- MOCK NOTIFIER ---
    struct RecordingNotifier {
        sent: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl AlertNotifier for RecordingNotifier {
        fn name(&self) -> &str {
            "recording"
        }

        async fn notify(&self, _run_id: &str, alert: &Alert) -> Result<(), DeliveryError> {
            self.sent.lock().unwrap().push(alert.kind.to_string());
            Ok(())
        }
    }

    fn claims_config() -> QualityGateConfig {
        let mut config = QualityGateConfig::new("claims")
            .with_schema(["claim_id", "amount"])
            .with_unique_key("claim_id")
            .with_rule(RuleSpec::new(
                "amount_range",
                true,
                CheckSpec::Range {
                    column: "amount".into(),
                    min: 0.0,
                    max: 1_000_000.0,
                },
            ));
        config.dedupe_key = Some("claim_id".into());
        config
    }

    fn claims(amounts: &[(&str, f64)]) -> Batch {
        let records = amounts
            .iter()
            .map(|(id, amount)| record([("claim_id", Value::from(*id)), ("amount", Value::from(*amount))]))
            .collect();
        Batch::new("claims", vec![], records)
    }

    async fn run(batch: Batch) -> (Result<PipelineOutcome, PipeguardError>, RunMonitor, Vec<String>) {
        let monitor = RunMonitor::new();
        let evaluator = AlertEvaluator::default();
        let thresholds = QualityThresholds::default();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = AlertDispatcher::new(
            Arc::new(RecordingNotifier { sent: sent.clone() }),
            Duration::from_secs(1),
        );
        let ctx = PipelineContext {
            monitor: &monitor,
            evaluator: &evaluator,
            quality_thresholds: &thresholds,
            dispatcher: &dispatcher,
        };
        let result = run_quality_pipeline(&ctx, &claims_config(), batch, "run-1").await;
        let sent = sent.lock().unwrap().clone();
        (result, monitor, sent)
    }

    #[tokio::test]
    async fn test_clean_batch_completes() {
        let (result, monitor, sent) =
            run(claims(&[("CLM001", 2500.0), ("CLM002", 400.0), ("CLM001", 9.0)])).await;
        let outcome = result.unwrap();

        assert!(outcome.passed());
        assert_eq!(outcome.duplicates_removed, 1);
        assert_eq!(outcome.metrics.status, RunStatus::Completed);
        assert_eq!(outcome.metrics.records_processed, 2);
        assert_eq!(outcome.metrics.errors_count, 0);
        assert_eq!(outcome.metrics.warnings_count, 1);
        assert!(outcome.alerts.is_empty());
        assert!(sent.is_empty());
        assert!(monitor.get("run-1").is_none());
    }

    #[tokio::test]
    async fn test_failing_batch_fails_the_run_and_alerts() {
        let (result, _, sent) = run(claims(&[
            ("CLM001", 2500.0),
            ("CLM002", -10.0),
            ("CLM003", -20.0),
            ("CLM004", 100.0),
        ]))
        .await;
        let outcome = result.unwrap();

        assert!(!outcome.passed());
        assert_eq!(outcome.metrics.status, RunStatus::Failed);
        // two rejected records over 4: 50% error rate
        assert_eq!(outcome.metrics.errors_count, 2);
        assert_eq!(outcome.metrics.error_rate(), Some(0.5));
        let kinds: Vec<AlertKind> = outcome.alerts.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![AlertKind::ErrorRate, AlertKind::Validity]);
        assert_eq!(sent, vec!["error_rate", "validity"]);
        assert_eq!(outcome.dispatch.delivered, 2);

        let summary = outcome.summary();
        assert_eq!(summary.violations, 2);
        assert_eq!(summary.failures.len(), 1);
    }

    #[tokio::test]
    async fn test_every_record_rejected_raises_error_rate() {
        let rows: Vec<(String, f64)> = (0..100).map(|i| (format!("CLM{:03}", i), -1.0)).collect();
        let rows: Vec<(&str, f64)> = rows.iter().map(|(id, a)| (id.as_str(), *a)).collect();
        let (result, _, _) = run(claims(&rows)).await;
        let outcome = result.unwrap();

        assert_eq!(outcome.report.total_violations(), 100);
        assert_eq!(outcome.metrics.records_processed, 100);
        assert_eq!(outcome.metrics.errors_count, 100);
        let error_rate = outcome
            .alerts
            .iter()
            .find(|a| a.kind == AlertKind::ErrorRate)
            .unwrap();
        assert_eq!(error_rate.value, 1.0);
    }

    #[tokio::test]
    async fn test_completeness_failure_rejects_no_record() {
        let batch = Batch::new(
            "claims",
            vec![],
            vec![
                record([("claim_id", Value::from("CLM001")), ("amount", Value::from(10.0))]),
                record([("claim_id", Value::from("CLM002"))]),
            ],
        );
        let (result, _, _) = run(batch).await;
        let outcome = result.unwrap();

        assert!(!outcome.passed());
        assert_eq!(outcome.metrics.errors_count, 0);
        assert!(outcome.alerts.iter().all(|a| a.kind != AlertKind::ErrorRate));
    }

    #[tokio::test]
    async fn test_empty_batch_is_error_and_closes_run() {
        let (result, monitor, _) = run(claims(&[])).await;

        assert!(matches!(
            result,
            Err(PipeguardError::Domain(DomainError::EmptyBatch(_)))
        ));
        assert!(monitor.list_active().is_empty());
    }
}
