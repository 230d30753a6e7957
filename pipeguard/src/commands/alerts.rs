// pipeguard/src/commands/alerts.rs
//
// USE CASE: Evaluate a saved run snapshot against the alert thresholds.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use pipeguard_core::application::AlertDispatcher;
use pipeguard_core::domain::alerting::AlertEvaluator;
use pipeguard_core::domain::monitor::RunMetrics;
use pipeguard_core::domain::project::AlertsConfig;
use pipeguard_core::infrastructure::adapters::WebhookNotifier;
use pipeguard_core::infrastructure::config::{find_main_config, load_project_config};

pub async fn execute(
    metrics_path: PathBuf,
    project_dir: PathBuf,
    webhook: Option<String>,
    timeout_secs: Option<u64>,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&metrics_path)
        .with_context(|| format!("Failed to read run metrics at {:?}", metrics_path))?;
    let metrics: RunMetrics = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse run metrics at {:?}", metrics_path))?;

    // Project settings are optional here: defaults apply outside a project.
    let settings = if find_main_config(&project_dir).is_ok() {
        load_project_config(&project_dir)
            .with_context(|| format!("Failed to load project configuration from {:?}", project_dir))?
            .alerts
    } else {
        AlertsConfig::default()
    };

    println!(
        "🔎 Evaluating run '{}' of pipeline '{}' ({})",
        metrics.run_id, metrics.pipeline_name, metrics.status
    );

    let alerts = AlertEvaluator::new(settings.thresholds.clone()).evaluate(&metrics);
    if alerts.is_empty() {
        println!("✅ No alert: run is within thresholds.");
        return Ok(());
    }

    for alert in &alerts {
        println!(
            "   🚨 {} [{}]: {}",
            alert.severity.to_string().to_uppercase(),
            alert.kind,
            alert.message
        );
    }

    let deadline = Duration::from_secs(timeout_secs.unwrap_or(settings.timeout_secs));
    let dispatcher = match webhook.or(settings.webhook_url) {
        Some(url) => {
            let notifier = WebhookNotifier::new(url, deadline).context("Failed to build webhook client")?;
            AlertDispatcher::new(Arc::new(notifier), deadline)
        }
        None => AlertDispatcher::log_only(),
    };

    let report = dispatcher.dispatch(&metrics.run_id, &alerts).await;
    if report.delivered > 0 {
        println!("📨 {} alert(s) delivered.", report.delivered);
    }
    for failure in &report.failures {
        eprintln!("   ⚠️  {} alert not delivered: {}", failure.alert_type, failure.error);
    }

    Ok(())
}
