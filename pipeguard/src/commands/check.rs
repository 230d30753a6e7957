// pipeguard/src/commands/check.rs
//
// USE CASE: Run the quality gate over the configured tables.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use comfy_table::{Table, presets::UTF8_FULL};
use pipeguard_core::application::{
    AlertDispatcher, PipelineContext, RunResult, run_quality_pipeline,
};
use pipeguard_core::domain::alerting::AlertEvaluator;
use pipeguard_core::domain::monitor::RunMonitor;
use pipeguard_core::domain::project::ProjectConfig;
use pipeguard_core::domain::quality::{QualityGateConfig, QualityReport, Verdict};
use pipeguard_core::infrastructure::adapters::{WebhookNotifier, load_batch};
use pipeguard_core::infrastructure::config::load_project_config;
use pipeguard_core::infrastructure::fs::save_json;
use tracing::{info, warn};

pub async fn execute(
    project_dir: PathBuf,
    table: Option<String>,
    run_id: Option<String>,
) -> anyhow::Result<()> {
    let start = std::time::Instant::now();

    // A. Load the Config (Infra)
    println!("⚙️  Loading configuration...");
    let config = load_project_config(&project_dir).with_context(|| {
        format!(
            "Failed to load project configuration from {:?}",
            project_dir
        )
    })?;
    println!(
        "   Project: {} (v{}, {})",
        config.name, config.version, config.environment
    );

    let tables = select_tables(&config, table.as_deref())?;

    // B. Wire the collaborators
    let monitor = RunMonitor::new();
    let evaluator = AlertEvaluator::new(config.alerts.thresholds.clone());
    let dispatcher = build_dispatcher(&config)?;
    let ctx = PipelineContext {
        monitor: &monitor,
        evaluator: &evaluator,
        quality_thresholds: &config.alerts.quality,
        dispatcher: &dispatcher,
    };

    let base_run_id =
        run_id.unwrap_or_else(|| chrono::Utc::now().format("%Y%m%dT%H%M%S").to_string());
    let target_dir = project_dir.join(&config.target_path);

    // C. Run each table
    let mut summaries = Vec::new();
    let mut errors = Vec::new();

    for table in tables {
        println!("\n🛡️  Checking table '{}'...", table.table);
        let table_run_id = format!("{}-{}", base_run_id, table.table);
        info!(table = %table.table, run_id = %table_run_id, "Checking table");

        let Some(source) = &table.source else {
            warn!(table = %table.table, "No source configured");
            eprintln!("   ⚠️  No source configured for '{}', skipped", table.table);
            errors.push(format!("{}: no source configured", table.table));
            continue;
        };

        let batch = match load_batch(&project_dir.join(source), &table.table, &table.schema) {
            Ok(batch) => batch,
            Err(e) => {
                warn!(table = %table.table, source = %source, error = %e, "Batch could not be read");
                eprintln!("   💥 Cannot read {}: {}", source, e);
                errors.push(format!("{}: {}", table.table, e));
                continue;
            }
        };

        match run_quality_pipeline(&ctx, table, batch, &table_run_id).await {
            Ok(outcome) => {
                print_report(&outcome.report);
                for alert in &outcome.alerts {
                    println!(
                        "   🚨 {}: {}",
                        alert.severity.to_string().to_uppercase(),
                        alert.message
                    );
                }
                if outcome.passed() {
                    println!("   ✅ {}", outcome.report.summary_line());
                } else {
                    println!("   ❌ {}", outcome.report.summary_line());
                    for failure in &outcome.report.failures {
                        println!("      - {}", failure);
                    }
                }

                let report_path = target_dir
                    .join("quality")
                    .join(format!("{}.json", table.table));
                save_json(&report_path, &outcome.report)
                    .with_context(|| format!("Failed to write {:?}", report_path))?;
                summaries.push(outcome.summary());
            }
            Err(e) => {
                eprintln!("   💥 Quality gate error: {}", e);
                errors.push(format!("{}: {}", table.table, e));
            }
        }
    }

    // D. Finalize
    let success = errors.is_empty() && summaries.iter().all(|s| s.verdict == Verdict::Pass);
    let result = RunResult {
        success,
        tables: summaries,
        errors,
    };
    save_json(target_dir.join("run_results.json"), &result)
        .context("Failed to write run_results.json")?;

    if result.success {
        println!(
            "\n✨ SUCCESS! {} table(s) passed in {:.2?}",
            result.tables.len(),
            start.elapsed()
        );
    } else {
        let failed = result
            .tables
            .iter()
            .filter(|s| s.verdict == Verdict::Fail)
            .count();
        eprintln!(
            "\n❌ FAILURE. {} table(s) failed the gate, {} error(s).",
            failed,
            result.errors.len()
        );
        std::process::exit(1);
    }

    Ok(())
}

fn select_tables<'a>(
    config: &'a ProjectConfig,
    only: Option<&str>,
) -> anyhow::Result<Vec<&'a QualityGateConfig>> {
    if config.tables.is_empty() {
        bail!("No tables configured in project '{}'", config.name);
    }
    match only {
        Some(name) => match config.table(name) {
            Some(t) => Ok(vec![t]),
            None => bail!("Table '{}' is not configured", name),
        },
        None => Ok(config.tables.iter().collect()),
    }
}

fn build_dispatcher(config: &ProjectConfig) -> anyhow::Result<AlertDispatcher> {
    let timeout = Duration::from_secs(config.alerts.timeout_secs);
    match &config.alerts.webhook_url {
        Some(url) => {
            println!("   Alerts: webhook 🔔");
            let notifier = WebhookNotifier::new(url.clone(), timeout)
                .context("Failed to build webhook client")?;
            Ok(AlertDispatcher::new(Arc::new(notifier), timeout))
        }
        None => Ok(AlertDispatcher::log_only()),
    }
}

fn print_report(report: &QualityReport) {
    let mut columns = Table::new();
    columns
        .load_preset(UTF8_FULL)
        .set_header(vec!["Column", "Non-null", "Distinct", "Completeness", "Uniqueness"]);
    for c in &report.columns {
        columns.add_row(vec![
            c.column.clone(),
            c.non_null.to_string(),
            c.distinct.to_string(),
            format!("{:.2}%", c.completeness * 100.0),
            format!("{:.2}%", c.uniqueness * 100.0),
        ]);
    }
    println!("{columns}");

    let mut rules = Table::new();
    rules
        .load_preset(UTF8_FULL)
        .set_header(vec!["Rule", "Category", "Mandatory", "Checked", "Violations"]);
    for r in report.rules.iter().filter(|r| r.checked > 0 || r.violation_count > 0) {
        rules.add_row(vec![
            r.rule.clone(),
            format!("{:?}", r.category),
            if r.mandatory { "yes" } else { "no" }.to_string(),
            r.checked.to_string(),
            r.violation_count.to_string(),
        ]);
    }
    println!("{rules}");
}

