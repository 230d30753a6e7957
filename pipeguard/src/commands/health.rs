// pipeguard/src/commands/health.rs
//
// USE CASE: Aggregate probe results into a health report.

use std::path::PathBuf;

use anyhow::Context;
use pipeguard_core::domain::health::{HealthCheckResult, HealthReport, Probe};
use pipeguard_core::infrastructure::fs::atomic_write;

use crate::cli::OutputFormat;

pub fn execute(
    results: PathBuf,
    environment: String,
    format: OutputFormat,
    output_file: Option<PathBuf>,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&results)
        .with_context(|| format!("Failed to read probe results at {:?}", results))?;
    let probes: Vec<Probe> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse probe results at {:?}", results))?;

    let checks: Vec<HealthCheckResult> = probes.into_iter().map(Probe::into_result).collect();
    let report = HealthReport::from_results(environment, chrono::Utc::now(), checks);

    let output = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&report)?,
        OutputFormat::Text => report.render_text(),
    };

    match output_file {
        Some(path) => {
            atomic_write(&path, &output)
                .with_context(|| format!("Failed to write health report to {:?}", path))?;
            println!("Health check report written to {}", path.display());
        }
        None => println!("{}", output),
    }

    let code = report.exit_code();
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
