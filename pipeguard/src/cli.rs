// pipeguard/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pipeguard")]
#[command(about = "Data quality gate, run monitor and alerting for insurance ETL batches", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text, env = "PIPEGUARD_LOG_FORMAT")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🛡️ Runs the quality gate over every configured table (monitored run + alerts)
    Check {
        /// Project directory
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Check only one table (ex: "policies")
        #[arg(long, short)]
        table: Option<String>,

        /// Run identifier (default: generated from the current time)
        #[arg(long)]
        run_id: Option<String>,
    },

    /// 🚨 Evaluates a saved run-metrics snapshot against the alert thresholds
    Alerts {
        /// RunMetrics JSON file
        #[arg(long)]
        metrics: PathBuf,

        /// Project directory (thresholds and webhook are read from it when present)
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Webhook receiving the alerts (overrides the project setting)
        #[arg(long)]
        webhook: Option<String>,

        /// Delivery deadline per alert, in seconds (1 to 300)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..=300))]
        timeout_secs: Option<u64>,
    },

    /// 🩺 Aggregates service probe results into a health report
    Health {
        /// JSON array of probe results
        #[arg(long)]
        results: PathBuf,

        /// Environment name shown in the report
        #[arg(long, short, default_value = "dev")]
        environment: String,

        /// Output format: text | json
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write the report to this file instead of stdout
        #[arg(long, short)]
        output_file: Option<PathBuf>,
    },

    /// 🌱 Scaffolds a project with the insurance policies contract
    Init {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Overwrite an existing project file
        #[arg(long)]
        force: bool,
    },

    /// 🧹 Cleans build artifacts (target/ folder)
    Clean {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,
    },
}
