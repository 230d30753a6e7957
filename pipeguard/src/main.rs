// pipeguard/src/main.rs

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, LogFormat};

fn init_tracing(format: LogFormat) {
    // RUST_LOG=debug pipeguard check ... pour voir les détails
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Commands::Check {
            project_dir,
            table,
            run_id,
        } => commands::check::execute(project_dir, table, run_id).await,

        Commands::Alerts {
            metrics,
            project_dir,
            webhook,
            timeout_secs,
        } => commands::alerts::execute(metrics, project_dir, webhook, timeout_secs).await,

        Commands::Health {
            results,
            environment,
            format,
            output_file,
        } => commands::health::execute(results, environment, format, output_file),

        Commands::Init { project_dir, force } => commands::init::execute(project_dir, force),

        Commands::Clean { project_dir } => commands::clean::execute(project_dir),
    }
}
