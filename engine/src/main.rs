// Waypoint robot task-planning agent
// Main entry point for the waypoint binary

use clap::Parser;
use waypoint_engine::cli::{Cli, Command};
use waypoint_engine::config::Config;
use waypoint_engine::handlers::{
    handle_doctor, handle_execute, handle_history, handle_plan, handle_run, handle_skills,
    OutputFormat,
};
use waypoint_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // Initialize telemetry once the effective log level is known:
    // --log beats the config level; RUST_LOG beats both
    match cli.log.as_deref() {
        Some(level) => init_telemetry_with_level(level),
        None => init_telemetry_with_level(&config.core.log_level),
    }

    tracing::info!("Waypoint v{}", env!("CARGO_PKG_VERSION"));

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Handle commands
    match cli.command {
        Command::Run { command } => {
            tracing::info!("Planning command: {}", command);
            handle_run(command, &config, format).await
        }

        Command::Plan { command } => {
            tracing::info!("Decomposing command: {}", command);
            handle_plan(command, &config, format).await
        }

        Command::Execute { command } => {
            tracing::info!("Planning and executing command: {}", command);
            handle_execute(command, &config, format).await
        }

        Command::History { limit } => {
            tracing::info!("Showing last {} runs", limit);
            handle_history(limit, &config, format).await
        }

        Command::Doctor => {
            tracing::info!("Running diagnostics...");
            handle_doctor(&config, format).await
        }

        Command::Skills => handle_skills(&config, format).await,
    }
}
