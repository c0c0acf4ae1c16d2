// Tourguide
// Main entry point for the tourguide binary

use clap::Parser;
use sdk::errors::{TourError, TourErrorExt};
use tour_engine::cli::{Cli, Command, KeyAction};
use tour_engine::config::Config;
use tour_engine::handlers::{
    handle_doctor, handle_key_delete, handle_key_set, handle_key_status, handle_plan, handle_run, OutputFormat,
};
use tour_engine::telemetry::{init_telemetry, init_telemetry_with_level};

/// Exit status for a run stopped with Ctrl-C
const EXIT_CANCELLED: i32 = 130;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);

        let tour_error = e.downcast_ref::<TourError>();
        if let Some(err) = tour_error {
            eprintln!("Hint: {}", err.user_hint());
        }

        let code = match tour_error {
            Some(err) if err.is_cancelled() => EXIT_CANCELLED,
            _ => 1,
        };
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log beats the config file; RUST_LOG beats both
    match &cli.log {
        Some(level) => init_telemetry_with_level(level),
        None if config.core.log_level.is_empty() => init_telemetry(),
        None => init_telemetry_with_level(&config.core.log_level),
    }

    tracing::debug!("Tourguide v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Run { tour, output } => {
            tracing::info!("Building tour for {}", tour.location);
            handle_run(tour, output, &config, format).await
        }

        Command::Plan { tour } => {
            tracing::info!("Planning tour for {}", tour.location);
            handle_plan(tour, &config, format).await
        }

        Command::Doctor => {
            tracing::info!("Running diagnostics...");
            handle_doctor(&config, format).await
        }

        Command::Key { action } => match action {
            KeyAction::Set => handle_key_set(format),
            KeyAction::Status => handle_key_status(&config, format),
            KeyAction::Delete => handle_key_delete(format),
        },
    }
}
