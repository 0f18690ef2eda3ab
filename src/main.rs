//! uuidgen - Batch UUID v4 generation
//!
//! Main entry point for the command line application.
//!
//! # Overview
//!
//! The binary initializes:
//! - Configuration loading ([`ConfigManager`]) from the data directory
//! - Logging infrastructure (daily file rotation + optional stderr output)
//! - A current-thread tokio runtime (one cooperative event loop)
//! - The [`GenerationCoordinator`] with its preference store and clipboard
//!
//! # Execution Flow
//!
//! 1. Parse flags, load `uuidgen.yaml` and `UUIDGEN__*` overrides
//! 2. Initialize logging → `<data dir>/logs/uuidgen.<date>`
//! 3. Restore saved preferences, apply `--reset` and the flags as one update
//! 4. Generate, print the formatted output to stdout
//! 5. Optionally copy it, save preferences, tear down

use anyhow::{Context, Result, bail};
use clap::Parser;
use uuidgen::cli::Cli;
use uuidgen::{APP_NAME, ConfigManager, GenerationCoordinator, HealthStatus, RegenerateOutcome, VERSION};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_manager = ConfigManager::new(&cli.data_dir)?;
    config_manager.ensure_settings_file()?;
    let settings = config_manager.load_settings()?;

    let _log_guard = uuidgen::logging::setup_from_settings(
        &config_manager.log_dir(&settings),
        &settings.logging,
        cli.debug,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create async runtime")?;

    let result = runtime.block_on(run(&cli, &config_manager, &settings));

    if let Err(e) = &result {
        tracing::error!("{:#}", e);
    }
    tracing::info!("Shutdown complete");

    result
}

async fn run(cli: &Cli, config_manager: &ConfigManager, settings: &uuidgen::AppSettings) -> Result<()> {
    let coordinator =
        GenerationCoordinator::from_settings(settings, &config_manager.preferences_dir(settings));

    if cli.reset {
        coordinator.reset_preferences();
    }

    let update = cli.config_update();
    if !update.is_empty() {
        coordinator
            .update_config(update)
            .context("Invalid options")?;
    }

    let outcome = coordinator
        .regenerate()
        .await
        .context("Failed to generate identifiers")?;

    let RegenerateOutcome::Completed(result) = outcome else {
        coordinator.teardown();
        bail!("Generation was skipped");
    };

    println!("{}", result.formatted_output);

    let health = coordinator.health();
    if health.status != HealthStatus::Good {
        tracing::warn!("Performance {}: {}", health.status, health.message);
    }

    if cli.copy {
        let copied = coordinator.copy_all().await;
        if copied.success {
            eprintln!("Copied {} identifier(s) to the clipboard", result.len());
        } else {
            eprintln!("Could not copy to the clipboard");
        }
    }

    if !cli.no_save && !coordinator.flush_preferences() {
        eprintln!("Preferences could not be saved");
    }

    coordinator.teardown();
    Ok(())
}
