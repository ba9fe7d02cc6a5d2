//! netmon - periodic system metrics logger with rotating log files

use anyhow::{Context, Result};
use clap::Parser;
use netmon_core::{constants, ConfigFile};
use netmon_logs::{RotatingWriter, RotationPolicy};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod collector;
mod monitor;

use cli::Cli;
use collector::SystemMetricsCollector;
use monitor::NetworkMonitor;

const SOURCE: &str = "Main";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // Internal diagnostics go to stderr; stdout is the writer's fallback
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "netmon={0},netmon_logs={0},netmon_core={0}",
                    log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(dir) = &cli.log_dir {
        config.logging.directory = Some(dir.to_string_lossy().into_owned());
    }
    if let Some(interval) = cli.interval {
        config.monitor.interval_secs = Some(interval);
    }
    if let Some(delay) = cli.initial_delay {
        config.monitor.initial_delay_secs = Some(delay);
    }

    let policy = RotationPolicy::from(&config.logging);
    info!(
        "Logging to {} (max {} bytes, {} backups)",
        policy.active_path().display(),
        policy.max_file_size_bytes(),
        policy.max_backup_files()
    );

    let logger = Arc::new(RotatingWriter::initialize(policy));
    logger.info("Application starting", SOURCE);

    let mut monitor = NetworkMonitor::new(Arc::clone(&logger));
    monitor.add_collector(Box::new(SystemMetricsCollector::new(
        config.monitor.memory_warning_percent(),
    )));

    if cli.once {
        monitor.collect_once();
        logger.info("Single collection cycle complete.", SOURCE);
        logger.close();
        return Ok(());
    }

    monitor.start(
        Duration::from_secs(config.monitor.initial_delay_secs()),
        Duration::from_secs(config.monitor.interval_secs()),
    );
    info!("Network monitoring is running. Press Ctrl+C to stop.");

    wait_for_shutdown().await?;

    logger.info(
        "Shutdown signal received. Stopping network monitor...",
        SOURCE,
    );
    monitor.stop().await;
    logger.info("Application shut down gracefully.", SOURCE);
    logger.close();

    info!("Shutdown complete");
    Ok(())
}

/// Load the config file named on the command line, or the first one found
/// in the working directory or the user config directory. Without any,
/// defaults apply.
fn load_config(explicit: Option<&Path>) -> Result<ConfigFile> {
    if let Some(path) = explicit {
        return ConfigFile::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()));
    }

    let mut search = vec![std::env::current_dir()?];
    search.extend(constants::user_config_dir());

    for dir in search {
        if !constants::CONFIG_FILES
            .iter()
            .any(|name| dir.join(name).exists())
        {
            continue;
        }
        let (config, path) = ConfigFile::find_and_load(&dir)?;
        info!("Using config {}", path.display());
        return Ok(config);
    }

    debug!("No config file found, using defaults");
    Ok(ConfigFile::default())
}

#[cfg(unix)]
async fn wait_for_shutdown() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down...");
    Ok(())
}
