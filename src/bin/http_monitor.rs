//! HTTP Monitor binary entry point.
//!
//! Loads the service configuration, starts one background monitor per
//! definition and runs until SIGINT or SIGTERM, then stops every monitor,
//! letting ticks in progress finish.
//!
//! # Usage
//!
//! ```text
//! http-monitor --config monitors.json
//! http-monitor --config monitors.json --once
//! ```
//!
//! With `--once` every monitor runs a single tick immediately and the
//! process exits non-zero if any monitoring chain failed.

use clap::Parser;
use http_monitor::config::{load_config, LogFormat, ServiceConfig};
use http_monitor::executor::init_shared_client;
use http_monitor::scheduler::MonitorSet;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "http-monitor", version, about = "Periodic HTTP request chain monitor")]
struct Cli {
    /// Path to the JSON service configuration.
    #[arg(short, long)]
    config: PathBuf,

    /// Run every monitor once and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("http-monitor: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config);

    let client = match init_shared_client(&config.client) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("http-monitor: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if config.monitors.is_empty() {
        warn!(path = %cli.config.display(), "no monitors configured");
    }

    let mut monitors = match MonitorSet::new(config.monitors, &client) {
        Ok(monitors) => monitors,
        Err(e) => {
            eprintln!("http-monitor: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if cli.once {
        let mut failed = 0;
        for monitor in monitors.iter() {
            if !monitor.run_once().await.is_healthy() {
                failed += 1;
            }
        }

        info!(monitors = monitors.len(), failed, "single run finished");
        return if failed == 0 {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    monitors.start_all();

    shutdown_signal().await;

    info!("shutting down");
    monitors.stop_all().await;

    ExitCode::SUCCESS
}

fn init_logging(config: &ServiceConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Waits for SIGINT or SIGTERM (Ctrl+C on Windows).
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigint, mut sigterm) =
            match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
                (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
                (Err(e), _) | (_, Err(e)) => {
                    warn!(error = %e, "failed to install signal handlers, falling back to Ctrl+C");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigint.recv() => info!("received SIGINT"),
            _ = sigterm.recv() => info!("received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            return;
        }
        info!("received Ctrl+C");
    }
}
