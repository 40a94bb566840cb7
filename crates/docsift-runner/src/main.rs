//! docsift - polling daemon that turns run folders into record files.
//!
//! # Configuration
//!
//! - `DOCSIFT_CONFIG` - Optional TOML file; otherwise `DOCSIFT_*` variables
//! - `DOCSIFT_ONCE` - Process what is ready, then exit
//! - `LOG_FORMAT=json` - JSON log lines
//! - `RUST_LOG` - Log filter overrides

use anyhow::{Context, Result};
use docsift_core::{scratch, SiftConfig};
use docsift_extractors::Capabilities;
use docsift_runner::Orchestrator;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(Level::INFO.into())
        .add_directive("docsift=debug".parse()?)
        .add_directive("docsift_runner=debug".parse()?);

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
    Ok(())
}

fn load_config() -> Result<SiftConfig> {
    let config = match std::env::var("DOCSIFT_CONFIG") {
        Ok(path) => SiftConfig::from_file(&path)
            .with_context(|| format!("loading configuration from {}", path))?,
        Err(_) => SiftConfig::from_env(),
    };
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let config = load_config()?;
    info!(
        input = %config.input_dir.display(),
        output = %config.output_dir.display(),
        work = %config.work_dir.display(),
        workers = config.workers,
        "Starting docsift"
    );

    let stale = scratch::sweep_stale(&config.scratch_root())
        .context("sweeping stale scratch directories")?;
    if !stale.is_empty() {
        info!(removed = stale.len(), "Removed stale scratch from an earlier process");
    }

    let caps = Capabilities::system();
    let missing = caps.missing();
    if !missing.is_empty() {
        warn!(
            missing = ?missing,
            "Some tools are unavailable; affected inputs will be quarantined"
        );
    }

    let once = std::env::var("DOCSIFT_ONCE").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    let mut orchestrator = Orchestrator::new(config, &caps, Arc::new(docsift_core::FsSpaceGauge));

    if once {
        let summaries = orchestrator.run_once().await;
        info!(runs = summaries.len(), "Single sweep finished");
        return Ok(());
    }

    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, finishing current run...");
        let _ = tx.send(true);
    });

    orchestrator.run(rx).await;
    info!("docsift stopped cleanly");
    Ok(())
}
