//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::session::{RunnerConfig, SessionRunner};

/// Execute the `run` command
pub async fn run_session(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }
    if args.duration <= 0.0 || args.tick_rate <= 0.0 {
        anyhow::bail!("--duration and --tick-rate must be positive");
    }
    if args.trigger_after.is_some_and(|t| !(t >= 0.0)) {
        anyhow::bail!("--trigger-after must not be negative");
    }

    let mut report = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    for skipped in &report.skipped {
        warn!(entry = %skipped, "sensor entry skipped");
    }
    for warning in &report.warnings {
        warn!("{warning}");
    }

    // Apply CLI overrides
    let recorder = &mut report.config.recorder;
    if args.autosave {
        recorder.autosave = true;
    }
    if let Some(ref path) = args.data_path {
        info!(path = %path.display(), "Overriding data path from CLI");
        recorder.data_path = path.clone();
    }

    info!(
        cameras = report.config.sensors.cameras.len(),
        lidars3d = report.config.sensors.lidars3d.len(),
        pre_event_s = report.config.recorder.pre_event_seconds,
        post_event_s = report.config.recorder.post_event_seconds,
        data_path = %report.config.recorder.data_path.display(),
        "Configuration loaded"
    );

    let runner = SessionRunner::new(RunnerConfig {
        report,
        duration: Duration::from_secs_f64(args.duration),
        trigger_after: args.trigger_after.map(Duration::from_secs_f64),
        vru_after: args.vru_after,
        ego_speed: args.ego_speed,
        tick_rate: args.tick_rate,
        save_on_exit: args.save_on_exit,
    });

    info!("Starting session...");
    let stats = runner
        .run(shutdown_signal())
        .await
        .context("Session failed")?;

    info!(
        ticks = stats.ticks,
        saves = stats.saves.len(),
        duration_secs = stats.duration.as_secs_f64(),
        "Session completed"
    );
    stats.print_summary();

    info!("CARLA EDR finished");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM. A handler that cannot be installed never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
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
