//! Headless session runner - wires config, sensors and the tick loop.
//!
//! Runs against the mock simulator: camera and lidar producers push samples
//! on their own threads while the tick loop feeds the pull sensors and the
//! near-miss watchdog.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use config_loader::LoadReport;
use edr::{Clock, EdrSession, SystemClock};
use sensor_factory::{MockSimulator, SensorFactory};
use tracing::{info, warn};

use super::mock_world::{MockWorld, EGO_ID};
use super::RunStats;

/// Runner configuration
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Loaded EDR configuration
    pub report: LoadReport,

    /// Session length
    pub duration: Duration,

    /// Manual trigger delay (None = no manual trigger)
    pub trigger_after: Option<Duration>,

    /// Pedestrian encounter delay (None = no pedestrian)
    pub vru_after: Option<f64>,

    pub ego_speed: f64,

    pub tick_rate: f64,

    /// Save a pending event when the session ends
    pub save_on_exit: bool,
}

pub struct SessionRunner {
    config: RunnerConfig,
}

impl SessionRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Run until the duration elapses or `shutdown` resolves
    pub async fn run(self, shutdown: impl std::future::Future<Output = ()>) -> Result<RunStats> {
        let started = Instant::now();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let settings = self.config.report.config.recorder.clone();

        let mut session = EdrSession::new(settings, Arc::clone(&clock))
            .context("Failed to create EDR session")?;

        let factory = SensorFactory::new(MockSimulator::new(Arc::clone(&clock)));
        let attach = factory
            .attach_all(
                EGO_ID,
                &self.config.report.config.sensors,
                session.buffer_settings(),
                session.recorder(),
            )
            .await;

        let mut stats = RunStats {
            sensors: session.recorder().sensor_count(),
            attach_failures: attach.failures.len(),
            ..Default::default()
        };
        info!(sensors = stats.sensors, "EDR session started");

        let world = MockWorld::new(clock.now(), self.config.ego_speed, self.config.vru_after);
        let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / self.config.tick_rate));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut manual_pending = self.config.trigger_after;

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping session...");
                    break;
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= self.config.duration {
                break;
            }

            if manual_pending.is_some_and(|after| elapsed >= after) {
                manual_pending = None;
                if session.trigger_manual() {
                    info!("manual trigger fired");
                }
            }

            let outcome = session.tick(&world.snapshot(clock.now()));
            stats.ticks += 1;
            stats.near_misses += outcome.near_misses.len() as u64;
            if let Some(report) = outcome.saved {
                info!(path = %report.path.display(), "event autosaved");
                stats.saves.push(report);
            }
        }

        if let Some(event) = session.recorder().event() {
            if self.config.save_on_exit {
                match session.save() {
                    Ok(report) => stats.saves.push(report),
                    Err(e) => {
                        warn!(error = %e, "save on exit failed");
                        stats.pending_event = Some(event.reason);
                    }
                }
            } else {
                if let Some(notice) = session.notification() {
                    warn!("{notice}");
                }
                stats.pending_event = Some(event.reason);
            }
        }

        session.recorder().clear();
        stats.duration = started.elapsed();
        stats.recorder = session.recorder().stats();
        Ok(stats)
    }
}
