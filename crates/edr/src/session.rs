//! Session driver - one recorder per observed vehicle, advanced once per tick
//!
//! Per tick the session feeds the pull sensors (vehicle state, perception),
//! runs the near-miss watchdog and checks whether the active event is due
//! for saving. Push sensors (cameras, range scanners) are attached by the
//! sensor factory and run on their producers' threads.

use std::path::Path;
use std::sync::Arc;

use contracts::{PerceptionSnapshot, RecorderSettings, VehicleTelemetry, WorldSnapshot};
use tracing::{error, info, warn};

use crate::buffer::{Admission, BufferSettings};
use crate::clock::Clock;
use crate::error::Result;
use crate::near_miss::{NearMiss, NearMissLogger, NearMissWatchdog};
use crate::perception::{perception_sensor, PerceptionGenerator};
use crate::recorder::{Recorder, SaveReport};
use crate::sensor::{EdrSensor, SensorHandle};
use crate::vehicle_state::VehicleStateSensor;

/// Trigger reason for the manual trigger key
pub const MANUAL_TRIGGER_REASON: &str = "Manual Trigger";

/// What happened during one [`EdrSession::tick`]
#[derive(Debug, Default)]
pub struct TickOutcome {
    pub vehicle_state: Option<Admission>,
    /// `None` when perception is disabled or throttled this tick
    pub perception: Option<Admission>,
    pub near_misses: Vec<NearMiss>,
    /// Set when the event was autosaved this tick
    pub saved: Option<SaveReport>,
}

pub struct EdrSession {
    recorder: Arc<Recorder>,
    settings: RecorderSettings,
    vehicle_state: Option<SensorHandle<VehicleTelemetry>>,
    perception: Option<PerceptionGenerator>,
    watchdog: NearMissWatchdog,
    event_ready: bool,
    /// Event whose autosave failed; not retried automatically
    autosave_failed: Option<f64>,
}

impl EdrSession {
    /// Create a session with the built-in pull sensors registered.
    ///
    /// Fails only when the configured near-miss log cannot be opened.
    pub fn new(settings: RecorderSettings, clock: Arc<dyn Clock>) -> Result<Self> {
        let mut watchdog = NearMissWatchdog::new(settings.near_miss.min_ego_speed);
        if let Some(path) = &settings.near_miss.log_file {
            let logger = NearMissLogger::open(path, &settings.near_miss.map_name)?;
            watchdog = watchdog.with_logger(logger);
        }

        let mut session = Self {
            recorder: Arc::new(Recorder::new(clock)),
            settings,
            vehicle_state: None,
            perception: None,
            watchdog,
            event_ready: false,
            autosave_failed: None,
        };
        session.install_builtin_sensors();
        Ok(session)
    }

    fn install_builtin_sensors(&mut self) {
        let buffer = self.buffer_settings();

        self.vehicle_state = self.settings.vehicle_state.then(|| {
            let sensor = VehicleStateSensor::new(buffer);
            let handle = sensor.handle();
            self.recorder.add_sensor(Box::new(sensor));
            handle
        });

        self.perception = self.settings.perception.enabled.then(|| {
            let sensor = perception_sensor(buffer);
            let handle: SensorHandle<PerceptionSnapshot> = sensor.handle();
            self.recorder.add_sensor(Box::new(sensor));
            PerceptionGenerator::new(handle, self.settings.perception.range_m)
        });
    }

    /// Event window shared by every sensor; each sensor applies its own rate
    pub fn buffer_settings(&self) -> BufferSettings {
        BufferSettings::new(
            self.settings.pre_event_seconds,
            self.settings.post_event_seconds,
            0.0,
        )
    }

    pub fn settings(&self) -> &RecorderSettings {
        &self.settings
    }

    pub fn recorder(&self) -> &Arc<Recorder> {
        &self.recorder
    }

    /// Register an externally built sensor (camera, range scanner, custom)
    pub fn add_sensor(&self, sensor: Box<dyn EdrSensor>) {
        self.recorder.add_sensor(sensor);
    }

    /// Vehicle replaced: drop every sensor and rebuild the built-in ones.
    ///
    /// Push sensors must be attached again by the caller.
    pub fn reset_sensors(&mut self) {
        self.recorder.clear();
        self.event_ready = false;
        self.autosave_failed = None;
        self.install_builtin_sensors();
        info!(sensors = self.recorder.sensor_count(), "EDR sensors rebuilt");
    }

    pub fn tick(&mut self, world: &WorldSnapshot) -> TickOutcome {
        let mut outcome = TickOutcome {
            vehicle_state: self.vehicle_state.as_ref().map(|handle| {
                handle.on_data(
                    world.timestamp,
                    VehicleTelemetry::from_kinematics(&world.kinematics),
                )
            }),
            perception: self
                .perception
                .as_mut()
                .and_then(|generator| generator.generate_data(world)),
            near_misses: self.watchdog.check(world, &self.recorder),
            saved: None,
        };

        outcome.saved = self.check_save_due(world.timestamp);
        outcome
    }

    fn check_save_due(&mut self, now: f64) -> Option<SaveReport> {
        let event = self.recorder.event()?;
        let due = event.timestamp
            + self.settings.post_event_seconds
            + self.settings.save_delay_seconds;
        if now < due {
            return None;
        }

        if self.settings.autosave && self.autosave_failed != Some(event.timestamp) {
            match self.save() {
                Ok(report) => return Some(report),
                Err(e) => {
                    error!(error = %e, "EDR autosave failed");
                    self.autosave_failed = Some(event.timestamp);
                }
            }
        }

        if !self.event_ready {
            warn!(reason = %event.reason, "EDR event ready to save");
            self.event_ready = true;
        }
        None
    }

    /// Trigger stamped with the recorder clock; `false` if an event is active
    pub fn trigger_manual(&self) -> bool {
        self.recorder.trigger(MANUAL_TRIGGER_REASON)
    }

    /// Save the active event under the configured data path
    pub fn save(&mut self) -> Result<SaveReport> {
        let data_path = self.settings.data_path.clone();
        self.save_to(&data_path)
    }

    pub fn save_to(&mut self, base_path: &Path) -> Result<SaveReport> {
        let report = self.recorder.save(base_path)?;
        self.event_ready = false;
        self.autosave_failed = None;
        Ok(report)
    }

    pub fn clear_event(&mut self) {
        self.recorder.clear_event();
        self.event_ready = false;
        self.autosave_failed = None;
    }

    /// The post-event window (plus save delay) has passed without a save
    pub fn is_event_ready(&self) -> bool {
        self.event_ready
    }

    /// Standing operator notification while an event waits to be saved
    pub fn notification(&self) -> Option<String> {
        if !self.event_ready {
            return None;
        }
        self.recorder
            .event()
            .map(|event| format!("EDR event ready ({}), save or clear it", event.reason))
    }
}
