//! Recorder - owns the sensors and the single Idle/Triggered state machine
//!
//! ```text
//! Idle --trigger--> Triggered --save / clear_event--> Idle
//! ```
//!
//! All transitions go through one state lock, so "first trigger wins" holds
//! even when the watchdog and a manual key press trigger in the same tick.
//! Lock order is always state, then sensors. Producers only ever take the
//! per-sensor buffer locks.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::{DateTime, Local};
use contracts::SensorKind;
use observability::metrics as edr_metrics;
use observability::{EdrMetricsAggregator, EdrMetricsSummary};
use tracing::{debug, error, info, instrument, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{EdrError, Result};
use crate::sensor::{BufferedCounts, EdrSensor};

/// Sidecar file holding the trigger reason
pub const REASON_FILE: &str = "reason.txt";

const EVENT_DIR_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// In-process counters; see [`Recorder::stats`]
pub type RecorderStats = EdrMetricsSummary;

/// The active event
#[derive(Debug, Clone, PartialEq)]
pub struct TriggeredEvent {
    pub timestamp: f64,
    pub reason: String,
}

/// Result of a successful [`Recorder::save`]
#[derive(Debug, Clone, PartialEq)]
pub struct SaveReport {
    /// Event folder that was written
    pub path: PathBuf,
    pub reason: String,
    /// Samples written across all sensors
    pub samples_written: usize,
    pub sensors: usize,
}

/// Summary of one registered sensor
#[derive(Debug, Clone, PartialEq)]
pub struct SensorInfo {
    pub id: String,
    pub kind: SensorKind,
    pub buffered: BufferedCounts,
}

/// Event data recorder for one observed vehicle
pub struct Recorder {
    state: Mutex<Option<TriggeredEvent>>,
    sensors: Mutex<Vec<Box<dyn EdrSensor>>>,
    clock: Arc<dyn Clock>,
    stats: Mutex<EdrMetricsAggregator>,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl Recorder {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(None),
            sensors: Mutex::new(Vec::new()),
            clock,
            stats: Mutex::new(EdrMetricsAggregator::new()),
        }
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    fn state(&self) -> MutexGuard<'_, Option<TriggeredEvent>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sensors(&self) -> MutexGuard<'_, Vec<Box<dyn EdrSensor>>> {
        self.sensors.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stats_mut(&self) -> MutexGuard<'_, EdrMetricsAggregator> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a sensor. Sensors are saved in registration order.
    pub fn add_sensor(&self, sensor: Box<dyn EdrSensor>) {
        info!(sensor_id = %sensor.id(), kind = %sensor.kind(), "EDR sensor added");
        self.sensors().push(sensor);
    }

    pub fn sensor_count(&self) -> usize {
        self.sensors().len()
    }

    pub fn sensors_info(&self) -> Vec<SensorInfo> {
        self.sensors()
            .iter()
            .map(|s| SensorInfo {
                id: s.id().to_string(),
                kind: s.kind().clone(),
                buffered: s.buffered(),
            })
            .collect()
    }

    /// Drop every sensor and reset event state (vehicle replaced)
    #[instrument(name = "edr_clear", skip(self))]
    pub fn clear(&self) {
        let mut state = self.state();
        let mut sensors = self.sensors();
        for sensor in sensors.iter() {
            sensor.stop();
        }
        let removed = sensors.len();
        sensors.clear();
        *state = None;
        info!(removed, "EDR sensors cleared");
    }

    /// Trigger an event stamped with the recorder clock.
    ///
    /// Returns `false` when an event is already active.
    pub fn trigger(&self, reason: &str) -> bool {
        let now = self.clock.now();
        self.trigger_at(reason, now)
    }

    /// Trigger an event at a caller supplied timestamp
    #[instrument(name = "edr_trigger", skip(self))]
    pub fn trigger_at(&self, reason: &str, timestamp: f64) -> bool {
        let mut state = self.state();
        if let Some(active) = state.as_ref() {
            debug!(active = %active.reason, "trigger ignored, event already active");
            edr_metrics::record_trigger_ignored();
            self.stats_mut().on_trigger(false);
            return false;
        }

        *state = Some(TriggeredEvent {
            timestamp,
            reason: reason.to_string(),
        });
        for sensor in self.sensors().iter() {
            sensor.on_event_trigger(timestamp);
        }

        info!(timestamp, "EDR event triggered");
        edr_metrics::record_event_triggered();
        self.stats_mut().on_trigger(true);
        true
    }

    pub fn has_triggered(&self) -> bool {
        self.state().is_some()
    }

    pub fn event(&self) -> Option<TriggeredEvent> {
        self.state().clone()
    }

    /// Abandon the active event; no-op when idle
    #[instrument(name = "edr_clear_event", skip(self))]
    pub fn clear_event(&self) {
        let mut state = self.state();
        if state.is_none() {
            return;
        }
        Self::reset_event(&mut state, &self.sensors());
        info!("EDR event cleared");
    }

    fn reset_event(state: &mut Option<TriggeredEvent>, sensors: &[Box<dyn EdrSensor>]) {
        for sensor in sensors {
            sensor.clear_event();
        }
        *state = None;
    }

    /// Persist the active event under `base_path/<event date-time>/` and
    /// return to Idle.
    ///
    /// Every sensor is attempted even if one fails. On failure the first
    /// error is returned and the event stays active with its buffers intact,
    /// so the save can be retried or the event cleared.
    #[instrument(name = "edr_save", skip(self, base_path), fields(base = %base_path.display()))]
    pub fn save(&self, base_path: &Path) -> Result<SaveReport> {
        let started = Instant::now();
        let mut state = self.state();
        let Some(event) = state.clone() else {
            return Err(EdrError::NotTriggered);
        };

        let sensors = self.sensors();
        let mut written = 0;
        let result = Self::write_event(&event, base_path, &sensors, &mut written);

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        edr_metrics::record_save(result.is_ok(), elapsed_ms);
        self.stats_mut().on_save(result.is_ok(), elapsed_ms, written);

        match result {
            Ok(path) => {
                Self::reset_event(&mut state, &sensors);
                info!(
                    path = %path.display(),
                    samples = written,
                    elapsed_ms,
                    "EDR event saved"
                );
                Ok(SaveReport {
                    path,
                    reason: event.reason,
                    samples_written: written,
                    sensors: sensors.len(),
                })
            }
            Err(e) => {
                error!(error = %e, "EDR save failed, event kept");
                Err(e)
            }
        }
    }

    fn write_event(
        event: &TriggeredEvent,
        base_path: &Path,
        sensors: &[Box<dyn EdrSensor>],
        written: &mut usize,
    ) -> Result<PathBuf> {
        let dir = base_path.join(event_dir_name(event.timestamp));
        fs::create_dir_all(&dir).map_err(|e| EdrError::io(&dir, e))?;

        let reason_path = dir.join(REASON_FILE);
        fs::write(&reason_path, &event.reason).map_err(|e| EdrError::io(&reason_path, e))?;

        let mut first_error = None;
        for sensor in sensors {
            match sensor.save(&dir) {
                Ok(count) => {
                    debug!(sensor_id = %sensor.id(), kind = %sensor.kind(), count, "sensor saved");
                    *written += count;
                }
                Err(e) => {
                    warn!(sensor_id = %sensor.id(), kind = %sensor.kind(), error = %e, "sensor save failed");
                    let id = if sensor.id().is_empty() {
                        sensor.kind().to_string()
                    } else {
                        sensor.id().to_string()
                    };
                    first_error.get_or_insert(EdrError::sensor(id, e));
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(dir),
        }
    }

    /// Counters since creation
    pub fn stats(&self) -> RecorderStats {
        self.stats_mut().summary()
    }
}

/// Event folder name, local date-time of the trigger to the second
pub fn event_dir_name(timestamp: f64) -> String {
    DateTime::from_timestamp(timestamp.floor() as i64, 0)
        .map(|utc| utc.with_timezone(&Local).format(EVENT_DIR_FORMAT).to_string())
        .unwrap_or_else(|| format!("{timestamp:.0}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferSettings;
    use crate::clock::ManualClock;
    use crate::persist::Persist;
    use crate::sensor::FrameSensor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone)]
    struct Text(&'static str);

    impl Persist for Text {
        fn save_to_disk(&self, path: &Path) -> Result<()> {
            fs::write(path, self.0).map_err(|e| EdrError::io(path, e))
        }
    }

    fn text_sensor(id: &str) -> FrameSensor<Text> {
        FrameSensor::new(
            id,
            SensorKind::Custom("text".into()),
            ".txt",
            BufferSettings::new(2.0, 1.0, 10.0),
        )
    }

    fn recorder_at(t: f64) -> (Recorder, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(t));
        (Recorder::new(clock.clone()), clock)
    }

    fn count_files(dir: &Path) -> usize {
        fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn test_first_trigger_wins() {
        let (recorder, clock) = recorder_at(100.0);
        assert!(!recorder.has_triggered());
        assert!(recorder.trigger("first"));
        clock.advance(1.0);
        assert!(!recorder.trigger("second"));

        let event = recorder.event().unwrap();
        assert_eq!(event.timestamp, 100.0);
        assert_eq!(event.reason, "first");

        let stats = recorder.stats();
        assert_eq!(stats.events_triggered, 1);
        assert_eq!(stats.triggers_ignored, 1);
    }

    #[test]
    fn test_concurrent_triggers_single_winner() {
        let recorder = Arc::new(Recorder::new(Arc::new(ManualClock::new(5.0))));
        let winners = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (0..8)
            .map(|i| {
                let recorder = Arc::clone(&recorder);
                let winners = Arc::clone(&winners);
                std::thread::spawn(move || {
                    if recorder.trigger_at(&format!("caller {i}"), f64::from(i)) {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.stats().triggers_ignored, 7);
    }

    #[test]
    fn test_trigger_broadcasts_to_sensors() {
        let (recorder, _) = recorder_at(3.0);
        let sensor = text_sensor("a");
        let handle = sensor.handle();
        recorder.add_sensor(Box::new(sensor));

        recorder.trigger("event");
        assert_eq!(handle.lock().event_timestamp(), Some(3.0));

        recorder.clear_event();
        assert!(!recorder.has_triggered());
        assert!(!handle.lock().is_triggered());
    }

    #[test]
    fn test_save_writes_layout_and_resets() {
        let dir = tempfile::tempdir().unwrap();
        let (recorder, _) = recorder_at(1_700_000_010.0);

        let sensor = text_sensor("front");
        sensor.generate_data(1_700_000_009.0, Text("pre"));
        sensor.generate_data(1_700_000_009.5, Text("pre"));
        recorder.add_sensor(Box::new(sensor));

        let other = text_sensor("rear");
        let other_handle = other.handle();
        recorder.add_sensor(Box::new(other));

        recorder.trigger("Manual Trigger");
        other_handle.on_data(1_700_000_010.5, Text("post"));

        let report = recorder.save(dir.path()).unwrap();
        assert_eq!(report.samples_written, 3);
        assert_eq!(report.sensors, 2);
        assert_eq!(
            report.path.file_name().unwrap().to_string_lossy(),
            event_dir_name(1_700_000_010.0)
        );

        let reason = fs::read_to_string(report.path.join(REASON_FILE)).unwrap();
        assert_eq!(reason, "Manual Trigger");
        assert_eq!(count_files(&report.path.join("text").join("front")), 2);
        assert_eq!(count_files(&report.path.join("text").join("rear")), 1);

        assert!(!recorder.has_triggered());
        assert_eq!(other_handle.lock().post_event_len(), 0);
        assert_eq!(recorder.stats().saves_succeeded, 1);
    }

    #[test]
    fn test_save_requires_trigger() {
        let dir = tempfile::tempdir().unwrap();
        let (recorder, _) = recorder_at(0.0);
        assert!(matches!(
            recorder.save(dir.path()),
            Err(EdrError::NotTriggered)
        ));
    }

    #[test]
    fn test_failed_save_keeps_event() {
        let dir = tempfile::tempdir().unwrap();
        let (recorder, _) = recorder_at(1_700_000_000.0);

        let good = text_sensor("good");
        good.generate_data(1_699_999_999.5, Text("x"));
        recorder.add_sensor(Box::new(good));

        let blocked = FrameSensor::new(
            "bad",
            SensorKind::Custom("blocked".into()),
            ".txt",
            BufferSettings::new(2.0, 1.0, 10.0),
        );
        blocked.generate_data(1_699_999_999.5, Text("y"));
        let blocked_handle = blocked.handle();
        recorder.add_sensor(Box::new(blocked));

        recorder.trigger("event");
        let event_dir = dir.path().join(event_dir_name(1_700_000_000.0));
        fs::create_dir_all(&event_dir).unwrap();
        fs::write(event_dir.join("blocked"), b"not a directory").unwrap();

        let err = recorder.save(dir.path()).unwrap_err();
        assert!(matches!(err, EdrError::Sensor { ref sensor_id, .. } if sensor_id == "bad"));

        // the healthy sensor was still written
        assert_eq!(count_files(&event_dir.join("text").join("good")), 1);
        // event and buffers survive, lock released
        assert!(recorder.has_triggered());
        assert_eq!(blocked_handle.lock().pre_event_len(), 1);
        assert!(!blocked_handle.lock().is_saving());
        assert_eq!(recorder.stats().saves_failed, 1);

        fs::remove_file(event_dir.join("blocked")).unwrap();
        assert!(recorder.save(dir.path()).is_ok());
        assert!(!recorder.has_triggered());
    }

    #[test]
    fn test_restart_after_save() {
        let dir = tempfile::tempdir().unwrap();
        let (recorder, clock) = recorder_at(10.0);
        let sensor = text_sensor("s");
        let handle = sensor.handle();
        recorder.add_sensor(Box::new(sensor));

        for cycle in 0..2 {
            let base = clock.now();
            handle.on_data(base - 0.5, Text("pre"));
            assert!(recorder.trigger("cycle"), "cycle {cycle}");
            handle.on_data(base + 0.5, Text("post"));
            let report = recorder.save(dir.path()).unwrap();
            assert_eq!(report.samples_written, 2, "cycle {cycle}");
            clock.advance(60.0);
        }
        assert_eq!(recorder.stats().events_triggered, 2);
    }

    #[test]
    fn test_clear_drops_sensors() {
        let (recorder, _) = recorder_at(0.0);
        recorder.add_sensor(Box::new(text_sensor("a")));
        recorder.add_sensor(Box::new(text_sensor("b")));
        recorder.trigger("x");
        assert_eq!(recorder.sensor_count(), 2);

        recorder.clear();
        assert_eq!(recorder.sensor_count(), 0);
        assert!(!recorder.has_triggered());
    }

    #[test]
    fn test_sensors_info() {
        let (recorder, _) = recorder_at(0.0);
        let sensor = text_sensor("a");
        sensor.generate_data(0.0, Text("x"));
        recorder.add_sensor(Box::new(sensor));

        let info = recorder.sensors_info();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].id, "a");
        assert_eq!(info[0].buffered.pre_event, 1);
    }
}
