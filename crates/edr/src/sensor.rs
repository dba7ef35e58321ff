//! EDR sensors
//!
//! A sensor owns exactly one [`SampleBuffer`] behind a shared
//! [`SensorHandle`]. Producers never own the sensor: they receive a clone of
//! the handle (or a callback capturing one) and push samples through it,
//! possibly from their own thread. The recorder owns the sensor itself.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{ImageData, PointCloudData, SampleCallback, SampleSource, SensorKind};
use observability::metrics as edr_metrics;
use tracing::{debug, info};

use crate::buffer::{Admission, BufferSettings, SampleBuffer};
use crate::error::Result;
use crate::persist::Persist;

/// Buffer occupancy of one sensor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferedCounts {
    pub pre_event: usize,
    pub post_event: usize,
}

/// Common contract of every sensor kind.
///
/// Only `save` differs between kinds (file-per-sample vs. a single log).
pub trait EdrSensor: Send + Sync {
    /// Sensor id (config label); empty for singleton sensors such as vehicle state
    fn id(&self) -> &str;

    fn kind(&self) -> &SensorKind;

    /// File extension including the dot
    fn extension(&self) -> &str;

    /// Freeze the pre-event window at `timestamp`
    fn on_event_trigger(&self, timestamp: f64);

    /// Drop buffered samples and event state
    fn clear_event(&self);

    /// Persist the event window under `event_dir`.
    ///
    /// Returns the number of samples written; zero when the sensor has no
    /// active event.
    fn save(&self, event_dir: &Path) -> Result<usize>;

    fn buffered(&self) -> BufferedCounts;

    /// Detach from the data producer
    fn stop(&self) {}
}

/// Shared, thread-safe access to a sensor's buffer
pub struct SensorHandle<P> {
    buffer: Arc<Mutex<SampleBuffer<P>>>,
    kind: SensorKind,
}

impl<P> Clone for SensorHandle<P> {
    fn clone(&self) -> Self {
        Self {
            buffer: Arc::clone(&self.buffer),
            kind: self.kind.clone(),
        }
    }
}

impl<P> SensorHandle<P> {
    pub fn new(kind: SensorKind, settings: BufferSettings) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(SampleBuffer::new(settings))),
            kind,
        }
    }

    pub fn kind(&self) -> &SensorKind {
        &self.kind
    }

    /// Lock the buffer. A poisoned lock is recovered: a panicking producer
    /// must not disable the sensor for the rest of the session.
    pub fn lock(&self) -> MutexGuard<'_, SampleBuffer<P>> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Offer a sample; safe to call from any thread
    pub fn on_data(&self, timestamp: f64, payload: P) -> Admission {
        let admission = self.lock().on_data(timestamp, payload);
        match admission {
            Admission::Accepted => edr_metrics::record_sample_accepted(self.kind.dir_name()),
            rejected => edr_metrics::record_sample_rejected(self.kind.dir_name(), rejected.as_str()),
        }
        admission
    }

    pub fn on_trigger(&self, timestamp: f64) {
        self.lock().on_trigger(timestamp);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn counts(&self) -> BufferedCounts {
        let buffer = self.lock();
        BufferedCounts {
            pre_event: buffer.pre_event_len(),
            post_event: buffer.post_event_len(),
        }
    }
}

impl<P: Send + 'static> SensorHandle<P> {
    /// Callback for push-style producers, capturing only this handle
    pub fn callback(&self) -> SampleCallback<P> {
        let handle = self.clone();
        Arc::new(move |timestamp, payload| {
            handle.on_data(timestamp, payload);
        })
    }
}

/// Sensor writing one file per sample (camera, range scanner, perception, custom)
pub struct FrameSensor<P> {
    id: String,
    extension: String,
    handle: SensorHandle<P>,
    source: Option<Box<dyn SampleSource<P>>>,
}

impl<P> FrameSensor<P>
where
    P: Persist + Clone + Send + 'static,
{
    pub fn new(
        id: impl Into<String>,
        kind: SensorKind,
        extension: impl Into<String>,
        settings: BufferSettings,
    ) -> Self {
        let sensor = Self {
            id: id.into(),
            extension: extension.into(),
            handle: SensorHandle::new(kind, settings),
            source: None,
        };
        debug!(
            sensor_id = %sensor.id,
            kind = %sensor.handle.kind(),
            capacity = settings.pre_event_capacity(),
            "sensor created"
        );
        sensor
    }

    /// Subscribe to a push-style producer. The producer only receives a
    /// callback bound to this sensor's buffer handle.
    pub fn attach(&mut self, source: Box<dyn SampleSource<P>>) {
        if let Some(previous) = self.source.take() {
            previous.stop();
        }
        source.listen(self.handle.callback());
        info!(sensor_id = %self.id, source = source.source_id(), "sensor listening");
        self.source = Some(source);
    }

    pub fn with_source(mut self, source: Box<dyn SampleSource<P>>) -> Self {
        self.attach(source);
        self
    }

    pub fn handle(&self) -> SensorHandle<P> {
        self.handle.clone()
    }

    /// Pull-style entry point: hand a freshly generated sample to the buffer
    pub fn generate_data(&self, timestamp: f64, payload: P) -> Admission {
        self.handle.on_data(timestamp, payload)
    }
}

/// Buffer rate of range scanners (Hz)
pub const RANGE_SCAN_RATE_HZ: f64 = 10.0;

impl FrameSensor<ImageData> {
    /// Camera saving PNG frames under `images/<label>`; `settings` carries
    /// the configured capture rate
    pub fn camera(label: impl Into<String>, settings: BufferSettings) -> Self {
        Self::new(label, SensorKind::Image, ".png", settings)
    }
}

impl FrameSensor<PointCloudData> {
    /// 3-D lidar saving PLY clouds under `lidar3d/<label>`, buffered at 10 Hz
    pub fn range_scanner(label: impl Into<String>, settings: BufferSettings) -> Self {
        Self::new(
            label,
            SensorKind::RangeScan,
            ".ply",
            settings.with_rate(RANGE_SCAN_RATE_HZ),
        )
    }
}

impl<P> EdrSensor for FrameSensor<P>
where
    P: Persist + Clone + Send + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &SensorKind {
        self.handle.kind()
    }

    fn extension(&self) -> &str {
        &self.extension
    }

    fn on_event_trigger(&self, timestamp: f64) {
        self.handle.on_trigger(timestamp);
    }

    fn clear_event(&self) {
        self.handle.clear();
    }

    fn save(&self, event_dir: &Path) -> Result<usize> {
        let Some(snapshot) = self.handle.lock().begin_save() else {
            return Ok(0);
        };

        let result = snapshot.write(event_dir, self.kind().dir_name(), &self.id, &self.extension);
        self.handle.lock().end_save();

        if let Ok(written) = result {
            edr_metrics::record_samples_written(self.kind().dir_name(), written);
        }
        result
    }

    fn buffered(&self) -> BufferedCounts {
        self.handle.counts()
    }

    fn stop(&self) {
        if let Some(source) = &self.source {
            source.stop();
        }
    }
}

impl<P> Drop for FrameSensor<P> {
    fn drop(&mut self) {
        if let Some(source) = &self.source {
            source.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EdrError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq)]
    struct Note(String);

    impl Persist for Note {
        fn save_to_disk(&self, path: &Path) -> Result<()> {
            std::fs::write(path, &self.0).map_err(|e| EdrError::io(path, e))
        }
    }

    /// Producer that stores the callback so the test can fire it
    struct ManualSource {
        callback: Mutex<Option<SampleCallback<Note>>>,
        listening: AtomicBool,
    }

    impl ManualSource {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                callback: Mutex::new(None),
                listening: AtomicBool::new(false),
            })
        }

        fn emit(&self, timestamp: f64, text: &str) {
            if let Some(cb) = self.callback.lock().unwrap().as_ref() {
                cb(timestamp, Note(text.into()));
            }
        }
    }

    impl SampleSource<Note> for Arc<ManualSource> {
        fn source_id(&self) -> &str {
            "manual"
        }

        fn kind(&self) -> SensorKind {
            SensorKind::Custom("notes".into())
        }

        fn listen(&self, callback: SampleCallback<Note>) {
            *self.callback.lock().unwrap() = Some(callback);
            self.listening.store(true, Ordering::SeqCst);
        }

        fn stop(&self) {
            self.listening.store(false, Ordering::SeqCst);
        }

        fn is_listening(&self) -> bool {
            self.listening.load(Ordering::SeqCst)
        }
    }

    fn notes_sensor() -> FrameSensor<Note> {
        FrameSensor::new(
            "memo",
            SensorKind::Custom("notes".into()),
            ".txt",
            BufferSettings::new(1.0, 1.0, 10.0),
        )
    }

    #[test]
    fn test_push_source_feeds_buffer() {
        let source = ManualSource::new();
        let sensor = notes_sensor().with_source(Box::new(Arc::clone(&source)));
        assert!(source.is_listening());

        source.emit(0.0, "a");
        source.emit(0.05, "too soon");
        source.emit(0.1, "b");
        assert_eq!(sensor.buffered().pre_event, 2);

        drop(sensor);
        assert!(!source.is_listening());
    }

    #[test]
    fn test_save_layout() {
        let dir = tempdir().unwrap();
        let sensor = notes_sensor();
        sensor.generate_data(1.0, Note("before".into()));
        sensor.on_event_trigger(1.5);
        sensor.generate_data(2.0, Note("after".into()));

        let written = sensor.save(dir.path()).unwrap();
        assert_eq!(written, 2);

        let sensor_dir = dir.path().join("notes").join("memo");
        let mut names: Vec<String> = std::fs::read_dir(&sensor_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "memo_         1.00000000_-0.50000000.txt",
                "memo_         2.00000000_+0.50000000.txt",
            ]
        );
        assert!(!sensor.handle().lock().is_saving());
    }

    #[test]
    fn test_save_without_event_writes_nothing() {
        let dir = tempdir().unwrap();
        let sensor = notes_sensor();
        sensor.generate_data(1.0, Note("x".into()));
        assert_eq!(sensor.save(dir.path()).unwrap(), 0);
        assert!(!dir.path().join("notes").exists());
    }

    #[test]
    fn test_failed_save_releases_lock() {
        let dir = tempdir().unwrap();
        // a file where the kind directory should go
        std::fs::write(dir.path().join("notes"), b"blocker").unwrap();

        let sensor = notes_sensor();
        sensor.generate_data(1.0, Note("x".into()));
        sensor.on_event_trigger(1.0);

        assert!(sensor.save(dir.path()).is_err());
        let handle = sensor.handle();
        assert!(!handle.lock().is_saving());
        assert!(handle.on_data(1.5, Note("y".into())).is_accepted());
    }

    #[test]
    fn test_handle_is_shared_across_threads() {
        let sensor = notes_sensor();
        let handle = sensor.handle();
        let worker = std::thread::spawn(move || {
            for i in 0..5 {
                handle.on_data(f64::from(i), Note(i.to_string()));
            }
        });
        worker.join().unwrap();
        assert_eq!(sensor.buffered().pre_event, 5);
    }
}
