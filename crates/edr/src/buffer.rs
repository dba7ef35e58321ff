//! Per-sensor dual buffer: bounded pre-event ring + unbounded post-event queue.
//!
//! Before a trigger every accepted sample goes into a fixed-size ring that
//! evicts the oldest entry on overflow. After a trigger the ring is frozen
//! and samples are appended to the post-event queue until the window closes.
//!
//! Acceptance is rate limited on the caller's timestamps, not on arrival
//! time. A producer that delivers out-of-order timestamps can therefore
//! slip samples past the limiter; this is kept as-is.

use std::fmt;
use std::path::Path;

use contracts::Sample;
use ringbuf::{traits::*, HeapRb};
use tracing::warn;

use crate::error::Result;
use crate::persist::Persist;

/// Tolerance for float comparisons against the rate limiter, so evenly
/// spaced timestamps such as `i as f64 / 10.0` are not rejected by rounding.
const TIME_EPSILON: f64 = 1e-9;

/// Upper bound on the pre-event ring. The ring is allocated up front, so an
/// absurd `pre × rate` product must not turn into an allocation abort.
pub const MAX_PRE_EVENT_SAMPLES: usize = 1 << 20;

/// Buffer sizing parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferSettings {
    /// Seconds kept before the event
    pub pre_event_seconds: f64,
    /// Seconds recorded after the event
    pub post_event_seconds: f64,
    /// Maximum accepted sample rate; `<= 0` disables throttling
    pub max_sample_rate_hz: f64,
}

impl BufferSettings {
    pub fn new(pre_event_seconds: f64, post_event_seconds: f64, max_sample_rate_hz: f64) -> Self {
        Self {
            pre_event_seconds,
            post_event_seconds,
            max_sample_rate_hz,
        }
    }

    /// Same window, different rate
    pub fn with_rate(self, max_sample_rate_hz: f64) -> Self {
        Self {
            max_sample_rate_hz,
            ..self
        }
    }

    /// `ceil(pre × rate)`; zero when either factor is non-positive, capped
    /// at [`MAX_PRE_EVENT_SAMPLES`]
    pub fn pre_event_capacity(&self) -> usize {
        self.requested_capacity().min(MAX_PRE_EVENT_SAMPLES)
    }

    fn requested_capacity(&self) -> usize {
        let samples = self.pre_event_seconds * self.max_sample_rate_hz;
        if samples <= 0.0 || samples.is_nan() {
            return 0;
        }
        // saturating cast: inf and huge products become usize::MAX
        (samples - TIME_EPSILON).ceil() as usize
    }

    /// Minimum spacing between accepted samples
    pub fn sample_interval(&self) -> f64 {
        if self.max_sample_rate_hz > 0.0 {
            1.0 / self.max_sample_rate_hz
        } else {
            0.0
        }
    }
}

/// Event window derived from the trigger timestamp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventWindow {
    pub event_timestamp: f64,
    /// `event - pre_event_seconds`
    pub start: f64,
    /// `event + post_event_seconds`
    pub end: f64,
}

impl EventWindow {
    fn new(event_timestamp: f64, settings: &BufferSettings) -> Self {
        Self {
            event_timestamp,
            start: event_timestamp - settings.pre_event_seconds,
            end: event_timestamp + settings.post_event_seconds,
        }
    }
}

/// Outcome of [`SampleBuffer::on_data`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    /// A save is in progress
    Saving,
    /// Timestamp is past the post-event window
    WindowClosed,
    /// Arrived before the next allowed timestamp
    RateLimited,
}

impl Admission {
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Label used for the rejection metric
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Saving => "saving",
            Self::WindowClosed => "window_closed",
            Self::RateLimited => "rate_limited",
        }
    }
}

/// Samples selected for persisting, copied out under the buffer lock so the
/// file writes can run without holding it.
#[derive(Debug, Clone)]
pub struct SaveSnapshot<P> {
    pub window: EventWindow,
    /// Pre-event samples (`>= start`) followed by post-event samples (`<= end`)
    pub samples: Vec<Sample<P>>,
}

/// Dual pre/post-event sample buffer
pub struct SampleBuffer<P> {
    /// `None` when the capacity is zero
    pre_event: Option<HeapRb<Sample<P>>>,
    post_event: Vec<Sample<P>>,
    settings: BufferSettings,
    sample_interval: f64,
    next_allowed: Option<f64>,
    window: Option<EventWindow>,
    saving: bool,
}

impl<P> fmt::Debug for SampleBuffer<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleBuffer")
            .field("pre_event", &self.pre_event_len())
            .field("capacity", &self.capacity())
            .field("post_event", &self.post_event.len())
            .field("window", &self.window)
            .field("saving", &self.saving)
            .finish()
    }
}

impl<P> SampleBuffer<P> {
    pub fn new(settings: BufferSettings) -> Self {
        let capacity = settings.pre_event_capacity();
        if settings.requested_capacity() > capacity {
            warn!(
                pre_event_seconds = settings.pre_event_seconds,
                max_sample_rate_hz = settings.max_sample_rate_hz,
                capacity,
                "pre-event ring capped"
            );
        }
        Self {
            pre_event: (capacity > 0).then(|| HeapRb::new(capacity)),
            post_event: Vec::new(),
            sample_interval: settings.sample_interval(),
            settings,
            next_allowed: None,
            window: None,
            saving: false,
        }
    }

    pub fn settings(&self) -> &BufferSettings {
        &self.settings
    }

    /// Pre-event ring capacity
    pub fn capacity(&self) -> usize {
        self.pre_event.as_ref().map_or(0, |rb| rb.capacity().get())
    }

    /// Offer a sample to the buffer.
    ///
    /// Rejections leave the buffer untouched.
    pub fn on_data(&mut self, timestamp: f64, payload: P) -> Admission {
        if self.saving {
            return Admission::Saving;
        }

        if let Some(window) = &self.window {
            if timestamp > window.end {
                return Admission::WindowClosed;
            }
        }

        if let Some(next) = self.next_allowed {
            if timestamp < next - TIME_EPSILON {
                return Admission::RateLimited;
            }
        }

        self.next_allowed = Some(timestamp + self.sample_interval);

        let sample = Sample::new(timestamp, payload);
        if self.window.is_some() {
            self.post_event.push(sample);
        } else if let Some(ring) = self.pre_event.as_mut() {
            ring.push_overwrite(sample);
        }

        Admission::Accepted
    }

    /// Freeze the pre-event ring and open the post-event window.
    ///
    /// Re-triggering is prevented by the recorder; a second call here is
    /// ignored so the first event timestamp stays authoritative.
    pub fn on_trigger(&mut self, timestamp: f64) {
        if let Some(window) = &self.window {
            warn!(
                event_timestamp = window.event_timestamp,
                ignored = timestamp,
                "buffer already triggered"
            );
            return;
        }
        self.window = Some(EventWindow::new(timestamp, &self.settings));
    }

    /// Drop all samples and event state
    pub fn clear(&mut self) {
        if let Some(ring) = self.pre_event.as_mut() {
            ring.clear();
        }
        self.post_event.clear();
        self.window = None;
        self.next_allowed = None;
    }

    pub fn is_triggered(&self) -> bool {
        self.window.is_some()
    }

    pub fn window(&self) -> Option<EventWindow> {
        self.window
    }

    pub fn event_timestamp(&self) -> Option<f64> {
        self.window.map(|w| w.event_timestamp)
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn pre_event_len(&self) -> usize {
        self.pre_event.as_ref().map_or(0, |rb| rb.occupied_len())
    }

    pub fn post_event_len(&self) -> usize {
        self.post_event.len()
    }

    /// Pre-event samples, oldest first
    pub fn pre_event(&self) -> impl Iterator<Item = &Sample<P>> {
        self.pre_event.iter().flat_map(|rb| rb.iter())
    }

    /// Post-event samples in arrival order
    pub fn post_event(&self) -> impl Iterator<Item = &Sample<P>> {
        self.post_event.iter()
    }

    /// Samples inside the event window; empty when not triggered
    pub fn windowed(&self) -> impl Iterator<Item = &Sample<P>> {
        let window = self.window;
        let pre = self
            .pre_event()
            .filter(move |s| window.is_some_and(|w| s.timestamp >= w.start));
        let post = self
            .post_event()
            .filter(move |s| window.is_some_and(|w| s.timestamp <= w.end));
        pre.chain(post)
    }

    /// Release the saving lock taken by [`SampleBuffer::begin_save`]
    pub fn end_save(&mut self) {
        self.saving = false;
    }
}

impl<P: Clone> SampleBuffer<P> {
    /// Block new samples and copy out the event window.
    ///
    /// Returns `None` (and stays unlocked) when not triggered. Callers must
    /// pair a `Some` with [`SampleBuffer::end_save`].
    pub fn begin_save(&mut self) -> Option<SaveSnapshot<P>> {
        let window = self.window?;
        self.saving = true;
        Some(SaveSnapshot {
            window,
            samples: self.windowed().cloned().collect(),
        })
    }
}

impl<P: Clone + Persist> SampleBuffer<P> {
    /// Write the event window under `event_dir/<kind_dir>/<sensor_id>`, one
    /// file per sample.
    ///
    /// Holds `&mut self` for the whole write; shared sensors go through
    /// [`SampleBuffer::begin_save`] and [`SaveSnapshot::write`] instead so the
    /// lock is released during I/O. Returns the number of files written. The
    /// saving flag is cleared on both success and failure.
    pub fn save(
        &mut self,
        event_dir: &Path,
        kind_dir: &str,
        sensor_id: &str,
        ext: &str,
    ) -> Result<usize> {
        let Some(snapshot) = self.begin_save() else {
            return Ok(0);
        };
        let result = snapshot.write(event_dir, kind_dir, sensor_id, ext);
        self.end_save();
        result
    }
}
