//! SampleSource trait - push-style data producer abstraction
//!
//! A producer (a simulator camera, a lidar, a mock thread) delivers
//! timestamped payloads through a registered callback. The producer never
//! owns the EDR sensor: the callback captures only a handle to the sensor's
//! buffer, so no ownership cycle exists between producer and consumer.

use std::sync::Arc;

use crate::SensorKind;

/// Sample callback type
///
/// Invoked with `(timestamp, payload)` on the producer's own thread.
pub type SampleCallback<P> = Arc<dyn Fn(f64, P) + Send + Sync>;

/// Push-style data producer
///
/// # Example
///
/// ```ignore
/// let source: Box<dyn SampleSource<ImageData>> = simulator.attach_camera(...)?;
/// source.listen(Arc::new(move |timestamp, image| handle.on_data(timestamp, image)));
/// // ... later ...
/// source.stop();
/// ```
pub trait SampleSource<P>: Send + Sync {
    /// Identifier of the producing sensor
    fn source_id(&self) -> &str;

    /// Kind of data produced
    fn kind(&self) -> SensorKind;

    /// Register the data callback
    ///
    /// Repeated calls while already listening must be ignored.
    fn listen(&self, callback: SampleCallback<P>);

    /// Stop producing data
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}
