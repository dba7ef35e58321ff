//! Sample - one timestamped datum held by an EDR buffer.

/// A timestamped payload.
///
/// Created when a producer delivers data, owned by the sensor's buffer
/// until it is written to disk or evicted.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample<P> {
    /// Capture time in seconds
    pub timestamp: f64,

    /// Opaque payload
    pub payload: P,
}

impl<P> Sample<P> {
    #[inline]
    pub fn new(timestamp: f64, payload: P) -> Self {
        Self { timestamp, payload }
    }

    /// Signed distance from the event timestamp (negative before the event).
    #[inline]
    pub fn offset_from(&self, event_timestamp: f64) -> f64 {
        self.timestamp - event_timestamp
    }
}
