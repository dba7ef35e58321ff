//! Mock producers
//!
//! Implements `SampleSource`, generating synthetic images and point clouds
//! at a fixed rate on a background thread, the way simulator sensors deliver
//! data through callbacks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytemuck::{Pod, Zeroable};
use bytes::Bytes;
use contracts::{ImageData, ImageFormat, PointCloudData, SampleCallback, SampleSource, SensorKind};
use edr::Clock;
use tracing::{debug, trace};

type Generator<P> = Arc<dyn Fn(u64) -> P + Send + Sync>;

/// Mock producer
///
/// Timestamps come from the supplied clock so that samples line up with the
/// recorder's trigger timestamps.
pub struct MockSource<P> {
    source_id: String,
    kind: SensorKind,
    frequency_hz: f64,
    clock: Arc<dyn Clock>,
    generate: Generator<P>,
    listening: Arc<AtomicBool>,
}

impl<P> MockSource<P> {
    pub fn new(
        source_id: impl Into<String>,
        kind: SensorKind,
        frequency_hz: f64,
        clock: Arc<dyn Clock>,
        generate: impl Fn(u64) -> P + Send + Sync + 'static,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            kind,
            frequency_hz,
            clock,
            generate: Arc::new(generate),
            listening: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl MockSource<ImageData> {
    /// BGRA camera producing a moving gradient
    pub fn camera(
        source_id: impl Into<String>,
        width: u32,
        height: u32,
        frequency_hz: f64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::new(source_id, SensorKind::Image, frequency_hz, clock, move |frame| {
            gradient_image(width, height, frame)
        })
    }
}

impl MockSource<PointCloudData> {
    /// Range scanner producing a ring of `points` points
    pub fn range_scanner(
        source_id: impl Into<String>,
        points: u32,
        frequency_hz: f64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::new(source_id, SensorKind::RangeScan, frequency_hz, clock, move |frame| {
            ring_cloud(points, frame)
        })
    }
}

impl<P: Send + 'static> SampleSource<P> for MockSource<P> {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn kind(&self) -> SensorKind {
        self.kind.clone()
    }

    fn listen(&self, callback: SampleCallback<P>) {
        // Idempotent: if already listening, don't start again
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let source_id = self.source_id.clone();
        let clock = Arc::clone(&self.clock);
        let generate = Arc::clone(&self.generate);
        let listening = Arc::clone(&self.listening);
        let interval = Duration::from_secs_f64(1.0 / self.frequency_hz);

        thread::spawn(move || {
            let mut frame: u64 = 0;
            debug!(source_id = %source_id, "mock source started");

            while listening.load(Ordering::Relaxed) {
                frame += 1;
                let timestamp = clock.now();
                callback(timestamp, generate(frame));
                trace!(source_id = %source_id, frame, timestamp, "mock sample sent");

                thread::sleep(interval);
            }

            debug!(source_id = %source_id, frames = frame, "mock source stopped");
        });
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

impl<P> Drop for MockSource<P> {
    fn drop(&mut self) {
        self.listening.store(false, Ordering::SeqCst);
    }
}

fn gradient_image(width: u32, height: u32, frame: u64) -> ImageData {
    let shift = (frame % 256) as u8;
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let b = (x % 256) as u8;
            let g = (y % 256) as u8;
            data.extend_from_slice(&[b, g, shift, 255]);
        }
    }
    ImageData {
        width,
        height,
        format: ImageFormat::Bgra8,
        data: Bytes::from(data),
    }
}

/// x, y, z, intensity as little-endian f32
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct MockPoint {
    x: f32,
    y: f32,
    z: f32,
    intensity: f32,
}

fn ring_cloud(points: u32, frame: u64) -> PointCloudData {
    let radius = 10.0 + (frame % 10) as f32;
    let cloud: Vec<MockPoint> = (0..points)
        .map(|i| {
            let angle = i as f32 / points.max(1) as f32 * std::f32::consts::TAU;
            MockPoint {
                x: radius * angle.cos(),
                y: radius * angle.sin(),
                z: -1.5,
                intensity: 0.5,
            }
        })
        .collect();

    PointCloudData {
        num_points: points,
        point_stride: std::mem::size_of::<MockPoint>() as u32,
        data: Bytes::copy_from_slice(bytemuck::cast_slice(&cloud)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edr::SystemClock;
    use std::sync::atomic::AtomicU64;

    fn clock() -> Arc<dyn Clock> {
        Arc::new(SystemClock)
    }

    #[test]
    fn test_mock_camera() {
        let source = MockSource::camera("front", 8, 4, 100.0, clock());
        let count = Arc::new(AtomicU64::new(0));
        let count_clone = count.clone();

        source.listen(Arc::new(move |timestamp: f64, image: ImageData| {
            assert!(timestamp > 0.0);
            assert_eq!(image.data.len(), 8 * 4 * 4);
            count_clone.fetch_add(1, Ordering::Relaxed);
        }));

        thread::sleep(Duration::from_millis(50));
        source.stop();

        assert!(count.load(Ordering::Relaxed) > 0);
        assert!(!source.is_listening());
    }

    #[test]
    fn test_ring_cloud_layout() {
        let cloud = ring_cloud(4, 0);
        assert_eq!(cloud.point_stride, 16);
        assert_eq!(cloud.data.len(), 4 * 16);

        let first: [f32; 4] = bytemuck::pod_read_unaligned(&cloud.data[..16]);
        assert_eq!(first, [10.0, 0.0, -1.5, 0.5]);
    }

    #[test]
    fn test_mock_source_idempotent_listen() {
        let source = MockSource::range_scanner("roof", 16, 20.0, clock());

        let count = Arc::new(AtomicU64::new(0));
        let count1 = count.clone();
        let count2 = count.clone();

        source.listen(Arc::new(move |_, _| {
            count1.fetch_add(1, Ordering::Relaxed);
        }));
        // Second call should be ignored
        source.listen(Arc::new(move |_, _| {
            count2.fetch_add(100, Ordering::Relaxed);
        }));

        thread::sleep(Duration::from_millis(100));
        source.stop();

        let final_count = count.load(Ordering::Relaxed);
        assert!(final_count > 0);
        assert!(final_count < 50);
    }
}
