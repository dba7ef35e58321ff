//! Simulator client abstraction
//!
//! The simulator is an external collaborator. A client only needs to spawn a
//! sensor attached to the ego vehicle and hand back a push-style producer for
//! its data.

use std::collections::HashMap;
use std::future::Future;

use contracts::{ActorId, CameraConfig, ImageData, PointCloudData, RangeScannerConfig, SampleSource};

use crate::error::Result;

/// Blueprint of an RGB camera
pub const CAMERA_BLUEPRINT: &str = "sensor.camera.rgb";

/// Blueprint of a 3-D ray-cast lidar
pub const RANGE_SCANNER_BLUEPRINT: &str = "sensor.lidar.ray_cast";

/// Simulator client trait
///
/// Real and mock simulators implement the same interface, so the factory
/// and the session never know which one they talk to.
pub trait SimulatorClient: Send + Sync {
    /// Spawn a camera on `parent` and return its image producer
    ///
    /// # Arguments
    /// * `parent` - Actor id of the observed vehicle
    /// * `config` - Label, placement and capture parameters
    fn attach_camera(
        &self,
        parent: ActorId,
        config: &CameraConfig,
    ) -> impl Future<Output = Result<Box<dyn SampleSource<ImageData>>>> + Send;

    /// Spawn a 3-D range scanner on `parent` and return its point cloud producer
    fn attach_range_scanner(
        &self,
        parent: ActorId,
        config: &RangeScannerConfig,
    ) -> impl Future<Output = Result<Box<dyn SampleSource<PointCloudData>>>> + Send;
}

/// Blueprint attributes for a camera
pub fn camera_attributes(config: &CameraConfig) -> HashMap<String, String> {
    HashMap::from([
        ("image_size_x".to_string(), config.width.to_string()),
        ("image_size_y".to_string(), config.height.to_string()),
        ("fov".to_string(), config.fov.to_string()),
        ("sensor_tick".to_string(), (1.0 / config.rate).to_string()),
    ])
}

/// Blueprint attributes for a range scanner
pub fn range_scanner_attributes(config: &RangeScannerConfig) -> HashMap<String, String> {
    HashMap::from([
        ("channels".to_string(), config.channels.to_string()),
        ("range".to_string(), config.range.to_string()),
        ("upper_fov".to_string(), config.upper_fov.to_string()),
        ("lower_fov".to_string(), config.lower_fov.to_string()),
        (
            "rotation_frequency".to_string(),
            config.rotation_frequency.to_string(),
        ),
        (
            "points_per_second".to_string(),
            config.points_per_second.to_string(),
        ),
        ("sensor_tick".to_string(), (1.0 / config.rate).to_string()),
    ])
}
