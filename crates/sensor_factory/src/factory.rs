//! SensorFactory 核心实现
//!
//! 根据 EDR 配置挂载相机与激光雷达，并注册到 Recorder。
//! 每个传感器独立挂载：单个失败只记录日志，不影响其余传感器。

use contracts::{ActorId, CameraConfig, EdrSensorConfig, RangeScannerConfig, SensorKind};
use edr::{BufferSettings, FrameSensor, Recorder};
use tracing::{info, instrument, warn};

use crate::client::SimulatorClient;
use crate::error::Result;

/// 单个挂载失败
#[derive(Debug, Clone, PartialEq)]
pub struct AttachFailure {
    pub label: String,
    pub kind: SensorKind,
    pub message: String,
}

/// 挂载结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttachReport {
    /// 成功注册的传感器 label
    pub attached: Vec<String>,
    pub failures: Vec<AttachFailure>,
}

impl AttachReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Sensor Factory
///
/// 负责把配置中的相机和激光雷达挂到模拟器上，
/// 并把生成的 EDR 传感器交给 Recorder。
pub struct SensorFactory<C: SimulatorClient> {
    client: C,
}

impl<C: SimulatorClient> SensorFactory<C> {
    /// 创建新的 SensorFactory
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// 挂载所有配置的传感器
    ///
    /// `settings` 提供事件窗口，采样频率由各传感器自行决定。
    #[instrument(
        name = "sensor_factory_attach_all",
        skip(self, config, settings, recorder),
        fields(cameras = config.cameras.len(), lidars3d = config.lidars3d.len())
    )]
    pub async fn attach_all(
        &self,
        parent: ActorId,
        config: &EdrSensorConfig,
        settings: BufferSettings,
        recorder: &Recorder,
    ) -> AttachReport {
        let mut report = AttachReport::default();

        for lidar in &config.lidars3d {
            let result = self.attach_range_scanner(parent, lidar, settings, recorder).await;
            Self::record(&mut report, &lidar.label, SensorKind::RangeScan, result);
        }

        for camera in &config.cameras {
            let result = self.attach_camera(parent, camera, settings, recorder).await;
            Self::record(&mut report, &camera.label, SensorKind::Image, result);
        }

        info!(
            attached = report.attached.len(),
            failed = report.failures.len(),
            "sensor attach completed"
        );
        report
    }

    fn record(report: &mut AttachReport, label: &str, kind: SensorKind, result: Result<()>) {
        match result {
            Ok(()) => report.attached.push(label.to_string()),
            Err(e) => {
                warn!(label, kind = %kind, error = %e, "sensor attach failed, skipped");
                report.failures.push(AttachFailure {
                    label: label.to_string(),
                    kind,
                    message: e.to_string(),
                });
            }
        }
    }

    #[instrument(
        name = "sensor_factory_attach_camera",
        skip(self, config, settings, recorder),
        fields(label = %config.label)
    )]
    async fn attach_camera(
        &self,
        parent: ActorId,
        config: &CameraConfig,
        settings: BufferSettings,
        recorder: &Recorder,
    ) -> Result<()> {
        let source = self.client.attach_camera(parent, config).await?;
        let sensor =
            FrameSensor::camera(config.label.clone(), settings.with_rate(config.rate)).with_source(source);
        recorder.add_sensor(Box::new(sensor));
        Ok(())
    }

    #[instrument(
        name = "sensor_factory_attach_range_scanner",
        skip(self, config, settings, recorder),
        fields(label = %config.label)
    )]
    async fn attach_range_scanner(
        &self,
        parent: ActorId,
        config: &RangeScannerConfig,
        settings: BufferSettings,
        recorder: &Recorder,
    ) -> Result<()> {
        let source = self.client.attach_range_scanner(parent, config).await?;
        let sensor = FrameSensor::range_scanner(config.label.clone(), settings).with_source(source);
        recorder.add_sensor(Box::new(sensor));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_simulator::{MockConfig, MockSimulator};
    use edr::SystemClock;
    use std::sync::Arc;

    fn sensors() -> EdrSensorConfig {
        let cameras = ["front", "rear"]
            .iter()
            .map(|label| CameraConfig {
                label: label.to_string(),
                placement: Default::default(),
                width: 16,
                height: 8,
                fov: 90.0,
                rate: 10.0,
            })
            .collect();
        let lidars3d = vec![RangeScannerConfig {
            label: "roof".into(),
            placement: Default::default(),
            channels: 32,
            range: 50.0,
            upper_fov: 10.0,
            lower_fov: -30.0,
            rotation_frequency: 10.0,
            points_per_second: 100_000,
            rate: 10.0,
        }];
        EdrSensorConfig { lidars3d, cameras }
    }

    #[tokio::test]
    async fn test_attach_all() {
        let factory = SensorFactory::new(MockSimulator::new(Arc::new(SystemClock)));
        let recorder = Recorder::default();

        let report = factory
            .attach_all(1, &sensors(), BufferSettings::new(1.0, 1.0, 0.0), &recorder)
            .await;

        assert!(report.is_complete());
        assert_eq!(report.attached, vec!["roof", "front", "rear"]);
        assert_eq!(recorder.sensor_count(), 3);
        assert_eq!(factory.client().spawned().len(), 3);
        recorder.clear();
    }

    #[tokio::test]
    async fn test_partial_failure_is_not_fatal() {
        let simulator = MockSimulator::with_config(
            MockConfig {
                fail_labels: vec!["front".into()],
                without_range_scanner: true,
                ..Default::default()
            },
            Arc::new(SystemClock),
        );
        let factory = SensorFactory::new(simulator);
        let recorder = Recorder::default();

        let report = factory
            .attach_all(1, &sensors(), BufferSettings::new(1.0, 1.0, 0.0), &recorder)
            .await;

        assert_eq!(report.attached, vec!["rear"]);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].kind, SensorKind::RangeScan);
        assert!(report.failures[0].message.contains("unsupported"));
        assert_eq!(report.failures[1].label, "front");
        assert_eq!(recorder.sensor_count(), 1);
        recorder.clear();
    }
}
