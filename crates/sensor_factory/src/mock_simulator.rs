//! Mock 模拟器客户端
//!
//! 用于测试和无模拟器运行的 mock 实现，支持按 label 注入挂载失败。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use contracts::{
    ActorId, CameraConfig, ImageData, PointCloudData, RangeScannerConfig, SampleSource, Transform,
};
use edr::Clock;
use tracing::instrument;

use crate::client::{
    camera_attributes, range_scanner_attributes, SimulatorClient, CAMERA_BLUEPRINT,
    RANGE_SCANNER_BLUEPRINT,
};
use crate::error::{FactoryError, Result};
use crate::mock_source::MockSource;

/// Mock 模拟器配置
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// 挂载时应该失败的 sensor labels
    pub fail_labels: Vec<String>,
    /// 模拟不支持激光雷达的模拟器
    pub without_range_scanner: bool,
    /// 每帧点云点数（与 points_per_second 无关，保持 mock 数据量小）
    pub points_per_frame: u32,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            fail_labels: Vec::new(),
            without_range_scanner: false,
            points_per_frame: 2048,
        }
    }
}

/// 已挂载的 mock 传感器记录
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnedSensor {
    pub actor_id: ActorId,
    pub parent: ActorId,
    pub label: String,
    pub blueprint: &'static str,
    pub transform: Transform,
    pub attributes: HashMap<String, String>,
}

/// Mock 模拟器客户端
pub struct MockSimulator {
    /// 配置（可注入失败场景）
    config: MockConfig,
    /// 样本时间戳来源
    clock: Arc<dyn Clock>,
    /// Actor ID 计数器
    next_actor_id: AtomicU32,
    /// 已挂载的传感器
    spawned: Mutex<Vec<SpawnedSensor>>,
}

impl MockSimulator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_config(MockConfig::default(), clock)
    }

    pub fn with_config(config: MockConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            next_actor_id: AtomicU32::new(1000), // 从 1000 开始，便于识别
            spawned: Mutex::new(Vec::new()),
        }
    }

    /// 获取所有已挂载的传感器
    pub fn spawned(&self) -> Vec<SpawnedSensor> {
        self.spawned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn spawn(
        &self,
        parent: ActorId,
        label: &str,
        blueprint: &'static str,
        transform: Transform,
        attributes: HashMap<String, String>,
    ) -> Result<ActorId> {
        if self.config.fail_labels.iter().any(|l| l == label) {
            return Err(FactoryError::attach(label, "mock failure"));
        }

        let actor_id = self.next_actor_id.fetch_add(1, Ordering::SeqCst);
        self.spawned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SpawnedSensor {
                actor_id,
                parent,
                label: label.to_string(),
                blueprint,
                transform,
                attributes,
            });
        Ok(actor_id)
    }
}

impl SimulatorClient for MockSimulator {
    #[instrument(name = "mock_attach_camera", skip(self, config), fields(label = %config.label))]
    async fn attach_camera(
        &self,
        parent: ActorId,
        config: &CameraConfig,
    ) -> Result<Box<dyn SampleSource<ImageData>>> {
        self.spawn(
            parent,
            &config.label,
            CAMERA_BLUEPRINT,
            config.placement.to_transform(),
            camera_attributes(config),
        )?;

        Ok(Box::new(MockSource::camera(
            config.label.clone(),
            config.width,
            config.height,
            config.rate,
            Arc::clone(&self.clock),
        )))
    }

    #[instrument(name = "mock_attach_range_scanner", skip(self, config), fields(label = %config.label))]
    async fn attach_range_scanner(
        &self,
        parent: ActorId,
        config: &RangeScannerConfig,
    ) -> Result<Box<dyn SampleSource<PointCloudData>>> {
        if self.config.without_range_scanner {
            return Err(FactoryError::UnsupportedKind(RANGE_SCANNER_BLUEPRINT.to_string()));
        }
        self.spawn(
            parent,
            &config.label,
            RANGE_SCANNER_BLUEPRINT,
            config.placement.to_transform(),
            range_scanner_attributes(config),
        )?;

        Ok(Box::new(MockSource::range_scanner(
            config.label.clone(),
            self.config.points_per_frame,
            config.rate,
            Arc::clone(&self.clock),
        )))
    }
}
