//! EdrConfig - Config Loader 输出
//!
//! 描述 EDR 会话设置以及需要挂载的感知传感器（相机、激光雷达）。
//! 传感器条目沿用扁平格式：`label, x, y, z, roll, pitch, yaw` 加上类型特定参数。

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// 完整的 EDR 配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdrConfig {
    /// 会话设置
    #[serde(default)]
    pub recorder: RecorderSettings,

    /// 传感器定义
    #[serde(flatten)]
    pub sensors: EdrSensorConfig,
}

/// 传感器定义列表
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdrSensorConfig {
    /// 3D 激光雷达
    #[serde(default)]
    pub lidars3d: Vec<RangeScannerConfig>,

    /// 相机
    #[serde(default)]
    pub cameras: Vec<CameraConfig>,
}

impl EdrSensorConfig {
    /// 传感器总数
    pub fn len(&self) -> usize {
        self.lidars3d.len() + self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 3D 变换：位置 + 旋转
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// 位置 (x, y, z) 单位：米
    pub location: Location,

    /// 旋转 (pitch, yaw, roll) 单位：度
    pub rotation: Rotation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

/// 挂载位姿（扁平字段，缺省为 0）
///
/// +x 向前，+y 向右，+z 向上；+roll 顺时针，+pitch 向上，+yaw 向右。
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub roll: f64,
    #[serde(default)]
    pub pitch: f64,
    #[serde(default)]
    pub yaw: f64,
}

impl Placement {
    pub fn to_transform(&self) -> Transform {
        Transform {
            location: Location {
                x: self.x,
                y: self.y,
                z: self.z,
            },
            rotation: Rotation {
                pitch: self.pitch,
                yaw: self.yaw,
                roll: self.roll,
            },
        }
    }
}

/// 相机配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CameraConfig {
    /// 传感器 ID，空字符串的条目被忽略
    #[serde(default)]
    pub label: String,

    #[serde(flatten)]
    pub placement: Placement,

    /// 图像宽度 (像素)
    #[serde(default = "default_camera_width")]
    #[validate(range(min = 1))]
    pub width: u32,

    /// 图像高度 (像素)
    #[serde(default = "default_camera_height")]
    #[validate(range(min = 1))]
    pub height: u32,

    /// 水平视场角 (度)
    #[serde(default = "default_camera_fov")]
    #[validate(range(exclusive_min = 0.0, exclusive_max = 180.0))]
    pub fov: f64,

    /// 采样频率 (Hz)，范围 (0, 1000]
    #[serde(default = "default_camera_rate")]
    #[validate(range(exclusive_min = 0.0, max = 1000.0))]
    pub rate: f64,
}

pub const DEFAULT_CAMERA_WIDTH: u32 = 720;
pub const DEFAULT_CAMERA_HEIGHT: u32 = 480;
pub const DEFAULT_CAMERA_FOV: f64 = 110.0;
pub const DEFAULT_CAMERA_RATE: f64 = 10.0;

fn default_camera_width() -> u32 {
    DEFAULT_CAMERA_WIDTH
}

fn default_camera_height() -> u32 {
    DEFAULT_CAMERA_HEIGHT
}

fn default_camera_fov() -> f64 {
    DEFAULT_CAMERA_FOV
}

fn default_camera_rate() -> f64 {
    DEFAULT_CAMERA_RATE
}

/// 3D 激光雷达配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RangeScannerConfig {
    /// 传感器 ID，空字符串的条目被忽略
    #[serde(default)]
    pub label: String,

    #[serde(flatten)]
    pub placement: Placement,

    /// 线数
    #[serde(default = "default_lidar_channels")]
    #[validate(range(min = 1))]
    pub channels: u32,

    /// 最大测距 (米)
    #[serde(default = "default_lidar_range")]
    #[validate(range(exclusive_min = 0.0))]
    pub range: f64,

    #[serde(default = "default_lidar_upper_fov")]
    pub upper_fov: f64,

    #[serde(default = "default_lidar_lower_fov")]
    pub lower_fov: f64,

    /// 旋转频率 (Hz)
    #[serde(default = "default_lidar_rotation_frequency")]
    #[validate(range(exclusive_min = 0.0))]
    pub rotation_frequency: f64,

    /// 每秒点数 (1024 点 x 64 线 x 10 Hz)
    #[serde(default = "default_lidar_points_per_second")]
    #[validate(range(min = 1))]
    pub points_per_second: u32,

    /// 采样频率 (Hz)，范围 (0, 1000]
    #[serde(default = "default_lidar_rate")]
    #[validate(range(exclusive_min = 0.0, max = 1000.0))]
    pub rate: f64,
}

fn default_lidar_channels() -> u32 {
    64
}

fn default_lidar_range() -> f64 {
    100.0
}

fn default_lidar_upper_fov() -> f64 {
    22.5
}

fn default_lidar_lower_fov() -> f64 {
    -22.5
}

fn default_lidar_rotation_frequency() -> f64 {
    20.0
}

fn default_lidar_points_per_second() -> u32 {
    655_360
}

fn default_lidar_rate() -> f64 {
    10.0
}

/// EDR 会话设置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecorderSettings {
    /// 事件前记录时长 (秒)，最长 600
    #[serde(default = "default_pre_event_seconds")]
    #[validate(range(min = 0.0, max = 600.0))]
    pub pre_event_seconds: f64,

    /// 事件后记录时长 (秒)，最长 600
    #[serde(default = "default_post_event_seconds")]
    #[validate(range(min = 0.0, max = 600.0))]
    pub post_event_seconds: f64,

    /// 事件后窗口结束到保存之间的额外等待 (秒)
    #[serde(default = "default_save_delay_seconds")]
    #[validate(range(min = 0.0))]
    pub save_delay_seconds: f64,

    /// 窗口结束后自动保存
    #[serde(default)]
    pub autosave: bool,

    /// 保存根目录
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    /// 启用车辆状态传感器
    #[serde(default = "default_true")]
    pub vehicle_state: bool,

    #[serde(default)]
    #[validate(nested)]
    pub perception: PerceptionSettings,

    #[serde(default)]
    #[validate(nested)]
    pub near_miss: NearMissSettings,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            pre_event_seconds: default_pre_event_seconds(),
            post_event_seconds: default_post_event_seconds(),
            save_delay_seconds: default_save_delay_seconds(),
            autosave: false,
            data_path: default_data_path(),
            vehicle_state: true,
            perception: PerceptionSettings::default(),
            near_miss: NearMissSettings::default(),
        }
    }
}

/// 感知快照设置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PerceptionSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// 感知半径 (米)
    #[serde(default = "default_perception_range")]
    #[validate(range(exclusive_min = 0.0))]
    pub range_m: f64,
}

impl Default for PerceptionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            range_m: default_perception_range(),
        }
    }
}

/// 近距离接触 (near miss) 检测设置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NearMissSettings {
    /// 自车速度低于该值 (m/s) 时不检测
    #[serde(default = "default_near_miss_velocity")]
    #[validate(range(min = 0.0))]
    pub min_ego_speed: f64,

    /// 热点日志文件 (可跨多次运行共享)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// 当前地图名，写入热点日志首行
    #[serde(default)]
    pub map_name: String,
}

impl Default for NearMissSettings {
    fn default() -> Self {
        Self {
            min_ego_speed: default_near_miss_velocity(),
            log_file: None,
            map_name: String::new(),
        }
    }
}

fn default_pre_event_seconds() -> f64 {
    5.0
}

fn default_post_event_seconds() -> f64 {
    2.0
}

fn default_save_delay_seconds() -> f64 {
    2.0
}

fn default_perception_range() -> f64 {
    50.0
}

fn default_near_miss_velocity() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_data_path() -> PathBuf {
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join("data").join("edr"))
        .unwrap_or_else(|| PathBuf::from("data/edr"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_defaults_from_flat_json() {
        let camera: CameraConfig =
            serde_json::from_str(r#"{ "label": "front", "x": 1.5, "z": 2.4, "yaw": 10.0 }"#)
                .unwrap();
        assert_eq!(camera.label, "front");
        assert_eq!(camera.width, 720);
        assert_eq!(camera.height, 480);
        assert_eq!(camera.fov, 110.0);
        assert_eq!(camera.rate, 10.0);

        let transform = camera.placement.to_transform();
        assert_eq!(transform.location.x, 1.5);
        assert_eq!(transform.location.y, 0.0);
        assert_eq!(transform.rotation.yaw, 10.0);
        assert!(camera.validate().is_ok());
    }

    #[test]
    fn camera_validation_rejects_bad_values() {
        let camera: CameraConfig =
            serde_json::from_str(r#"{ "label": "bad", "width": 0, "rate": -1.0 }"#).unwrap();
        let err = camera.validate().unwrap_err();
        let fields = err.field_errors();
        assert!(fields.contains_key("width"));
        assert!(fields.contains_key("rate"));
    }

    #[test]
    fn sample_rates_are_bounded() {
        let camera: CameraConfig =
            serde_json::from_str(r#"{ "label": "fast", "rate": 1e15 }"#).unwrap();
        assert!(camera.validate().unwrap_err().field_errors().contains_key("rate"));

        let lidar: RangeScannerConfig =
            serde_json::from_str(r#"{ "label": "fast", "rate": 1000.5 }"#).unwrap();
        assert!(lidar.validate().unwrap_err().field_errors().contains_key("rate"));

        let camera: CameraConfig =
            serde_json::from_str(r#"{ "label": "ok", "rate": 1000.0 }"#).unwrap();
        assert!(camera.validate().is_ok());
    }

    #[test]
    fn lidar_defaults() {
        let lidar: RangeScannerConfig = serde_json::from_str(r#"{ "label": "roof" }"#).unwrap();
        assert_eq!(lidar.channels, 64);
        assert_eq!(lidar.points_per_second, 655_360);
        assert_eq!(lidar.rate, 10.0);
        assert!(lidar.validate().is_ok());
    }

    #[test]
    fn recorder_settings_defaults() {
        let settings = RecorderSettings::default();
        assert_eq!(settings.pre_event_seconds, 5.0);
        assert_eq!(settings.post_event_seconds, 2.0);
        assert_eq!(settings.save_delay_seconds, 2.0);
        assert!(!settings.autosave);
        assert!(settings.vehicle_state);
        assert!(settings.perception.enabled);
        assert_eq!(settings.perception.range_m, 50.0);
        assert_eq!(settings.near_miss.min_ego_speed, 1.0);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn recorder_settings_nested_validation() {
        let mut settings = RecorderSettings::default();
        settings.perception.range_m = 0.0;
        settings.pre_event_seconds = -1.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn recorder_window_is_bounded() {
        let mut settings = RecorderSettings::default();
        settings.pre_event_seconds = 1e6;
        let err = settings.validate().unwrap_err();
        assert!(err.field_errors().contains_key("pre_event_seconds"));

        settings.pre_event_seconds = 600.0;
        settings.post_event_seconds = 601.0;
        let err = settings.validate().unwrap_err();
        assert!(err.field_errors().contains_key("post_event_seconds"));
    }
}
