//! 传感器类型与数据载荷
//!
//! EDR 传感器的种类以及各自的原始数据结构。

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// EDR 传感器种类
///
/// 种类决定保存时的子目录名。`Custom` 允许扩展新的数据源。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SensorKind {
    /// 车辆状态 (CAN 总线 / GNSS)
    VehicleState,
    /// 感知快照 (ground truth)
    Perception,
    /// 相机图像
    Image,
    /// 3D 激光雷达
    RangeScan,
    /// 自定义种类，值为保存目录名
    Custom(String),
}

impl SensorKind {
    /// 保存时使用的目录名
    pub fn dir_name(&self) -> &str {
        match self {
            Self::VehicleState => "vehicle-state",
            Self::Perception => "perception",
            Self::Image => "images",
            Self::RangeScan => "lidar3d",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// 图像数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    /// 图像宽度
    pub width: u32,

    /// 图像高度
    pub height: u32,

    /// 像素格式
    pub format: ImageFormat,

    /// 原始像素数据
    pub data: Bytes,
}

/// 图像格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Rgb8,
    Rgba8,
    Bgra8,
}

impl ImageFormat {
    /// 每像素字节数
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb8 => 3,
            Self::Rgba8 | Self::Bgra8 => 4,
        }
    }
}

/// LiDAR 点云数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointCloudData {
    /// 点数量
    pub num_points: u32,

    /// 每点字节数 (通常 16: x,y,z,intensity)
    pub point_stride: u32,

    /// 点云数据 (little endian f32)
    pub data: Bytes,
}

/// 3D 向量
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean length
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_dir_names() {
        assert_eq!(SensorKind::VehicleState.dir_name(), "vehicle-state");
        assert_eq!(SensorKind::Image.dir_name(), "images");
        assert_eq!(SensorKind::RangeScan.dir_name(), "lidar3d");
        assert_eq!(SensorKind::Custom("radar".into()).to_string(), "radar");
    }

    #[test]
    fn vector_norm() {
        assert_eq!(Vector3::new(3.0, 4.0, 0.0).norm(), 5.0);
    }
}
