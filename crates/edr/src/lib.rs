//! # EDR
//!
//! 事件数据记录器 (Event Data Recorder)。
//!
//! 负责：
//! - 每个传感器的事件前环形缓冲 + 事件后队列
//! - 全局 Idle/Triggered 状态机（同一时间只有一个事件）
//! - 事件窗口落盘（图像 / 点云 / JSON / CSV）
//! - VRU 近距离接触检测 (SAT) 与热点日志
//!
//! ## 使用示例
//!
//! ```ignore
//! use edr::{EdrSession, SystemClock};
//!
//! let mut session = EdrSession::new(config.recorder.clone(), Arc::new(SystemClock))?;
//! session.add_sensor(Box::new(camera));
//!
//! // once per simulation tick
//! let outcome = session.tick(&world);
//! if let Some(report) = outcome.saved {
//!     println!("saved to {}", report.path.display());
//! }
//! ```

mod buffer;
mod clock;
mod error;
pub mod geometry;
mod near_miss;
mod perception;
mod persist;
mod recorder;
mod sensor;
mod session;
mod vehicle_state;

pub use buffer::{
    Admission, BufferSettings, EventWindow, SampleBuffer, SaveSnapshot, MAX_PRE_EVENT_SAMPLES,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{EdrError, Result};
pub use near_miss::{
    base_map_name, NearMiss, NearMissLogger, NearMissWatchdog, NEAR_MISS_LOG_HEADER,
    NEAR_MISS_REASON,
};
pub use perception::{
    build_snapshot, perception_sensor, PerceptionGenerator, PERCEPTION_GENERATION_HZ,
    PERCEPTION_RATE_HZ, PERCEPTION_SENSOR_ID,
};
pub use persist::{frame_file_name, sensor_dir, write_frames, Persist};
pub use recorder::{
    event_dir_name, Recorder, RecorderStats, SaveReport, SensorInfo, TriggeredEvent, REASON_FILE,
};
pub use sensor::{BufferedCounts, EdrSensor, FrameSensor, SensorHandle, RANGE_SCAN_RATE_HZ};
pub use session::{EdrSession, TickOutcome, MANUAL_TRIGGER_REASON};
pub use vehicle_state::{VehicleStateSensor, VEHICLE_STATE_FILE, VEHICLE_STATE_RATE_HZ};

// Re-export contracts types
pub use contracts::{Sample, SampleCallback, SampleSource, SensorKind, WorldSnapshot};
