//! EDR 指标收集模块
//!
//! 记录采样接收/拒绝、事件触发和保存结果。未安装 recorder 时所有调用均为空操作。

use metrics::{counter, histogram};

/// 记录被缓冲区接收的采样
pub fn record_sample_accepted(sensor_kind: &str) {
    counter!(
        "carla_edr_samples_accepted_total",
        "sensor_kind" => sensor_kind.to_string()
    )
    .increment(1);
}

/// 记录被丢弃的采样 (reason: saving / window_closed / rate_limited)
pub fn record_sample_rejected(sensor_kind: &str, reason: &str) {
    counter!(
        "carla_edr_samples_rejected_total",
        "sensor_kind" => sensor_kind.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// 记录事件触发
pub fn record_event_triggered() {
    counter!("carla_edr_events_triggered_total").increment(1);
}

/// 记录被忽略的重复触发
pub fn record_trigger_ignored() {
    counter!("carla_edr_triggers_ignored_total").increment(1);
}

/// 记录一次保存
pub fn record_save(success: bool, duration_ms: f64) {
    let outcome = if success { "success" } else { "failure" };
    counter!("carla_edr_saves_total", "outcome" => outcome).increment(1);
    histogram!("carla_edr_save_duration_ms").record(duration_ms);
}

/// 记录写入磁盘的采样数
pub fn record_samples_written(sensor_kind: &str, count: usize) {
    counter!(
        "carla_edr_samples_written_total",
        "sensor_kind" => sensor_kind.to_string()
    )
    .increment(count as u64);
}

/// EDR 指标聚合器
///
/// 在内存中聚合，便于无 exporter 时输出摘要。
#[derive(Debug, Clone, Default)]
pub struct EdrMetricsAggregator {
    events_triggered: u64,
    triggers_ignored: u64,
    saves_succeeded: u64,
    saves_failed: u64,
    samples_written: u64,
    save_duration_ms: RunningStats,
}

impl EdrMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_trigger(&mut self, accepted: bool) {
        if accepted {
            self.events_triggered += 1;
        } else {
            self.triggers_ignored += 1;
        }
    }

    pub fn on_save(&mut self, success: bool, duration_ms: f64, samples_written: usize) {
        if success {
            self.saves_succeeded += 1;
        } else {
            self.saves_failed += 1;
        }
        self.samples_written += samples_written as u64;
        self.save_duration_ms.push(duration_ms);
    }

    /// 生成摘要
    pub fn summary(&self) -> EdrMetricsSummary {
        EdrMetricsSummary {
            events_triggered: self.events_triggered,
            triggers_ignored: self.triggers_ignored,
            saves_succeeded: self.saves_succeeded,
            saves_failed: self.saves_failed,
            samples_written: self.samples_written,
            save_duration_ms: StatsSummary::from(&self.save_duration_ms),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// EDR 指标摘要
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdrMetricsSummary {
    pub events_triggered: u64,
    pub triggers_ignored: u64,
    pub saves_succeeded: u64,
    pub saves_failed: u64,
    pub samples_written: u64,
    pub save_duration_ms: StatsSummary,
}

impl std::fmt::Display for EdrMetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== EDR Summary ===")?;
        writeln!(f, "Events triggered: {}", self.events_triggered)?;
        writeln!(f, "Triggers ignored: {}", self.triggers_ignored)?;
        writeln!(
            f,
            "Saves: {} ok, {} failed",
            self.saves_succeeded, self.saves_failed
        )?;
        writeln!(f, "Samples written: {}", self.samples_written)?;
        writeln!(f, "Save duration (ms): {}", self.save_duration_ms)
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}
