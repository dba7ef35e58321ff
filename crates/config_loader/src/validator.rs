//! 配置校验模块
//!
//! 校验规则：
//! - recorder 设置非法 → 整个配置无效
//! - 传感器条目：label 非空、数值范围合法、同一类型内 label 唯一
//!   (条目级错误只跳过该条目)

use std::collections::HashSet;

use contracts::{CameraConfig, ContractError, RangeScannerConfig, RecorderSettings};
use validator::Validate;

/// 带 label 的传感器条目
pub trait SensorEntry: Validate {
    fn label(&self) -> &str;
}

impl SensorEntry for CameraConfig {
    fn label(&self) -> &str {
        &self.label
    }
}

impl SensorEntry for RangeScannerConfig {
    fn label(&self) -> &str {
        &self.label
    }
}

/// 条目被拒绝的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryRejection {
    /// label 缺失或为空
    MissingLabel,
    /// 同一类型中已存在该 label
    DuplicateLabel(String),
    /// 字段取值非法
    Invalid(String),
}

impl std::fmt::Display for EntryRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingLabel => f.write_str("missing or empty label"),
            Self::DuplicateLabel(label) => write!(f, "duplicate label '{label}'"),
            Self::Invalid(message) => write!(f, "invalid values: {message}"),
        }
    }
}

/// 校验会话设置
pub fn validate_recorder(settings: &RecorderSettings) -> Result<(), ContractError> {
    settings
        .validate()
        .map_err(|e| ContractError::config_validation("recorder", e.to_string()))
}

/// 校验单个传感器条目，`seen` 记录本类型中已接受的 label
pub fn validate_entry<T: SensorEntry>(
    entry: &T,
    seen: &mut HashSet<String>,
) -> Result<(), EntryRejection> {
    let label = entry.label();
    if label.trim().is_empty() {
        return Err(EntryRejection::MissingLabel);
    }

    entry
        .validate()
        .map_err(|e| EntryRejection::Invalid(e.to_string()))?;

    if !seen.insert(label.to_string()) {
        return Err(EntryRejection::DuplicateLabel(label.to_string()));
    }

    Ok(())
}
