//! 配置解析模块
//!
//! 支持 TOML 和 JSON 格式。文档先被解析为通用的 JSON 值树，
//! 以便逐条反序列化传感器条目，单条失败不影响其它条目。

use contracts::ContractError;
use serde_json::{Map, Value};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式
    Toml,
    /// JSON 格式 (原有传感器配置文件)
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式文档
pub fn parse_toml(content: &str) -> Result<Value, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式文档
pub fn parse_json(content: &str) -> Result<Value, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析文档，顶层必须是表/对象
pub fn parse(content: &str, format: ConfigFormat) -> Result<Map<String, Value>, ContractError> {
    let document = match format {
        ConfigFormat::Toml => parse_toml(content)?,
        ConfigFormat::Json => parse_json(content)?,
    };

    match document {
        Value::Object(map) => Ok(map),
        other => Err(ContractError::config_parse(format!(
            "top-level value must be a table, got {}",
            value_kind(&other)
        ))),
    }
}

/// 值类型名 (用于诊断信息)
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "table",
    }
}
