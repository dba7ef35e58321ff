//! # Config Loader
//!
//! EDR configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate session settings (fatal on error)
//! - Load sensor entries one by one, skipping and reporting bad entries
//! - Generate a `LoadReport` wrapping the `EdrConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let report = ConfigLoader::load_from_path(Path::new("edr_sensors.json")).unwrap();
//! println!("Cameras: {}", report.config.sensors.cameras.len());
//! for skipped in &report.skipped {
//!     eprintln!("skipped {skipped}");
//! }
//! ```

mod parser;
mod validator;

pub use contracts::EdrConfig;
pub use parser::ConfigFormat;
pub use validator::EntryRejection;

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use contracts::{ContractError, RecorderSettings};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::validator::SensorEntry;

const RECORDER_KEY: &str = "recorder";
const LIDARS_KEY: &str = "lidars3d";
const CAMERAS_KEY: &str = "cameras";

/// A sensor entry that was not loaded
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedEntry {
    /// Section name (`cameras` / `lidars3d`)
    pub section: String,
    /// Index within the section, `None` when the whole section was rejected
    pub index: Option<usize>,
    /// Label, if one could be read
    pub label: Option<String>,
    pub reason: String,
}

impl fmt::Display for SkippedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.section)?;
        if let Some(index) = self.index {
            write!(f, "[{index}]")?;
        }
        if let Some(label) = &self.label {
            write!(f, " ({label})")?;
        }
        write!(f, ": {}", self.reason)
    }
}

/// Result of a lenient configuration load
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Successfully loaded configuration
    pub config: EdrConfig,
    /// Entries skipped because they were malformed
    pub skipped: Vec<SkippedEntry>,
    /// Non-fatal observations (unknown keys, empty sections)
    pub warnings: Vec<String>,
}

impl LoadReport {
    /// True when every sensor entry was loaded
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Document parse failure
    /// - Invalid `[recorder]` settings
    ///
    /// Malformed sensor entries are not errors; they end up in
    /// [`LoadReport::skipped`].
    pub fn load_from_path(path: &Path) -> Result<LoadReport, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        info!(
            file = %path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
            "loading EDR sensor configuration"
        );
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<LoadReport, ContractError> {
        let document = parser::parse(content, format)?;
        Self::build_report(document)
    }

    /// Serialize EdrConfig to TOML string
    pub fn to_toml(config: &EdrConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize EdrConfig to JSON string
    pub fn to_json(config: &EdrConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn build_report(mut document: Map<String, Value>) -> Result<LoadReport, ContractError> {
        let mut report = LoadReport::default();

        report.config.recorder = match document.remove(RECORDER_KEY) {
            Some(value) => {
                let settings: RecorderSettings = serde_json::from_value(value).map_err(|e| {
                    ContractError::ConfigParse {
                        message: format!("invalid [recorder] section: {e}"),
                        source: Some(Box::new(e)),
                    }
                })?;
                validator::validate_recorder(&settings)?;
                settings
            }
            None => RecorderSettings::default(),
        };

        report.config.sensors.lidars3d =
            Self::collect_section(LIDARS_KEY, document.remove(LIDARS_KEY), &mut report);
        report.config.sensors.cameras =
            Self::collect_section(CAMERAS_KEY, document.remove(CAMERAS_KEY), &mut report);

        for key in document.keys() {
            report.warnings.push(format!("unknown key '{key}' ignored"));
        }
        if report.config.sensors.is_empty() {
            report
                .warnings
                .push("no cameras or lidars configured".to_string());
        }

        info!(
            lidars = report.config.sensors.lidars3d.len(),
            cameras = report.config.sensors.cameras.len(),
            skipped = report.skipped.len(),
            "EDR sensor configuration loaded"
        );

        Ok(report)
    }

    /// Deserialize and validate each entry of a section independently
    fn collect_section<T>(section: &str, value: Option<Value>, report: &mut LoadReport) -> Vec<T>
    where
        T: DeserializeOwned + SensorEntry,
    {
        let entries = match value {
            None => return Vec::new(),
            Some(Value::Array(entries)) => entries,
            Some(other) => {
                warn!(section, "section is not a list, ignoring it");
                report.skipped.push(SkippedEntry {
                    section: section.to_string(),
                    index: None,
                    label: None,
                    reason: format!("expected a list, got {}", parser::value_kind(&other)),
                });
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        let mut loaded = Vec::with_capacity(entries.len());

        for (index, entry) in entries.into_iter().enumerate() {
            let label = entry
                .get("label")
                .and_then(Value::as_str)
                .filter(|l| !l.is_empty())
                .map(str::to_string);

            let parsed = serde_json::from_value::<T>(entry)
                .map_err(|e| format!("malformed entry: {e}"))
                .and_then(|parsed| {
                    validator::validate_entry(&parsed, &mut seen)
                        .map(|()| parsed)
                        .map_err(|rejection| rejection.to_string())
                });

            match parsed {
                Ok(parsed) => {
                    debug!(section, label = %parsed.label(), "sensor entry loaded");
                    loaded.push(parsed);
                }
                Err(reason) => {
                    warn!(section, index, label = ?label, reason = %reason, "skipping sensor entry");
                    report.skipped.push(SkippedEntry {
                        section: section.to_string(),
                        index: Some(index),
                        label,
                        reason,
                    });
                }
            }
        }

        loaded
    }
}
