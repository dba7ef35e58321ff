//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    skipped: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    camera_count: usize,
    lidar_count: usize,
    pre_event_seconds: f64,
    post_event_seconds: f64,
    autosave: bool,
}

impl ValidationResult {
    fn invalid(config_path: String, error: String) -> Self {
        Self {
            valid: false,
            config_path,
            error: Some(error),
            skipped: Vec::new(),
            warnings: Vec::new(),
            summary: None,
        }
    }
}

/// Execute the `validate` command
///
/// Skipped sensor entries do not make the file invalid: they are reported
/// and the rest of the configuration is usable.
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        let error = format!("File not found: {}", args.config.display());
        return ValidationResult::invalid(config_path, error);
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(report) => {
            let config = &report.config;
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                skipped: report.skipped.iter().map(ToString::to_string).collect(),
                warnings: report.warnings.clone(),
                summary: Some(ConfigSummary {
                    camera_count: config.sensors.cameras.len(),
                    lidar_count: config.sensors.lidars3d.len(),
                    pre_event_seconds: config.recorder.pre_event_seconds,
                    post_event_seconds: config.recorder.post_event_seconds,
                    autosave: config.recorder.autosave,
                }),
            }
        }
        Err(e) => ValidationResult::invalid(config_path, e.to_string()),
    }
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Cameras: {}", summary.camera_count);
            println!("  Lidars: {}", summary.lidar_count);
            println!(
                "  Window: -{}s / +{}s",
                summary.pre_event_seconds, summary.post_event_seconds
            );
            println!("  Autosave: {}", summary.autosave);
        }

        if !result.skipped.is_empty() {
            println!("\n⚠ Skipped entries:");
            for entry in &result.skipped {
                println!("  - {}", entry);
            }
        }

        if !result.warnings.is_empty() {
            println!("\n⚠ Warnings:");
            for warning in &result.warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
