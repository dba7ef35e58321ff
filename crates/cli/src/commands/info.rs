//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{CameraConfig, EdrConfig, RangeScannerConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    recorder: RecorderInfo,
    cameras: Vec<SensorInfo>,
    lidars3d: Vec<SensorInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    skipped: Vec<String>,
}

#[derive(Serialize)]
struct RecorderInfo {
    pre_event_seconds: f64,
    post_event_seconds: f64,
    save_delay_seconds: f64,
    autosave: bool,
    data_path: String,
    vehicle_state: bool,
    perception: bool,
    perception_range_m: f64,
    near_miss_min_ego_speed: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    near_miss_log: Option<String>,
}

#[derive(Serialize)]
struct SensorInfo {
    label: String,
    sensor_type: &'static str,
    rate_hz: f64,
    position: [f64; 3],
    orientation: [f64; 3],
    detail: String,
}

impl From<&CameraConfig> for SensorInfo {
    fn from(cfg: &CameraConfig) -> Self {
        let p = cfg.placement;
        Self {
            label: cfg.label.clone(),
            sensor_type: "camera",
            rate_hz: cfg.rate,
            position: [p.x, p.y, p.z],
            orientation: [p.roll, p.pitch, p.yaw],
            detail: format!("{}x{} fov={}°", cfg.width, cfg.height, cfg.fov),
        }
    }
}

impl From<&RangeScannerConfig> for SensorInfo {
    fn from(cfg: &RangeScannerConfig) -> Self {
        let p = cfg.placement;
        Self {
            label: cfg.label.clone(),
            sensor_type: "lidar3d",
            rate_hz: cfg.rate,
            position: [p.x, p.y, p.z],
            orientation: [p.roll, p.pitch, p.yaw],
            detail: format!(
                "{} ch, {} m, {} pts/s, fov [{}, {}]",
                cfg.channels, cfg.range, cfg.points_per_second, cfg.lower_fov, cfg.upper_fov
            ),
        }
    }
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration for info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let report = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let mut config_info = build_config_info(&report.config);
    config_info.skipped = report.skipped.iter().map(ToString::to_string).collect();

    if args.json {
        let json = serde_json::to_string_pretty(&config_info)
            .context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config_info, args.sensors);
    }

    Ok(())
}

fn build_config_info(config: &EdrConfig) -> ConfigInfo {
    let recorder = &config.recorder;
    ConfigInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        recorder: RecorderInfo {
            pre_event_seconds: recorder.pre_event_seconds,
            post_event_seconds: recorder.post_event_seconds,
            save_delay_seconds: recorder.save_delay_seconds,
            autosave: recorder.autosave,
            data_path: recorder.data_path.display().to_string(),
            vehicle_state: recorder.vehicle_state,
            perception: recorder.perception.enabled,
            perception_range_m: recorder.perception.range_m,
            near_miss_min_ego_speed: recorder.near_miss.min_ego_speed,
            near_miss_log: recorder
                .near_miss
                .log_file
                .as_ref()
                .map(|p| p.display().to_string()),
        },
        cameras: config.sensors.cameras.iter().map(SensorInfo::from).collect(),
        lidars3d: config.sensors.lidars3d.iter().map(SensorInfo::from).collect(),
        skipped: Vec::new(),
    }
}

fn print_config_info(info: &ConfigInfo, show_sensors: bool) {
    println!("CARLA EDR Configuration");
    println!("=======================");
    println!("Version: {}\n", info.version);

    let r = &info.recorder;
    println!("Recorder");
    println!("   ├─ Window: -{}s / +{}s", r.pre_event_seconds, r.post_event_seconds);
    println!("   ├─ Autosave: {} (delay {}s)", r.autosave, r.save_delay_seconds);
    println!("   ├─ Data path: {}", r.data_path);
    println!("   ├─ Vehicle state: {}", r.vehicle_state);
    println!("   ├─ Perception: {} ({} m)", r.perception, r.perception_range_m);
    match &r.near_miss_log {
        Some(log) => println!(
            "   └─ Near miss: ego >= {} m/s, log {}",
            r.near_miss_min_ego_speed, log
        ),
        None => println!("   └─ Near miss: ego >= {} m/s", r.near_miss_min_ego_speed),
    }

    println!("\nSensors");
    println!("   ├─ Cameras: {}", info.cameras.len());
    println!("   └─ Lidars: {}", info.lidars3d.len());

    if show_sensors {
        let all: Vec<_> = info.lidars3d.iter().chain(&info.cameras).collect();
        for (i, sensor) in all.iter().enumerate() {
            let prefix = if i == all.len() - 1 { "└─" } else { "├─" };
            println!(
                "   {} {} [{}] @ {} Hz, pos {:?}, rot {:?}, {}",
                prefix,
                sensor.label,
                sensor.sensor_type,
                sensor.rate_hz,
                sensor.position,
                sensor.orientation,
                sensor.detail
            );
        }
    }

    if !info.skipped.is_empty() {
        println!("\nSkipped ({})", info.skipped.len());
        for entry in &info.skipped {
            println!("   - {}", entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_config_info_lists_sensors() {
        let config = EdrConfig {
            sensors: contracts::EdrSensorConfig {
                cameras: vec![serde_json::from_value(serde_json::json!({"label": "front"})).unwrap()],
                lidars3d: vec![serde_json::from_value(serde_json::json!({"label": "roof"})).unwrap()],
            },
            ..Default::default()
        };

        let info = build_config_info(&config);
        assert_eq!(info.cameras.len(), 1);
        assert_eq!(info.cameras[0].sensor_type, "camera");
        assert_eq!(info.lidars3d[0].label, "roof");
        assert!(info.recorder.near_miss_log.is_none());
    }
}
