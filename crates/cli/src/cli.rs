//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CARLA EDR - Event data recorder for the CARLA driving simulator
#[derive(Parser, Debug)]
#[command(
    name = "carla-edr",
    author,
    version,
    about = "CARLA event data recorder",
    long_about = "A black-box event data recorder for CARLA driving sessions.\n\n\
                  Buffers recent camera, lidar, perception and vehicle-state data, \n\
                  freezes a pre/post-event window on trigger and writes it to disk."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "CARLA_EDR_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "CARLA_EDR_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a headless recording session against the mock simulator
    Run(RunArgs),

    /// Validate an EDR sensor configuration file
    Validate(ValidateArgs),

    /// Display configured sensors and recorder settings
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to EDR configuration file (TOML or JSON)
    #[arg(short, long, default_value = "edr.toml", env = "CARLA_EDR_CONFIG")]
    pub config: PathBuf,

    /// Session length in seconds
    #[arg(long, default_value = "10", env = "CARLA_EDR_DURATION")]
    pub duration: f64,

    /// Fire a manual trigger after this many seconds
    #[arg(long, env = "CARLA_EDR_TRIGGER_AFTER")]
    pub trigger_after: Option<f64>,

    /// Place a pedestrian so the ego vehicle reaches it after this many seconds
    #[arg(long)]
    pub vru_after: Option<f64>,

    /// Ego vehicle speed in m/s
    #[arg(long, default_value = "8", env = "CARLA_EDR_EGO_SPEED")]
    pub ego_speed: f64,

    /// Session tick rate in Hz
    #[arg(long, default_value = "100", env = "CARLA_EDR_TICK_RATE")]
    pub tick_rate: f64,

    /// Save events automatically once the post-event window has passed
    #[arg(long)]
    pub autosave: bool,

    /// Override the data directory from configuration
    #[arg(long, env = "CARLA_EDR_DATA_PATH")]
    pub data_path: Option<PathBuf>,

    /// Save a pending event when the session ends
    #[arg(long)]
    pub save_on_exit: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "CARLA_EDR_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "edr.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "edr.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show placement and capture parameters of every sensor
    #[arg(long)]
    pub sensors: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(value: LogFormat) -> Self {
        match value {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from([
            "carla-edr",
            "-v",
            "run",
            "--config",
            "sensors.json",
            "--trigger-after",
            "3",
            "--autosave",
        ]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.config, PathBuf::from("sensors.json"));
                assert_eq!(args.trigger_after, Some(3.0));
                assert!(args.autosave);
                assert_eq!(args.duration, 10.0);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["carla-edr", "-q", "-v", "info"]).is_err());
    }
}
