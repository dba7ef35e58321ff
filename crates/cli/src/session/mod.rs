//! Headless session module.

mod mock_world;
mod runner;
mod stats;

pub use runner::{RunnerConfig, SessionRunner};
pub use stats::RunStats;
