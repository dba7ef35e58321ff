//! # Sensor Factory
//!
//! Simulator sensor factory module.
//!
//! Responsibilities:
//! - Attach cameras and range scanners from `EdrSensorConfig`
//! - Register the resulting EDR sensors with the `Recorder`
//! - Keep going when a single sensor fails to attach
//! - Provide a mock simulator with threaded mock producers

pub mod client;
pub mod error;
pub mod factory;
pub mod mock_simulator;
pub mod mock_source;

pub use client::{
    camera_attributes, range_scanner_attributes, SimulatorClient, CAMERA_BLUEPRINT,
    RANGE_SCANNER_BLUEPRINT,
};
pub use error::{FactoryError, Result};
pub use factory::{AttachFailure, AttachReport, SensorFactory};
pub use mock_simulator::{MockConfig, MockSimulator, SpawnedSensor};
pub use mock_source::MockSource;
