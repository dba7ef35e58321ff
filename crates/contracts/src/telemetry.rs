//! Vehicle-state telemetry
//!
//! The kind of information a vehicle CAN bus and GNSS receiver would give:
//! speed, local-frame velocity/acceleration, pedal and steering inputs and
//! position. Each field has a stable CSV column label and unit.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Vector3;

const MPS_TO_KMH: f64 = 3.6;

/// A single recorded vehicle-state field.
///
/// Declaration order is the CSV column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateField {
    AcceleratorPedal,
    BrakePedal,
    DeltaVLateral,
    DeltaVLongitudinal,
    EngineRpm,
    Altitude,
    Latitude,
    Longitude,
    LateralAcceleration,
    LateralVelocity,
    LongitudinalAcceleration,
    LongitudinalVelocity,
    NormalAcceleration,
    NormalVelocity,
    ServiceBrake,
    Speed,
    SteeringInput,
}

impl StateField {
    /// Every field, in column order
    pub const ALL: [StateField; 17] = [
        Self::AcceleratorPedal,
        Self::BrakePedal,
        Self::DeltaVLateral,
        Self::DeltaVLongitudinal,
        Self::EngineRpm,
        Self::Altitude,
        Self::Latitude,
        Self::Longitude,
        Self::LateralAcceleration,
        Self::LateralVelocity,
        Self::LongitudinalAcceleration,
        Self::LongitudinalVelocity,
        Self::NormalAcceleration,
        Self::NormalVelocity,
        Self::ServiceBrake,
        Self::Speed,
        Self::SteeringInput,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::AcceleratorPedal => "Accelerator Pedal",
            Self::BrakePedal => "Brake Pedal",
            Self::DeltaVLateral => "Delta-V Lateral",
            Self::DeltaVLongitudinal => "Delta-V Longitudinal",
            Self::EngineRpm => "Engine RPM",
            Self::Altitude => "Altitude",
            Self::Latitude => "Latitude",
            Self::Longitude => "Longitude",
            Self::LateralAcceleration => "Lateral Acceleration",
            Self::LateralVelocity => "Lateral Velocity",
            Self::LongitudinalAcceleration => "Longitudinal Acceleration",
            Self::LongitudinalVelocity => "Longitudinal Velocity",
            Self::NormalAcceleration => "Normal Acceleration",
            Self::NormalVelocity => "Normal Velocity",
            Self::ServiceBrake => "Service Brake",
            Self::Speed => "Speed",
            Self::SteeringInput => "Steering Input",
        }
    }

    /// Unit suffix, empty when dimensionless
    pub fn units(self) -> &'static str {
        match self {
            Self::AcceleratorPedal | Self::BrakePedal | Self::SteeringInput => "%",
            Self::DeltaVLateral | Self::DeltaVLongitudinal => "m/s",
            Self::EngineRpm => "rpm",
            Self::Altitude => "m",
            Self::Latitude | Self::Longitude | Self::ServiceBrake => "",
            Self::LateralAcceleration
            | Self::LongitudinalAcceleration
            | Self::NormalAcceleration => "m/s^2",
            Self::LateralVelocity
            | Self::LongitudinalVelocity
            | Self::NormalVelocity
            | Self::Speed => "km/h",
        }
    }

    /// CSV header cell, e.g. `Speed (km/h)`
    pub fn header(self) -> String {
        match self.units() {
            "" => self.label().to_string(),
            units => format!("{} ({})", self.label(), units),
        }
    }
}

/// A recorded value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    Number(f64),
    Flag(bool),
}

/// CSV cell text: numbers always carry a fractional part (`36.0`), flags
/// are `True` / `False`
impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v:?}"),
            Self::Flag(true) => f.write_str("True"),
            Self::Flag(false) => f.write_str("False"),
        }
    }
}

/// Driver control inputs, normalised (throttle/brake 0..1, steer -1..1)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlInput {
    pub throttle: f64,
    pub brake: f64,
    pub steer: f64,
    pub hand_brake: bool,
}

/// GNSS fix in degrees / metres
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GnssFix {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

/// Raw vehicle kinematics as read from the simulator each tick.
///
/// Velocity (m/s) and acceleration (m/s²) are already expressed in the
/// vehicle's local frame (x forward, y right, z up).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleKinematics {
    pub local_velocity: Vector3,
    pub local_acceleration: Vector3,
    pub control: ControlInput,
    pub gnss: Option<GnssFix>,
}

/// One vehicle-state sample. Fields never measured stay absent and are
/// written as empty cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleTelemetry {
    values: BTreeMap<StateField, StateValue>,
}

impl VehicleTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: StateField, value: StateValue) {
        self.values.insert(field, value);
    }

    pub fn with(mut self, field: StateField, value: f64) -> Self {
        self.set(field, StateValue::Number(value));
        self
    }

    pub fn get(&self, field: StateField) -> Option<StateValue> {
        self.values.get(&field).copied()
    }

    /// Derive the recorded fields from raw kinematics.
    ///
    /// Velocities are converted to km/h, pedal and steering inputs to percent.
    pub fn from_kinematics(k: &VehicleKinematics) -> Self {
        let v = k.local_velocity;
        let a = k.local_acceleration;
        let c = k.control;

        let mut telemetry = Self::new()
            .with(StateField::Speed, v.norm() * MPS_TO_KMH)
            .with(StateField::LongitudinalVelocity, v.x * MPS_TO_KMH)
            .with(StateField::LateralVelocity, v.y * MPS_TO_KMH)
            .with(StateField::NormalVelocity, v.z * MPS_TO_KMH)
            .with(StateField::LongitudinalAcceleration, a.x)
            .with(StateField::LateralAcceleration, a.y)
            .with(StateField::NormalAcceleration, a.z)
            .with(StateField::AcceleratorPedal, c.throttle * 100.0)
            .with(StateField::BrakePedal, c.brake * 100.0)
            .with(StateField::SteeringInput, c.steer * 100.0);
        telemetry.set(StateField::ServiceBrake, StateValue::Flag(c.hand_brake));

        if let Some(gnss) = k.gnss {
            telemetry = telemetry
                .with(StateField::Latitude, gnss.latitude)
                .with(StateField::Longitude, gnss.longitude)
                .with(StateField::Altitude, gnss.altitude);
        }

        telemetry
    }
}
