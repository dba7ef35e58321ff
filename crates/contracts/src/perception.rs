//! Perception snapshot - ground-truth view of nearby actors
//!
//! The simulator has no native "perception" sensor, so the session builds
//! one snapshot per tick from the world state. Serialized field names are
//! part of the on-disk JSON format.

use serde::{Deserialize, Serialize};

use crate::Vector3;

/// Extent reported for bicycles regardless of the simulator's bounding box,
/// which is known to be wrong for them.
pub const BICYCLE_EXTENT: Vector3 = Vector3::new(0.9177202582359314, 0.16446444392204285, 0.8786712288856506);

/// Blueprint ids of bicycles treated as vulnerable road users
const VRU_BICYCLE_BLUEPRINTS: [&str; 3] = [
    "vehicle.bh.crossbike",
    "vehicle.gazelle.omafiets",
    "vehicle.diamondback.century",
];

/// Coarse actor category derived from a simulator blueprint id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ActorType {
    Car,
    Bicycle,
    Motorbike,
    Emergency,
    Truck,
    Campervan,
    Pedestrian,
    /// First blueprint segment of anything else (e.g. `static`)
    Other(String),
}

impl ActorType {
    /// Classify a blueprint id such as `vehicle.tesla.model3` or `walker.pedestrian.0001`
    pub fn from_type_id(type_id: &str) -> Self {
        let mut parts = type_id.split('.');
        let prefix = parts.next().unwrap_or_default();
        let name = type_id.rsplit('.').next().unwrap_or_default();

        match prefix {
            "vehicle" => match name {
                "crossbike" | "omafiets" | "century" => Self::Bicycle,
                "ninja" | "yzf" | "low_rider" => Self::Motorbike,
                "police" | "chargercop2020" => Self::Emergency,
                "carlacola" => Self::Truck,
                "t2" => Self::Campervan,
                _ => Self::Car,
            },
            "walker" => Self::Pedestrian,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Car => "car",
            Self::Bicycle => "bicycle",
            Self::Motorbike => "motorbike",
            Self::Emergency => "emergency",
            Self::Truck => "truck",
            Self::Campervan => "campervan",
            Self::Pedestrian => "pedestrian",
            Self::Other(name) => name,
        }
    }

    /// Distance (m) within which the ego vehicle counts as too close
    pub fn proximity_threshold(&self) -> f64 {
        match self {
            Self::Pedestrian => 0.75,
            Self::Bicycle => 1.0,
            _ => 0.0,
        }
    }

    /// Whether a blueprint id belongs to a vulnerable road user (pedestrian or cyclist)
    pub fn is_vru_blueprint(type_id: &str) -> bool {
        type_id.starts_with("walker.") || VRU_BICYCLE_BLUEPRINTS.contains(&type_id)
    }
}

impl From<ActorType> for String {
    fn from(value: ActorType) -> Self {
        value.as_str().to_string()
    }
}

impl From<String> for ActorType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "car" => Self::Car,
            "bicycle" => Self::Bicycle,
            "motorbike" => Self::Motorbike,
            "emergency" => Self::Emergency,
            "truck" => Self::Truck,
            "campervan" => Self::Campervan,
            "pedestrian" => Self::Pedestrian,
            _ => Self::Other(value),
        }
    }
}

/// Rotation in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RotationData {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

/// Bounding box half-extents
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBoxData {
    pub extent: Vector3,
}

impl BoundingBoxData {
    /// Box for an actor, substituting [`BICYCLE_EXTENT`] for bicycles
    pub fn for_actor(actor_type: &ActorType, reported_extent: Vector3) -> Self {
        let extent = match actor_type {
            ActorType::Bicycle => BICYCLE_EXTENT,
            _ => reported_extent,
        };
        Self { extent }
    }
}

/// Ego vehicle state at snapshot time
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EgoVehicle {
    /// Local-frame velocity (m/s)
    pub velocity: Vector3,
    pub bounding_box: BoundingBoxData,
}

/// One perceived actor, relative to the ego vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub id: u32,
    #[serde(rename = "type")]
    pub actor_type: ActorType,
    pub bounding_box: BoundingBoxData,
    pub proximity_threshold: f64,
    pub velocity: Vector3,
    pub relative_location: Vector3,
    pub relative_rotation: RotationData,
}

/// Perception sample written as one JSON file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerceptionSnapshot {
    pub timestamp: f64,
    pub ego_vehicle: EgoVehicle,
    pub detections: Vec<Detection>,
}
