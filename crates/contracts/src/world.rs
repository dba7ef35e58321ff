//! World snapshot - per-tick view of the simulation handed to pull sensors
//!
//! The simulator itself is external. Whatever drives the session reads the
//! ego vehicle and surrounding actors once per tick and passes them in as
//! plain data.

use serde::{Deserialize, Serialize};

use crate::{RotationData, Vector3, VehicleKinematics};

/// Simulator actor id
pub type ActorId = u32;

/// One actor as seen in world coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorState {
    /// Simulator actor id
    pub id: ActorId,

    /// Blueprint id, e.g. `walker.pedestrian.0001`
    pub type_id: String,

    /// World location (m)
    pub location: Vector3,

    /// World rotation (degrees)
    pub rotation: RotationData,

    /// World-frame velocity (m/s)
    pub velocity: Vector3,

    /// Bounding box half-extents as reported by the simulator (m)
    pub extent: Vector3,
}

impl ActorState {
    /// Speed in m/s
    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }

    /// Horizontal distance to another actor (m)
    pub fn ground_distance(&self, other: &ActorState) -> f64 {
        let dx = other.location.x - self.location.x;
        let dy = other.location.y - self.location.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Everything the session needs from the simulator for one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Tick timestamp (s)
    pub timestamp: f64,

    /// The observed (ego) vehicle
    pub ego: ActorState,

    /// Ego kinematics in the vehicle frame, for the vehicle-state sensor
    pub kinematics: VehicleKinematics,

    /// All other actors; may include the ego, which consumers skip by id
    pub actors: Vec<ActorState>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(id: u32, x: f64, y: f64) -> ActorState {
        ActorState {
            id,
            type_id: "vehicle.tesla.model3".into(),
            location: Vector3::new(x, y, 7.0),
            rotation: RotationData::default(),
            velocity: Vector3::new(3.0, 4.0, 0.0),
            extent: Vector3::new(2.0, 1.0, 0.8),
        }
    }

    #[test]
    fn ground_distance_ignores_height() {
        let a = actor(1, 0.0, 0.0);
        let mut b = actor(2, 3.0, 4.0);
        b.location.z = 100.0;
        assert_eq!(a.ground_distance(&b), 5.0);
        assert_eq!(a.speed(), 5.0);
    }
}
