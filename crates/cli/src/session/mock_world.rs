//! Scripted world for headless sessions.
//!
//! The ego vehicle drives along +x at constant speed. An optional pedestrian
//! stands in its lane so the near-miss watchdog fires when the ego reaches it.

use contracts::{
    ActorId, ActorState, ControlInput, GnssFix, RotationData, Vector3, VehicleKinematics,
    WorldSnapshot,
};

pub const EGO_ID: ActorId = 1;
const PEDESTRIAN_ID: ActorId = 2;

const EGO_BLUEPRINT: &str = "vehicle.tesla.model3";
const PEDESTRIAN_BLUEPRINT: &str = "walker.pedestrian.0001";
const EGO_EXTENT: Vector3 = Vector3::new(2.4, 1.0, 0.8);
const PEDESTRIAN_EXTENT: Vector3 = Vector3::new(0.3, 0.3, 0.9);

/// Degrees of latitude per metre, close enough for a mock GNSS track
const DEG_PER_METRE: f64 = 1.0 / 111_320.0;

#[derive(Debug, Clone)]
pub struct MockWorld {
    start: f64,
    ego_speed: f64,
    pedestrian_x: Option<f64>,
}

impl MockWorld {
    /// `vru_after`: seconds until the ego's front reaches the pedestrian
    pub fn new(start: f64, ego_speed: f64, vru_after: Option<f64>) -> Self {
        Self {
            start,
            ego_speed,
            pedestrian_x: vru_after.map(|t| ego_speed * t + EGO_EXTENT.x),
        }
    }

    pub fn snapshot(&self, now: f64) -> WorldSnapshot {
        let x = self.ego_speed * (now - self.start).max(0.0);
        let ego = ActorState {
            id: EGO_ID,
            type_id: EGO_BLUEPRINT.to_string(),
            location: Vector3::new(x, 0.0, 0.0),
            rotation: RotationData::default(),
            velocity: Vector3::new(self.ego_speed, 0.0, 0.0),
            extent: EGO_EXTENT,
        };

        let mut actors = vec![ego.clone()];
        if let Some(px) = self.pedestrian_x {
            actors.push(ActorState {
                id: PEDESTRIAN_ID,
                type_id: PEDESTRIAN_BLUEPRINT.to_string(),
                location: Vector3::new(px, 0.0, 0.0),
                rotation: RotationData {
                    yaw: 90.0,
                    ..Default::default()
                },
                velocity: Vector3::default(),
                extent: PEDESTRIAN_EXTENT,
            });
        }

        WorldSnapshot {
            timestamp: now,
            kinematics: VehicleKinematics {
                local_velocity: Vector3::new(self.ego_speed, 0.0, 0.0),
                local_acceleration: Vector3::default(),
                control: ControlInput {
                    throttle: 0.4,
                    ..Default::default()
                },
                gnss: Some(GnssFix {
                    latitude: 0.0,
                    longitude: x * DEG_PER_METRE,
                    altitude: 2.0,
                }),
            },
            ego,
            actors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ego_moves_and_pedestrian_is_placed() {
        let world = MockWorld::new(100.0, 10.0, Some(3.0));
        let snapshot = world.snapshot(102.0);

        assert_eq!(snapshot.ego.location.x, 20.0);
        assert_eq!(snapshot.actors.len(), 2);
        assert!((snapshot.actors[1].location.x - 32.4).abs() < 1e-9);
        assert_eq!(snapshot.timestamp, 102.0);
    }

    #[test]
    fn test_no_pedestrian_by_default() {
        let world = MockWorld::new(0.0, 5.0, None);
        assert_eq!(world.snapshot(1.0).actors.len(), 1);
    }
}
