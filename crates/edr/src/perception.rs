//! Perception sensor: ground-truth snapshots of nearby actors
//!
//! The simulator offers no perception sensor, so snapshots are built from the
//! per-tick [`WorldSnapshot`]. Detection data is the simulator's own
//! knowledge of the world, not the output of any perception algorithm.

use contracts::{
    ActorState, ActorType, BoundingBoxData, Detection, EgoVehicle, PerceptionSnapshot,
    SensorKind, WorldSnapshot,
};

use crate::buffer::{Admission, BufferSettings};
use crate::geometry::{local_vector, relative_transform};
use crate::sensor::{FrameSensor, SensorHandle};

/// Sensor id used for the perception log directory
pub const PERCEPTION_SENSOR_ID: &str = "logs";

/// Buffer rate (Hz)
pub const PERCEPTION_RATE_HZ: f64 = 100.0;

/// Snapshot generation rate (Hz)
pub const PERCEPTION_GENERATION_HZ: f64 = 20.0;

/// Blueprint families reported as detections, in output order
const DETECTED_FAMILIES: [&str; 2] = ["vehicle.", "walker."];

/// Create the perception sensor (`perception/logs/*.json`)
pub fn perception_sensor(settings: BufferSettings) -> FrameSensor<PerceptionSnapshot> {
    FrameSensor::new(
        PERCEPTION_SENSOR_ID,
        SensorKind::Perception,
        ".json",
        settings.with_rate(PERCEPTION_RATE_HZ),
    )
}

/// Builds snapshots at most [`PERCEPTION_GENERATION_HZ`] times per second
/// and feeds them to the perception sensor.
#[derive(Clone)]
pub struct PerceptionGenerator {
    handle: SensorHandle<PerceptionSnapshot>,
    range_m: f64,
    next_timestamp: Option<f64>,
}

impl PerceptionGenerator {
    pub fn new(handle: SensorHandle<PerceptionSnapshot>, range_m: f64) -> Self {
        Self {
            handle,
            range_m,
            next_timestamp: None,
        }
    }

    /// Returns `None` when generation was skipped by the throttle
    pub fn generate_data(&mut self, world: &WorldSnapshot) -> Option<Admission> {
        let timestamp = world.timestamp;
        if self.next_timestamp.is_some_and(|next| timestamp < next) {
            return None;
        }
        self.next_timestamp = Some(timestamp + 1.0 / PERCEPTION_GENERATION_HZ);

        let snapshot = build_snapshot(world, self.range_m);
        Some(self.handle.on_data(timestamp, snapshot))
    }
}

/// Snapshot of all vehicles and walkers within `range_m` of the ego vehicle.
///
/// Vehicles are listed before walkers; the ego actor itself is skipped.
pub fn build_snapshot(world: &WorldSnapshot, range_m: f64) -> PerceptionSnapshot {
    let ego = &world.ego;
    let detections = DETECTED_FAMILIES
        .iter()
        .flat_map(|family| {
            world
                .actors
                .iter()
                .filter(move |actor| actor.type_id.starts_with(family))
        })
        .filter(|actor| actor.id != ego.id && distance(ego, actor) <= range_m)
        .map(|actor| detection(ego, actor))
        .collect();

    PerceptionSnapshot {
        timestamp: world.timestamp,
        ego_vehicle: EgoVehicle {
            velocity: local_vector(&ego.rotation, &ego.velocity),
            bounding_box: BoundingBoxData { extent: ego.extent },
        },
        detections,
    }
}

fn distance(ego: &ActorState, actor: &ActorState) -> f64 {
    let d = contracts::Vector3::new(
        actor.location.x - ego.location.x,
        actor.location.y - ego.location.y,
        actor.location.z - ego.location.z,
    );
    d.norm()
}

fn detection(ego: &ActorState, actor: &ActorState) -> Detection {
    let actor_type = ActorType::from_type_id(&actor.type_id);
    let (relative_location, relative_rotation) = relative_transform(
        (&ego.location, &ego.rotation),
        (&actor.location, &actor.rotation),
    );

    Detection {
        id: actor.id,
        bounding_box: BoundingBoxData::for_actor(&actor_type, actor.extent),
        proximity_threshold: actor_type.proximity_threshold(),
        velocity: local_vector(&actor.rotation, &actor.velocity),
        relative_location,
        relative_rotation,
        actor_type,
    }
}
