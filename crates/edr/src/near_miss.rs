//! Near-miss watchdog and hotspot log
//!
//! Once per tick the watchdog compares the ego footprint with the footprint
//! of every nearby vulnerable road user (VRU), inflated by the VRU's
//! proximity threshold. Any overlap triggers the recorder.
//!
//! There is no distinction between a near miss and an actual collision:
//! both produce the same trigger and log entry.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use contracts::{ActorState, ActorType, BoundingBoxData, Vector3, WorldSnapshot};
use tracing::{debug, info, warn};

use crate::error::{EdrError, Result};
use crate::geometry::{footprint, has_collided, is_degenerate};
use crate::recorder::Recorder;

/// Trigger reason for proximity events
pub const NEAR_MISS_REASON: &str = "Too close to Vulnerable Road User (VRU)";

/// Header line of the hotspot log (second line, after the map name)
pub const NEAR_MISS_LOG_HEADER: &str =
    "# VRU Type, Threshold, Distance, VRU Speed, VRU X, VRU Y, VRU Z, EGO Speed, EGO X, EGO Y, EGO Z";

/// VRUs farther than `threshold × 8` are not tested
const ROUGH_DISTANCE_FACTOR: f64 = 8.0;

/// Repeated events for the same VRU within this interval (s) are not logged
const MIN_EVENT_INTERVAL: f64 = 1.0;

/// One detected proximity event
#[derive(Debug, Clone, PartialEq)]
pub struct NearMiss {
    pub vru_id: u32,
    pub vru_type: ActorType,
    pub threshold: f64,
    /// Horizontal centre distance (m)
    pub distance: f64,
    pub vru_speed: f64,
    pub vru_location: Vector3,
    pub ego_speed: f64,
    pub ego_location: Vector3,
}

impl NearMiss {
    fn csv_line(&self) -> String {
        let v = &self.vru_location;
        let e = &self.ego_location;
        format!(
            "{}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}",
            self.vru_type.as_str(),
            self.threshold,
            self.distance,
            self.vru_speed,
            v.x,
            v.y,
            v.z,
            self.ego_speed,
            e.x,
            e.y,
            e.z
        )
    }
}

/// Map name without layer suffix (`Town10HD_Opt` -> `Town10HD`)
pub fn base_map_name(map_name: &str) -> &str {
    map_name.split('_').next().unwrap_or(map_name)
}

/// Append-only hotspot CSV, shareable across runs on the same map
pub struct NearMissLogger {
    path: PathBuf,
    file: File,
    last_event: Option<(u32, f64)>,
}

impl NearMissLogger {
    /// Open (creating if needed) a log for `map_name`.
    ///
    /// Fails with [`EdrError::MapMismatch`] if the file was started on a
    /// different map.
    pub fn open(path: impl AsRef<Path>, map_name: &str) -> Result<Self> {
        let path = path.as_ref();
        let base = base_map_name(map_name);

        if !path.exists() {
            Self::create(path, base)?;
        }

        let found = Self::recorded_map(path)?;
        if found != base {
            return Err(EdrError::MapMismatch {
                path: path.to_path_buf(),
                expected: base.to_string(),
                found,
            });
        }

        let file = OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(|e| EdrError::io(path, e))?;
        info!(path = %path.display(), map = base, "near miss log opened");

        Ok(Self {
            path: path.to_path_buf(),
            file,
            last_event: None,
        })
    }

    fn create(path: &Path, base_map: &str) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| EdrError::io(parent, e))?;
        }
        let mut file = File::create(path).map_err(|e| EdrError::io(path, e))?;
        writeln!(file, "{base_map}")
            .and_then(|()| writeln!(file, "{NEAR_MISS_LOG_HEADER}"))
            .map_err(|e| EdrError::io(path, e))?;
        info!(path = %path.display(), "near miss log created");
        Ok(())
    }

    fn recorded_map(path: &Path) -> Result<String> {
        let file = File::open(path).map_err(|e| EdrError::io(path, e))?;
        let mut first = String::new();
        BufReader::new(file)
            .read_line(&mut first)
            .map_err(|e| EdrError::io(path, e))?;
        Ok(first.split(',').next().unwrap_or_default().trim().to_string())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an event. Returns `false` if it repeats the previous VRU
    /// within [`MIN_EVENT_INTERVAL`].
    pub fn log_event(&mut self, timestamp: f64, event: &NearMiss) -> Result<bool> {
        if let Some((last_id, last_ts)) = self.last_event {
            if last_id == event.vru_id && timestamp - last_ts < MIN_EVENT_INTERVAL {
                return Ok(false);
            }
        }
        self.last_event = Some((event.vru_id, timestamp));

        writeln!(self.file, "{}", event.csv_line()).map_err(|e| EdrError::io(&self.path, e))?;
        Ok(true)
    }
}

/// Per-tick VRU proximity check
pub struct NearMissWatchdog {
    min_ego_speed: f64,
    logger: Option<NearMissLogger>,
}

impl NearMissWatchdog {
    pub fn new(min_ego_speed: f64) -> Self {
        Self {
            min_ego_speed,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: NearMissLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn has_logger(&self) -> bool {
        self.logger.is_some()
    }

    /// Scan the world for VRUs inside the ego footprint.
    ///
    /// Without a logger the scan is skipped while an event is active and
    /// stops at the first hit; with a logger every hit is logged.
    pub fn check(&mut self, world: &WorldSnapshot, recorder: &Recorder) -> Vec<NearMiss> {
        let mut hits = Vec::new();
        if self.logger.is_none() && recorder.has_triggered() {
            return hits;
        }

        let ego = &world.ego;
        let ego_speed = ego.speed();
        if ego_speed < self.min_ego_speed {
            return hits;
        }
        if is_degenerate(&ego.extent) {
            warn!(actor_id = ego.id, "ego bounding box is degenerate, skipping near miss check");
            return hits;
        }
        let ego_footprint = footprint(ego.location, ego.rotation.yaw, ego.extent);

        for actor in &world.actors {
            if actor.id == ego.id || !ActorType::is_vru_blueprint(&actor.type_id) {
                continue;
            }
            let Some(hit) = Self::test_vru(ego, &ego_footprint, actor) else {
                continue;
            };

            recorder.trigger_at(NEAR_MISS_REASON, world.timestamp);
            debug!(vru_id = hit.vru_id, vru_type = hit.vru_type.as_str(), distance = hit.distance, "near miss");

            match self.logger.as_mut() {
                Some(logger) => {
                    if let Err(e) = logger.log_event(world.timestamp, &hit) {
                        warn!(error = %e, "failed to write near miss log");
                    }
                    hits.push(hit);
                }
                None => {
                    hits.push(hit);
                    break;
                }
            }
        }

        hits
    }

    fn test_vru(
        ego: &ActorState,
        ego_footprint: &[nalgebra::Vector2<f64>],
        vru: &ActorState,
    ) -> Option<NearMiss> {
        let vru_type = ActorType::from_type_id(&vru.type_id);
        let threshold = vru_type.proximity_threshold();

        let distance = ego.ground_distance(vru);
        if distance > threshold * ROUGH_DISTANCE_FACTOR {
            return None;
        }

        let extent = BoundingBoxData::for_actor(&vru_type, vru.extent).extent;
        if is_degenerate(&extent) {
            warn!(actor_id = vru.id, type_id = %vru.type_id, "VRU bounding box is degenerate, skipped");
            return None;
        }
        let inflated = Vector3::new(
            extent.x + threshold,
            extent.y + threshold,
            extent.z + threshold,
        );
        let vru_footprint = footprint(vru.location, vru.rotation.yaw, inflated);

        has_collided(ego_footprint, &vru_footprint).then(|| NearMiss {
            vru_id: vru.id,
            vru_type,
            threshold,
            distance,
            vru_speed: vru.speed(),
            vru_location: vru.location,
            ego_speed: ego.speed(),
            ego_location: ego.location,
        })
    }
}
