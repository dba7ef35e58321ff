//! # Contracts
//!
//! Frozen interface contracts shared by every EDR crate: sample and payload
//! types, sensor kinds, configuration structures, the producer trait and the
//! error taxonomy. Business crates depend on this crate, never the reverse.
//!
//! ## Time Model
//! - Timestamps are seconds as `f64`. Producers choose the clock (wall clock
//!   or simulation time); a single recorder must be fed from one clock.

mod edr_config;
mod error;
mod perception;
mod sample;
mod sensor;
mod sensor_source;
mod telemetry;
mod world;

pub use edr_config::*;
pub use error::*;
pub use perception::*;
pub use sample::Sample;
pub use sensor::*;
pub use sensor_source::{SampleCallback, SampleSource};
pub use telemetry::*;
pub use world::{ActorId, ActorState, WorldSnapshot};
