//! EDR error types

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised by recorder operations.
///
/// Rate and window rejections are not errors: dropped samples are reported
/// through [`crate::Admission`] instead.
#[derive(Debug, Error)]
pub enum EdrError {
    /// `save` was called while no event is active
    #[error("no event has been triggered")]
    NotTriggered,

    /// Filesystem failure while persisting
    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A payload could not be encoded into its file format
    #[error("failed to encode {}: {message}", path.display())]
    Encode { path: PathBuf, message: String },

    /// A sensor failed while saving
    #[error("sensor '{sensor_id}' failed: {source}")]
    Sensor {
        sensor_id: String,
        #[source]
        source: Box<EdrError>,
    },

    /// Near-miss log belongs to a different map
    #[error("near miss log {} was recorded on map '{found}', current map is '{expected}'", path.display())]
    MapMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },
}

impl EdrError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn encode(path: impl AsRef<Path>, message: impl ToString) -> Self {
        Self::Encode {
            path: path.as_ref().to_path_buf(),
            message: message.to_string(),
        }
    }

    pub fn sensor(sensor_id: impl Into<String>, source: EdrError) -> Self {
        Self::Sensor {
            sensor_id: sensor_id.into(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, EdrError>;
