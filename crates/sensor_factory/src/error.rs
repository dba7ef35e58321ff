//! Sensor Factory error types

use thiserror::Error;

/// Sensor Factory specific error
#[derive(Debug, Error)]
pub enum FactoryError {
    /// The simulator refused to spawn or attach the sensor
    #[error("failed to attach sensor '{sensor_id}': {message}")]
    AttachFailed { sensor_id: String, message: String },

    /// No producer exists for this sensor kind
    #[error("unsupported sensor kind '{0}'")]
    UnsupportedKind(String),
}

impl FactoryError {
    /// Create attach error
    pub fn attach(sensor_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AttachFailed {
            sensor_id: sensor_id.into(),
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, FactoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = FactoryError::attach("roof", "blueprint not found");
        assert_eq!(
            err.to_string(),
            "failed to attach sensor 'roof': blueprint not found"
        );
        let err = FactoryError::UnsupportedKind("sensor.other.radar".into());
        assert_eq!(err.to_string(), "unsupported sensor kind 'sensor.other.radar'");
    }
}
