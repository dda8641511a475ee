//! Error types for the blind-spot core.

use thiserror::Error;

/// Errors surfaced by configuration, zone resolution and the frame cycle.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("invalid configuration: {field} {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("update called with non-positive dt ({0})")]
    NonPositiveDt(f64),

    #[error("dt {dt} does not advance the clock at {clock}s")]
    StalledClock { dt: f64, clock: f64 },

    #[error("invalid frame size {width}x{height}")]
    InvalidFrameSize { width: u32, height: u32 },

    #[error("failed to load configuration: {0}")]
    ConfigLoad(#[from] config::ConfigError),
}

impl GuardError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        GuardError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

/// Why a detector record was dropped before matching.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectionRejection {
    #[error("non-positive box size {width}x{height}")]
    NonPositiveSize { width: f32, height: f32 },

    #[error("confidence {0} outside [0, 1]")]
    ConfidenceOutOfRange(f32),

    #[error("non-finite box coordinates")]
    NonFinite,

    #[error("unknown vehicle class '{0}'")]
    UnknownClass(String),
}
