use chrono::{DateTime, Utc};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error taxonomy for the alignment and distance engines
// ---------------------------------------------------------------------------

/// Result alias used by the library core.
pub type Result<T> = std::result::Result<T, SpectraError>;

/// Structural / input problems. None of these are transient, so nothing in the
/// core retries; they carry enough context to find the offending input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpectraError {
    /// No input rows, no usable window, unknown sensor, size guard tripped.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed numeric token, over-long spectrum, zero-norm vector, ...
    #[error("data error: {0}")]
    Data(String),

    /// Fewer points than an operation needs.
    #[error("{operation} needs at least {required} point(s), got {actual}")]
    Dimension {
        operation: &'static str,
        required: usize,
        actual: usize,
    },

    /// A time window selected nothing for a sensor.
    #[error("sensor {sensor} has no readings between {start} and {end}")]
    EmptyResult {
        sensor: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl SpectraError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        SpectraError::Configuration(msg.into())
    }

    pub(crate) fn data(msg: impl Into<String>) -> Self {
        SpectraError::Data(msg.into())
    }

    /// Fail with [`SpectraError::Dimension`] when `actual < required`.
    pub(crate) fn require_points(
        operation: &'static str,
        required: usize,
        actual: usize,
    ) -> Result<()> {
        if actual < required {
            return Err(SpectraError::Dimension {
                operation,
                required,
                actual,
            });
        }
        Ok(())
    }
}
