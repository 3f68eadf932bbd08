use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SensorId – label of one physical sensor
// ---------------------------------------------------------------------------

/// Sensor label. Source files use small integers (`20`, `21`, `46`) but the
/// value is only ever compared for equality, so it is kept as text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorId(String);

impl SensorId {
    pub fn new(label: impl Into<String>) -> Self {
        SensorId(label.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SensorId {
    fn from(s: &str) -> Self {
        SensorId::new(s)
    }
}

impl From<String> for SensorId {
    fn from(s: String) -> Self {
        SensorId::new(s)
    }
}

impl From<i64> for SensorId {
    fn from(n: i64) -> Self {
        SensorId(n.to_string())
    }
}

// ---------------------------------------------------------------------------
// RawReading – one row of an input file
// ---------------------------------------------------------------------------

/// One sensor's reading at one instant, as delivered by ingestion.
///
/// `spectrum` is already decoded but not padded; its length varies between
/// readings and is only normalised when the dataset is aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReading {
    pub timestamp: DateTime<Utc>,
    pub sensor: SensorId,
    pub sensor_pack: f64,
    pub base: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub spectrum: Vec<f64>,
}

impl RawReading {
    /// Reading with zeroed scalar metadata; mostly useful in tests and tools.
    pub fn new(timestamp: DateTime<Utc>, sensor: impl Into<SensorId>, spectrum: Vec<f64>) -> Self {
        RawReading {
            timestamp,
            sensor: sensor.into(),
            sensor_pack: 0.0,
            base: 0.0,
            temperature: 0.0,
            humidity: 0.0,
            spectrum,
        }
    }
}
