use std::path::Path;

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::analysis::folding::HourFolder;
use crate::data::dataset::BuilderConfig;
use crate::error::SpectraError;

// ---------------------------------------------------------------------------
// Analysis configuration
// ---------------------------------------------------------------------------

/// How readings are folded onto hours of the day.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FoldingConfig {
    /// Local clock used for hour bins and day ticks, in whole hours east of UTC.
    #[serde(default)]
    pub utc_offset_hours: i32,
}

impl FoldingConfig {
    pub fn folder(&self) -> crate::Result<HourFolder> {
        HourFolder::with_utc_offset_hours(self.utc_offset_hours)
    }
}

/// Default analysis window when no explicit start is given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_days")]
    pub days: i64,
}

fn default_window_days() -> i64 {
    7
}

impl WindowConfig {
    /// The configured window length.
    pub fn length(&self) -> crate::Result<Duration> {
        Duration::try_days(self.days).ok_or_else(|| {
            SpectraError::config(format!("window.days = {} is out of range", self.days))
        })
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            days: default_window_days(),
        }
    }
}

/// Everything a batch run needs besides its input files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub builder: BuilderConfig,

    #[serde(default)]
    pub folding: FoldingConfig,

    #[serde(default)]
    pub window: WindowConfig,

    /// Sensors to analyse when none are named on the command line.
    #[serde(default)]
    pub sensors: Vec<String>,
}

impl AnalysisConfig {
    /// Load configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Save configuration as pretty JSON.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("writing config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::DuplicatePolicy;

    #[test]
    fn defaults_fill_missing_sections() {
        let config: AnalysisConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.window.days, 7);
        assert_eq!(config.folding.utc_offset_hours, 0);
        assert_eq!(config.builder.duplicates, DuplicatePolicy::Reject);
        assert!(config.sensors.is_empty());
    }

    #[test]
    fn reads_partial_json() {
        let config: AnalysisConfig = serde_json::from_str(
            r#"{ "builder": { "duplicates": "overwrite" },
                 "folding": { "utc_offset_hours": 2 },
                 "sensors": ["20", "21"] }"#,
        )
        .unwrap();
        assert_eq!(config.builder.duplicates, DuplicatePolicy::Overwrite);
        assert_eq!(config.builder.max_tensor_values, BuilderConfig::default().max_tensor_values);
        assert_eq!(config.folding.utc_offset_hours, 2);
        assert_eq!(config.sensors, vec!["20", "21"]);
        assert!(config.folding.folder().is_ok());
    }

    #[test]
    fn out_of_range_values_are_configuration_errors() {
        let folding = FoldingConfig {
            utc_offset_hours: 1_000_000,
        };
        assert!(matches!(folding.folder(), Err(SpectraError::Configuration(_))));

        let window = WindowConfig { days: i64::MAX };
        assert!(matches!(window.length(), Err(SpectraError::Configuration(_))));
        assert_eq!(WindowConfig::default().length(), Ok(Duration::days(7)));
    }

    #[test]
    fn round_trips_through_a_file() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("config.json");
        let mut config = AnalysisConfig::default();
        config.window.days = 3;
        config.to_json_file(&path)?;
        assert_eq!(AnalysisConfig::from_json_file(&path)?.window.days, 3);
        Ok(())
    }
}
