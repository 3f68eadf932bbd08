use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::codec;
use super::model::{RawReading, SensorId};
use crate::error::{Result, SpectraError};

// ---------------------------------------------------------------------------
// Builder configuration
// ---------------------------------------------------------------------------

/// What to do when two rows share a `(timestamp, sensor)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail the whole build with a data error.
    #[default]
    Reject,
    /// Last row wins (what pandas/xarray assignment does).
    Overwrite,
}

/// Explicit inputs of [`DatasetBuilder`]; there is no ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuilderConfig {
    #[serde(default)]
    pub duplicates: DuplicatePolicy,

    /// Upper bound on `timestamps × sensors × channels` spectrum values.
    #[serde(default = "default_max_tensor_values")]
    pub max_tensor_values: usize,
}

fn default_max_tensor_values() -> usize {
    // 2 GiB of f64
    1 << 28
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            duplicates: DuplicatePolicy::default(),
            max_tensor_values: default_max_tensor_values(),
        }
    }
}

// ---------------------------------------------------------------------------
// AlignedDataset – dense (timestamp, sensor[, channel]) tensors
// ---------------------------------------------------------------------------

/// Readings aligned on label-indexed axes.
///
/// Scalars are stored per `(timestamp, sensor)` cell as `Option<f64>`; the
/// spectrum tensor is flat, `T × S × C`, with NaN marking missing cells.
/// `base` presence is the single validity predicate: every other field agrees
/// with it on missingness.
///
/// Distinct sensors rarely share exact timestamps, so most cells are missing;
/// memory grows with `T × S × C` rather than with the number of readings.
#[derive(Debug, Clone)]
pub struct AlignedDataset {
    timestamps: Vec<DateTime<Utc>>,
    sensors: Vec<SensorId>,
    channels: usize,
    timestamp_index: HashMap<DateTime<Utc>, usize>,
    sensor_index: HashMap<SensorId, usize>,
    sensor_pack: Vec<Option<f64>>,
    base: Vec<Option<f64>>,
    temperature: Vec<Option<f64>>,
    humidity: Vec<Option<f64>>,
    spectrum: Vec<f64>,
}

/// Borrowed view of one present cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadingView<'a> {
    pub timestamp: DateTime<Utc>,
    pub sensor: &'a SensorId,
    pub sensor_pack: f64,
    pub base: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub spectrum: &'a [f64],
}

impl AlignedDataset {
    /// Ascending, distinct.
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn sensors(&self) -> &[SensorId] {
        &self.sensors
    }

    /// `C`: the longest spectrum in the batch.
    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn timestamp_index(&self, ts: &DateTime<Utc>) -> Option<usize> {
        self.timestamp_index.get(ts).copied()
    }

    pub fn sensor_index(&self, sensor: &SensorId) -> Option<usize> {
        self.sensor_index.get(sensor).copied()
    }

    fn cell(&self, t: usize, s: usize) -> Option<usize> {
        (t < self.timestamps.len() && s < self.sensors.len()).then(|| t * self.sensors.len() + s)
    }

    /// Whether a reading exists at `(t, s)`; out-of-range indices are absent.
    pub fn has_reading(&self, t: usize, s: usize) -> bool {
        self.base(t, s).is_some()
    }

    pub fn base(&self, t: usize, s: usize) -> Option<f64> {
        self.cell(t, s).and_then(|c| self.base[c])
    }

    pub fn sensor_pack(&self, t: usize, s: usize) -> Option<f64> {
        self.cell(t, s).and_then(|c| self.sensor_pack[c])
    }

    pub fn temperature(&self, t: usize, s: usize) -> Option<f64> {
        self.cell(t, s).and_then(|c| self.temperature[c])
    }

    pub fn humidity(&self, t: usize, s: usize) -> Option<f64> {
        self.cell(t, s).and_then(|c| self.humidity[c])
    }

    /// Padded spectrum of length `C`, or `None` for a missing cell.
    pub fn spectrum(&self, t: usize, s: usize) -> Option<&[f64]> {
        let c = self.cell(t, s)?;
        self.base[c]?;
        let start = c * self.channels;
        Some(&self.spectrum[start..start + self.channels])
    }

    /// Label-based lookup of a single reading.
    pub fn sel(&self, ts: &DateTime<Utc>, sensor: &SensorId) -> Option<ReadingView<'_>> {
        let t = self.timestamp_index(ts)?;
        let s = self.sensor_index(sensor)?;
        self.view(t, s)
    }

    /// Positional lookup of a single reading.
    pub fn view(&self, t: usize, s: usize) -> Option<ReadingView<'_>> {
        let c = self.cell(t, s)?;
        let base = self.base[c]?;
        Some(ReadingView {
            timestamp: self.timestamps[t],
            sensor: &self.sensors[s],
            // Written together with `base`, so present whenever it is.
            sensor_pack: self.sensor_pack[c].unwrap_or(f64::NAN),
            base,
            temperature: self.temperature[c].unwrap_or(f64::NAN),
            humidity: self.humidity[c].unwrap_or(f64::NAN),
            spectrum: self.spectrum(t, s)?,
        })
    }

    /// Number of present cells.
    pub fn reading_count(&self) -> usize {
        self.base.iter().filter(|b| b.is_some()).count()
    }

    /// Fraction of `(timestamp, sensor)` cells that hold a reading.
    pub fn occupancy(&self) -> f64 {
        if self.base.is_empty() {
            return 0.0;
        }
        self.reading_count() as f64 / self.base.len() as f64
    }
}

// ---------------------------------------------------------------------------
// DatasetBuilder
// ---------------------------------------------------------------------------

/// Turns a batch of [`RawReading`]s into an [`AlignedDataset`], all or nothing.
#[derive(Debug, Clone, Default)]
pub struct DatasetBuilder {
    config: BuilderConfig,
}

impl DatasetBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, rows: &[RawReading]) -> Result<AlignedDataset> {
        if rows.is_empty() {
            return Err(SpectraError::config("no input readings to build a dataset from"));
        }

        // Axes
        let timestamps: Vec<DateTime<Utc>> = rows
            .iter()
            .map(|r| r.timestamp)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let sensors: Vec<SensorId> = rows
            .iter()
            .map(|r| r.sensor.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let channels = rows.iter().map(|r| r.spectrum.len()).max().unwrap_or(0);
        if channels == 0 {
            return Err(SpectraError::data("no reading carries a spectrum (0 channels)"));
        }

        let n_cells = timestamps.len() * sensors.len();
        let n_values = n_cells.checked_mul(channels).ok_or_else(|| {
            SpectraError::config("spectrum tensor size overflows usize")
        })?;
        if n_values > self.config.max_tensor_values {
            return Err(SpectraError::config(format!(
                "spectrum tensor would hold {n_values} values ({} timestamps × {} sensors × {channels} channels), limit is {}",
                timestamps.len(),
                sensors.len(),
                self.config.max_tensor_values
            )));
        }

        let timestamp_index: HashMap<DateTime<Utc>, usize> =
            timestamps.iter().enumerate().map(|(i, t)| (*t, i)).collect();
        let sensor_index: HashMap<SensorId, usize> =
            sensors.iter().enumerate().map(|(i, s)| (s.clone(), i)).collect();

        let mut ds = AlignedDataset {
            timestamps,
            sensors,
            channels,
            timestamp_index,
            sensor_index,
            sensor_pack: vec![None; n_cells],
            base: vec![None; n_cells],
            temperature: vec![None; n_cells],
            humidity: vec![None; n_cells],
            spectrum: vec![f64::NAN; n_values],
        };

        let n_sensors = ds.sensors.len();
        for (row_no, row) in rows.iter().enumerate() {
            // Both labels come from `rows`, so lookups cannot miss.
            let (Some(&t), Some(&s)) = (
                ds.timestamp_index.get(&row.timestamp),
                ds.sensor_index.get(&row.sensor),
            ) else {
                continue;
            };
            let c = t * n_sensors + s;

            if ds.base[c].is_some() {
                match self.config.duplicates {
                    DuplicatePolicy::Reject => {
                        return Err(SpectraError::data(format!(
                            "row {row_no}: duplicate reading for sensor {} at {}",
                            row.sensor, row.timestamp
                        )));
                    }
                    DuplicatePolicy::Overwrite => {
                        warn!(
                            "row {row_no}: overwriting earlier reading for sensor {} at {}",
                            row.sensor, row.timestamp
                        );
                    }
                }
            }

            // NaN marks absent cells; a present reading must be fully finite.
            if let Some(ch) = row.spectrum.iter().position(|v| !v.is_finite()) {
                return Err(SpectraError::data(format!(
                    "row {row_no} (sensor {} at {}): channel {ch} is {}",
                    row.sensor, row.timestamp, row.spectrum[ch]
                )));
            }

            let padded = codec::pad(row.spectrum.clone(), channels).map_err(|e| {
                SpectraError::data(format!("row {row_no} (sensor {}): {e}", row.sensor))
            })?;

            ds.sensor_pack[c] = Some(row.sensor_pack);
            ds.base[c] = Some(row.base);
            ds.temperature[c] = Some(row.temperature);
            ds.humidity[c] = Some(row.humidity);
            ds.spectrum[c * channels..(c + 1) * channels].copy_from_slice(&padded);
        }

        let occupancy = ds.occupancy();
        info!(
            "Aligned {} readings: {} timestamps × {} sensors × {} channels ({:.1}% occupied)",
            rows.len(),
            ds.timestamps.len(),
            ds.sensors.len(),
            channels,
            occupancy * 100.0
        );
        if occupancy < 0.25 {
            debug!("dense tensor is sparse; {n_values} spectrum values allocated");
        }

        Ok(ds)
    }
}

/// Build with [`BuilderConfig::default`].
pub fn build_dataset(rows: &[RawReading]) -> Result<AlignedDataset> {
    DatasetBuilder::default().build(rows)
}
