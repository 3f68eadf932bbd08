use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::Serialize;

use super::dataset::AlignedDataset;
use super::model::SensorId;
use crate::error::{Result, SpectraError};

// ---------------------------------------------------------------------------
// Time window: inclusive [start, end]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(SpectraError::config(format!(
                "window start {start} is after its end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// The `length` leading up to and including `end`.
    pub fn ending_at(end: DateTime<Utc>, length: Duration) -> Result<Self> {
        let start = end.checked_sub_signed(length).ok_or_else(|| {
            SpectraError::config(format!("a window of {length} before {end} is out of range"))
        })?;
        Self::new(start, end)
    }

    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        self.start <= *ts && *ts <= self.end
    }
}

// ---------------------------------------------------------------------------
// FilteredSeries – one sensor's readings inside a window
// ---------------------------------------------------------------------------

/// One reading of a [`FilteredSeries`].
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub sensor_pack: f64,
    pub base: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub spectrum: Vec<f64>,
}

/// Ascending by timestamp; never empty when produced by [`filter_window`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredSeries {
    pub sensor: SensorId,
    pub window: TimeWindow,
    pub points: Vec<SeriesPoint>,
}

impl FilteredSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.points.iter().map(|p| p.timestamp).collect()
    }

    pub fn spectra(&self) -> Vec<&[f64]> {
        self.points.iter().map(|p| p.spectrum.as_slice()).collect()
    }

    /// Unix epoch seconds (with sub-second fraction) of each point.
    pub fn epoch_seconds(&self) -> Vec<f64> {
        self.points
            .iter()
            .map(|p| p.timestamp.timestamp_micros() as f64 / 1e6)
            .collect()
    }

    pub fn first(&self) -> Option<&SeriesPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&SeriesPoint> {
        self.points.last()
    }
}

/// Select `sensor`'s readings with `start <= t <= end` and `base` present.
///
/// Fails with [`SpectraError::EmptyResult`] when nothing qualifies, and with a
/// configuration error if the sensor is not in the dataset at all.
pub fn filter_window(
    ds: &AlignedDataset,
    sensor: &SensorId,
    window: &TimeWindow,
) -> Result<FilteredSeries> {
    let s = ds
        .sensor_index(sensor)
        .ok_or_else(|| SpectraError::config(format!("sensor {sensor} is not in the dataset")))?;

    // Timestamps are sorted, so the window is a contiguous index range.
    let ts = ds.timestamps();
    let lo = ts.partition_point(|t| *t < window.start);
    let hi = ts.partition_point(|t| *t <= window.end);

    let points: Vec<SeriesPoint> = (lo..hi)
        .filter_map(|t| ds.view(t, s))
        .map(|v| SeriesPoint {
            timestamp: v.timestamp,
            sensor_pack: v.sensor_pack,
            base: v.base,
            temperature: v.temperature,
            humidity: v.humidity,
            spectrum: v.spectrum.to_vec(),
        })
        .collect();

    if points.is_empty() {
        return Err(SpectraError::EmptyResult {
            sensor: sensor.to_string(),
            start: window.start,
            end: window.end,
        });
    }

    debug!(
        "sensor {sensor}: {} of {} timestamps in window {} – {}",
        points.len(),
        hi - lo,
        window.start,
        window.end
    );

    Ok(FilteredSeries {
        sensor: sensor.clone(),
        window: *window,
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::build_dataset;
    use crate::data::model::RawReading;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn sample() -> AlignedDataset {
        let rows = vec![
            RawReading::new(ts(100), "A", vec![1.0, 2.0]),
            RawReading::new(ts(150), "B", vec![9.0]),
            RawReading::new(ts(200), "A", vec![2.0, 2.0]),
            RawReading::new(ts(300), "A", vec![1.0, 2.0, 3.0]),
            RawReading::new(ts(400), "B", vec![8.0]),
        ];
        build_dataset(&rows).unwrap()
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let ds = sample();
        let w = TimeWindow::new(ts(100), ts(300)).unwrap();
        let series = filter_window(&ds, &"A".into(), &w).unwrap();
        assert_eq!(series.timestamps(), vec![ts(100), ts(200), ts(300)]);
        assert_eq!(series.spectra()[0], &[1.0, 2.0, 0.0]);
        assert_eq!(series.epoch_seconds(), vec![100.0, 200.0, 300.0]);
    }

    #[test]
    fn skips_timestamps_owned_by_other_sensors() {
        let ds = sample();
        let w = TimeWindow::new(ts(0), ts(1000)).unwrap();
        let series = filter_window(&ds, &"B".into(), &w).unwrap();
        assert_eq!(series.timestamps(), vec![ts(150), ts(400)]);
        assert_eq!(series.first().unwrap().spectrum, vec![9.0, 0.0, 0.0]);
    }

    #[test]
    fn empty_window_is_an_error() {
        let ds = sample();
        let w = TimeWindow::new(ts(160), ts(190)).unwrap();
        let err = filter_window(&ds, &"A".into(), &w).unwrap_err();
        assert!(matches!(err, SpectraError::EmptyResult { .. }));
    }

    #[test]
    fn unknown_sensor_is_a_configuration_error() {
        let ds = sample();
        let w = TimeWindow::new(ts(0), ts(1000)).unwrap();
        let err = filter_window(&ds, &"Z".into(), &w).unwrap_err();
        assert!(matches!(err, SpectraError::Configuration(_)));
    }

    #[test]
    fn inverted_window_is_rejected() {
        assert!(TimeWindow::new(ts(10), ts(5)).is_err());
        let w = TimeWindow::ending_at(ts(1000), Duration::seconds(100)).unwrap();
        assert_eq!(w.start, ts(900));
        assert!(w.contains(&ts(1000)) && w.contains(&ts(900)) && !w.contains(&ts(899)));
    }

    #[test]
    fn window_reaching_past_the_calendar_is_rejected() {
        let err = TimeWindow::ending_at(ts(1000), Duration::MAX).unwrap_err();
        assert!(matches!(err, SpectraError::Configuration(_)));
    }
}
