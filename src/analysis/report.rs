use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use log::{info, warn};
use serde::Serialize;

use super::axis::{bucket_edges_for, half_day_ticks};
use super::distance::{compute_distances, DistanceMatrix, DistanceSet, Metric};
use super::folding::HourFolder;
use crate::data::dataset::AlignedDataset;
use crate::data::filter::{filter_window, TimeWindow};
use crate::data::model::SensorId;

// ---------------------------------------------------------------------------
// Reports handed to rendering collaborators
// ---------------------------------------------------------------------------

/// Distance matrices for one sensor/window plus the axis they are drawn on.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationReport {
    pub sensor: SensorId,
    pub window: TimeWindow,
    pub timestamps: Vec<DateTime<Utc>>,
    pub epoch_seconds: Vec<f64>,
    pub edges: Vec<f64>,
    /// Half-day tick positions (epoch seconds) at local midnight and noon.
    pub ticks: Vec<f64>,
    pub distances: DistanceSet,
}

/// One sensor's diurnal mean spectrum.
#[derive(Debug, Clone, Serialize)]
pub struct SensorMean {
    pub sensor: SensorId,
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
    pub hours_observed: usize,
    pub samples: usize,
    pub spectrum: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeanSpectraReport {
    pub window: TimeWindow,
    pub channels: usize,
    pub sensors: Vec<SensorMean>,
}

/// Filter, then compute the four distance matrices, the cell edges, and tick
/// positions on the `offset` local clock.
pub fn correlation_report(
    ds: &AlignedDataset,
    sensor: &SensorId,
    window: &TimeWindow,
    offset: &FixedOffset,
) -> crate::Result<CorrelationReport> {
    let series = filter_window(ds, sensor, window)?;
    let edges = bucket_edges_for(&series)?;
    let distances = compute_distances(&series.spectra())?;
    let ticks = half_day_ticks(window.start, window.end, offset)?
        .iter()
        .map(|t| t.timestamp() as f64)
        .collect();

    info!(
        "sensor {sensor}: {}×{} distance matrices (max euclidean {:.3})",
        series.len(),
        series.len(),
        distances.euclidean.max()
    );

    Ok(CorrelationReport {
        sensor: sensor.clone(),
        window: *window,
        timestamps: series.timestamps(),
        epoch_seconds: series.epoch_seconds(),
        edges,
        ticks,
        distances,
    })
}

/// Mean spectra for several sensors over the same window. Sensors whose window
/// is empty or too short are skipped with a warning; the report fails only if
/// none survive.
pub fn mean_spectra_report(
    ds: &AlignedDataset,
    sensors: &[SensorId],
    window: &TimeWindow,
    folder: &HourFolder,
) -> crate::Result<MeanSpectraReport> {
    let mut means = Vec::with_capacity(sensors.len());
    let mut last_err = None;

    for sensor in sensors {
        let outcome = filter_window(ds, sensor, window).and_then(|series| {
            let mean = folder.mean_spectrum(&series)?;
            Ok((series, mean))
        });
        match outcome {
            Ok((series, mean)) => {
                let (Some(first), Some(last)) = (series.first(), series.last()) else {
                    continue;
                };
                means.push(SensorMean {
                    sensor: sensor.clone(),
                    first: first.timestamp,
                    last: last.timestamp,
                    hours_observed: mean.hours_observed,
                    samples: mean.samples,
                    spectrum: mean.values,
                });
            }
            Err(e) => {
                warn!("sensor {sensor}: skipped ({e})");
                last_err = Some(e);
            }
        }
    }

    if means.is_empty() {
        return Err(last_err.unwrap_or_else(|| {
            crate::SpectraError::Configuration("no sensors requested".to_string())
        }));
    }

    Ok(MeanSpectraReport {
        window: *window,
        channels: ds.channels(),
        sensors: means,
    })
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

/// Pretty-printed JSON of any report.
pub fn write_json<T: Serialize>(report: &T, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), report)
        .with_context(|| format!("writing {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(())
}

/// One CSV per metric, `<stem>-<metric>.csv`, with epoch seconds as the first
/// column and header.
pub fn write_matrix_csv(report: &CorrelationReport, dir: &Path, stem: &str) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    for metric in Metric::ALL {
        let path = dir.join(format!("{stem}-{}.csv", metric.name()));
        write_one_matrix(report.distances.get(metric), &report.epoch_seconds, &path)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

fn write_one_matrix(matrix: &DistanceMatrix, axis: &[f64], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec!["epoch".to_string()];
    header.extend(axis.iter().map(|t| t.to_string()));
    writer.write_record(&header)?;

    for (t, row) in axis.iter().zip(matrix.rows()) {
        let mut record = vec![t.to_string()];
        record.extend(row.iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::build_dataset;
    use crate::data::model::RawReading;
    use crate::SpectraError;
    use chrono::{Offset, TimeZone};

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn dataset() -> AlignedDataset {
        build_dataset(&[
            RawReading::new(ts(0), "A", vec![1.0, 2.0]),
            RawReading::new(ts(3600), "A", vec![2.0, 2.0]),
            RawReading::new(ts(7200), "A", vec![1.0, 2.0, 3.0]),
            RawReading::new(ts(0), "B", vec![4.0, 1.0, 1.0]),
        ])
        .unwrap()
    }

    #[test]
    fn correlation_report_lines_up_axes() {
        let ds = dataset();
        let window = TimeWindow::new(ts(0), ts(7200)).unwrap();
        let report = correlation_report(&ds, &"A".into(), &window, &Utc.fix()).unwrap();
        assert_eq!(report.timestamps.len(), 3);
        assert_eq!(report.edges, vec![-1800.0, 1800.0, 5400.0, 9000.0]);
        assert_eq!(report.distances.euclidean.size(), 3);
        assert_eq!(report.ticks, vec![0.0, 43_200.0, 86_400.0]);
        assert!((report.distances.euclidean.get(0, 2) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn single_reading_window_is_a_dimension_error() {
        let ds = dataset();
        let window = TimeWindow::new(ts(0), ts(7200)).unwrap();
        let err = correlation_report(&ds, &"B".into(), &window, &Utc.fix()).unwrap_err();
        assert!(matches!(err, SpectraError::Dimension { .. }));
    }

    #[test]
    fn mean_report_skips_unusable_sensors() {
        let ds = dataset();
        let window = TimeWindow::new(ts(0), ts(7200)).unwrap();
        let sensors = vec![SensorId::from("A"), SensorId::from("B")];
        let report = mean_spectra_report(&ds, &sensors, &window, &HourFolder::utc()).unwrap();
        assert_eq!(report.channels, 3);
        assert_eq!(report.sensors.len(), 1);
        assert_eq!(report.sensors[0].hours_observed, 3);
        let expected = [4.0 / 3.0, 2.0, 1.0];
        for (got, want) in report.sensors[0].spectrum.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12);
        }

        let only_b = vec![SensorId::from("B")];
        assert!(mean_spectra_report(&ds, &only_b, &window, &HourFolder::utc()).is_err());
    }

    #[test]
    fn writes_json_and_matrix_csv() -> Result<()> {
        let ds = dataset();
        let window = TimeWindow::new(ts(0), ts(7200)).unwrap();
        let report = correlation_report(&ds, &"A".into(), &window, &Utc.fix())?;

        let dir = tempfile::TempDir::new()?;
        write_json(&report, &dir.path().join("a.json"))?;
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("a.json"))?)?;
        assert_eq!(value["sensor"], "A");
        assert_eq!(value["edges"].as_array().map(|a| a.len()), Some(4));

        write_matrix_csv(&report, dir.path(), "sensor-A")?;
        let text = std::fs::read_to_string(dir.path().join("sensor-A-euclidean.csv"))?;
        assert_eq!(text.lines().count(), 4);
        assert!(text.starts_with("epoch,0,3600,7200"));
        Ok(())
    }
}
