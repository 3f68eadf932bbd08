use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Offset, Timelike, Utc};
use log::debug;
use serde::Serialize;

use crate::data::filter::FilteredSeries;
use crate::error::{Result, SpectraError};

// ---------------------------------------------------------------------------
// Hour-of-day folding
// ---------------------------------------------------------------------------

/// Mean of the spectra that fell into one hour-of-day bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourMean {
    pub samples: usize,
    pub mean: Vec<f64>,
}

/// Per-hour mean spectra for one sensor/window, keyed by hour 0–23.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoldedSpectrum {
    pub bins: BTreeMap<u32, HourMean>,
}

impl FoldedSpectrum {
    pub fn hours(&self) -> impl Iterator<Item = u32> + '_ {
        self.bins.keys().copied()
    }
}

/// Equal-weight average of the occupied hour bins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeanSpectrum {
    pub values: Vec<f64>,
    pub hours_observed: usize,
    pub samples: usize,
}

/// Folds readings taken on different days onto the 24 hours of a day.
///
/// Hours are read in `offset`; UTC unless configured otherwise.
#[derive(Debug, Clone, Copy)]
pub struct HourFolder {
    offset: FixedOffset,
}

impl Default for HourFolder {
    fn default() -> Self {
        Self::utc()
    }
}

impl HourFolder {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    /// Whole-hour offset from UTC, e.g. `2` for EET.
    pub fn with_utc_offset_hours(hours: i32) -> Result<Self> {
        hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .map(Self::new)
            .ok_or_else(|| SpectraError::config(format!("UTC offset of {hours}h is out of range")))
    }

    pub fn offset(&self) -> &FixedOffset {
        &self.offset
    }

    pub fn hour_bin(&self, ts: &DateTime<Utc>) -> u32 {
        ts.with_timezone(&self.offset).hour()
    }

    /// Group the series by hour of day and average each group.
    pub fn fold(&self, series: &FilteredSeries) -> Result<FoldedSpectrum> {
        SpectraError::require_points("hour folding", 2, series.len())?;

        let width = series.points[0].spectrum.len();
        let mut sums: BTreeMap<u32, (usize, Vec<f64>)> = BTreeMap::new();

        for point in &series.points {
            if point.spectrum.len() != width {
                return Err(SpectraError::data(format!(
                    "sensor {}: spectrum at {} has {} channels, expected {width}",
                    series.sensor,
                    point.timestamp,
                    point.spectrum.len()
                )));
            }
            let (count, acc) = sums
                .entry(self.hour_bin(&point.timestamp))
                .or_insert_with(|| (0, vec![0.0; width]));
            *count += 1;
            for (a, v) in acc.iter_mut().zip(&point.spectrum) {
                *a += v;
            }
        }

        let bins = sums
            .into_iter()
            .map(|(hour, (samples, sum))| {
                let n = samples as f64;
                let mean = sum.into_iter().map(|v| v / n).collect();
                (hour, HourMean { samples, mean })
            })
            .collect();

        Ok(FoldedSpectrum { bins })
    }

    /// Mean of per-hour means: every observed hour counts once, however many
    /// readings it holds, so densely sampled hours don't dominate.
    pub fn mean_spectrum(&self, series: &FilteredSeries) -> Result<MeanSpectrum> {
        let folded = self.fold(series)?;
        let hours_observed = folded.bins.len();
        let width = series.points[0].spectrum.len();

        let mut values = vec![0.0; width];
        for bin in folded.bins.values() {
            for (acc, v) in values.iter_mut().zip(&bin.mean) {
                *acc += v;
            }
        }
        for v in &mut values {
            *v /= hours_observed as f64;
        }

        debug!(
            "sensor {}: mean spectrum over {hours_observed} hour bins from {} readings",
            series.sensor,
            series.len()
        );

        Ok(MeanSpectrum {
            values,
            hours_observed,
            samples: series.len(),
        })
    }
}

/// [`HourFolder::fold`] on the UTC clock.
pub fn fold(series: &FilteredSeries) -> Result<FoldedSpectrum> {
    HourFolder::utc().fold(series)
}

/// [`HourFolder::mean_spectrum`] on the UTC clock.
pub fn mean_spectrum(series: &FilteredSeries) -> Result<MeanSpectrum> {
    HourFolder::utc().mean_spectrum(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{SeriesPoint, TimeWindow};
    use chrono::TimeZone;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, hour, minute, 0).unwrap()
    }

    fn series(points: &[(DateTime<Utc>, Vec<f64>)]) -> FilteredSeries {
        FilteredSeries {
            sensor: "20".into(),
            window: TimeWindow::new(at(1, 0, 0), at(30, 0, 0)).unwrap(),
            points: points
                .iter()
                .map(|(timestamp, spectrum)| SeriesPoint {
                    timestamp: *timestamp,
                    sensor_pack: 1.0,
                    base: 1.0,
                    temperature: 20.0,
                    humidity: 50.0,
                    spectrum: spectrum.clone(),
                })
                .collect(),
        }
    }

    #[test]
    fn folds_across_days_by_hour() {
        let s = series(&[
            (at(1, 10, 0), vec![1.0, 0.0]),
            (at(2, 10, 30), vec![3.0, 2.0]),
            (at(2, 11, 0), vec![5.0, 5.0]),
        ]);
        let folded = HourFolder::utc().fold(&s).unwrap();
        assert_eq!(folded.hours().collect::<Vec<_>>(), vec![10, 11]);
        assert_eq!(folded.bins[&10].samples, 2);
        assert_eq!(folded.bins[&10].mean, vec![2.0, 1.0]);
        assert_eq!(folded.bins[&11].mean, vec![5.0, 5.0]);
    }

    #[test]
    fn mean_spectrum_weights_hours_equally() {
        // Three readings at 08:xx averaging 1.0, one reading at 20:00 of 5.0.
        let s = series(&[
            (at(1, 8, 0), vec![0.0]),
            (at(2, 8, 10), vec![1.0]),
            (at(3, 8, 20), vec![2.0]),
            (at(3, 20, 0), vec![5.0]),
        ]);
        let mean = HourFolder::utc().mean_spectrum(&s).unwrap();
        assert_eq!(mean.hours_observed, 2);
        assert_eq!(mean.samples, 4);
        // (1 + 5) / 2, not (0 + 1 + 2 + 5) / 4
        assert!((mean.values[0] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn offset_moves_readings_between_bins() {
        let s = series(&[(at(1, 23, 0), vec![1.0]), (at(2, 0, 30), vec![3.0])]);
        let utc = HourFolder::utc().fold(&s).unwrap();
        assert_eq!(utc.hours().collect::<Vec<_>>(), vec![0, 23]);

        let eet = HourFolder::with_utc_offset_hours(2).unwrap().fold(&s).unwrap();
        assert_eq!(eet.hours().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn single_point_is_a_dimension_error() {
        let s = series(&[(at(1, 8, 0), vec![1.0])]);
        assert!(matches!(
            HourFolder::utc().mean_spectrum(&s),
            Err(SpectraError::Dimension { required: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn rejects_ragged_spectra() {
        let s = series(&[(at(1, 8, 0), vec![1.0]), (at(1, 9, 0), vec![1.0, 2.0])]);
        assert!(matches!(HourFolder::utc().fold(&s), Err(SpectraError::Data(_))));
    }

    #[test]
    fn out_of_range_offset_is_rejected() {
        assert!(HourFolder::with_utc_offset_hours(30).is_err());
        assert!(matches!(
            HourFolder::with_utc_offset_hours(1_000_000),
            Err(SpectraError::Configuration(_))
        ));
        assert!(HourFolder::with_utc_offset_hours(i32::MIN).is_err());
    }
}
