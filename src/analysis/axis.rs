use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};

use crate::data::filter::FilteredSeries;
use crate::error::{Result, SpectraError};

// ---------------------------------------------------------------------------
// Irregular-interval cell edges
// ---------------------------------------------------------------------------

/// Cell boundaries for `N` ascending sample positions (a 1-D Voronoi
/// partition): interior edges are midpoints between neighbours and the outer
/// edges mirror the first and last gap. Returns `N + 1` values.
pub fn bucket_edges(positions: &[f64]) -> Result<Vec<f64>> {
    SpectraError::require_points("axis bucketing", 2, positions.len())?;
    if let Some(i) = positions.windows(2).position(|w| !(w[0] <= w[1])) {
        return Err(SpectraError::data(format!(
            "axis bucketing: position {} ({}) is not after position {i} ({})",
            i + 1,
            positions[i + 1],
            positions[i]
        )));
    }

    let n = positions.len();
    let mut edges = Vec::with_capacity(n + 1);
    edges.push(positions[0] - (positions[1] - positions[0]) / 2.0);
    edges.extend(positions.windows(2).map(|w| (w[0] + w[1]) / 2.0));
    edges.push(positions[n - 1] + (positions[n - 1] - positions[n - 2]) / 2.0);
    Ok(edges)
}

/// Edges of a series on the Unix-epoch-seconds scale.
pub fn bucket_edges_for(series: &FilteredSeries) -> Result<Vec<f64>> {
    bucket_edges(&series.epoch_seconds())
}

// ---------------------------------------------------------------------------
// Tick positions
// ---------------------------------------------------------------------------

/// Every 12 hours from the local midnight on or before `start` through the
/// local midnight following `end`, `offset` giving the local clock.
pub fn half_day_ticks(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    offset: &FixedOffset,
) -> Result<Vec<DateTime<Utc>>> {
    if start >= end {
        return Err(SpectraError::config(format!(
            "tick range start {start} is not before end {end}"
        )));
    }

    let midnight = |ts: DateTime<Utc>| -> Result<DateTime<Utc>> {
        let local = ts.with_timezone(offset).date_naive();
        let naive = local
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| SpectraError::data(format!("no midnight on {local}")))?;
        offset
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| SpectraError::data(format!("ambiguous midnight on {local}")))
    };

    let first = midnight(start)?;
    let last = midnight(end)? + Duration::days(1);

    let mut ticks = vec![first];
    let mut moving = first;
    while moving < last {
        moving += Duration::hours(12);
        ticks.push(moving);
    }
    Ok(ticks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Offset;

    #[test]
    fn edges_follow_local_gaps() {
        let edges = bucket_edges(&[0.0, 10.0, 40.0]).unwrap();
        assert_eq!(edges, vec![-5.0, 5.0, 25.0, 55.0]);
    }

    #[test]
    fn two_points_give_three_edges() {
        assert_eq!(bucket_edges(&[100.0, 200.0]).unwrap(), vec![50.0, 150.0, 250.0]);
    }

    #[test]
    fn every_position_sits_inside_its_cell() {
        let positions = [3.0, 4.0, 9.5, 10.0, 30.0];
        let edges = bucket_edges(&positions).unwrap();
        assert_eq!(edges.len(), positions.len() + 1);
        for (i, p) in positions.iter().enumerate() {
            assert!(edges[i] <= *p && *p <= edges[i + 1]);
        }
    }

    #[test]
    fn single_point_is_a_dimension_error() {
        assert!(matches!(
            bucket_edges(&[5.0]),
            Err(SpectraError::Dimension { required: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn descending_positions_are_rejected() {
        assert!(matches!(bucket_edges(&[5.0, 4.0]), Err(SpectraError::Data(_))));
        assert!(matches!(bucket_edges(&[1.0, f64::NAN]), Err(SpectraError::Data(_))));
    }

    #[test]
    fn ticks_span_whole_local_days() {
        let utc = Utc.fix();
        let start = Utc.with_ymd_and_hms(2024, 12, 25, 7, 30, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 12, 26, 13, 0, 0).unwrap();
        let ticks = half_day_ticks(start, end, &utc).unwrap();
        assert_eq!(ticks.first(), Some(&Utc.with_ymd_and_hms(2024, 12, 25, 0, 0, 0).unwrap()));
        assert_eq!(ticks.last(), Some(&Utc.with_ymd_and_hms(2024, 12, 27, 0, 0, 0).unwrap()));
        assert_eq!(ticks.len(), 5);
    }

    #[test]
    fn ticks_use_the_local_midnight() {
        let eet = FixedOffset::east_opt(2 * 3600).unwrap();
        let start = Utc.with_ymd_and_hms(2024, 12, 24, 23, 0, 0).unwrap(); // 01:00 EET on the 25th
        let end = start + Duration::hours(1);
        let ticks = half_day_ticks(start, end, &eet).unwrap();
        assert_eq!(ticks[0], Utc.with_ymd_and_hms(2024, 12, 24, 22, 0, 0).unwrap());
        assert!(half_day_ticks(end, start, &eet).is_err());
    }
}
