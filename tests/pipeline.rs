use std::io::Write;

use chrono::{DateTime, Offset, TimeZone, Utc};
use hive_spectra::analysis::report::correlation_report;
use hive_spectra::data::loader::load_file;
use hive_spectra::{
    bucket_edges_for, build_dataset, compute_distances, filter_window, HourFolder, RawReading,
    SensorId, SpectraError, TimeWindow,
};

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

#[test]
fn three_readings_align_and_measure() {
    let rows = vec![
        RawReading::new(ts(100), "A", vec![1.0, 2.0]),
        RawReading::new(ts(200), "A", vec![2.0, 2.0]),
        RawReading::new(ts(300), "A", vec![1.0, 2.0, 3.0]),
    ];
    let ds = build_dataset(&rows).unwrap();
    assert_eq!(ds.channels(), 3);

    let window = TimeWindow::new(ts(100), ts(300)).unwrap();
    let series = filter_window(&ds, &"A".into(), &window).unwrap();
    assert_eq!(
        series.spectra(),
        vec![&[1.0, 2.0, 0.0][..], &[2.0, 2.0, 0.0][..], &[1.0, 2.0, 3.0][..]]
    );

    let d = compute_distances(&series.spectra()).unwrap();
    assert!((d.euclidean.get(0, 1) - 1.0).abs() < 1e-12);
    assert!((d.euclidean.get(0, 2) - 3.0).abs() < 1e-12);

    let edges = bucket_edges_for(&series).unwrap();
    assert_eq!(edges, vec![50.0, 150.0, 250.0, 350.0]);
}

#[test]
fn one_valid_timestamp_is_too_few_for_every_stage() {
    let rows = vec![
        RawReading::new(ts(100), "A", vec![1.0, 2.0]),
        RawReading::new(ts(200), "B", vec![2.0, 2.0]),
    ];
    let ds = build_dataset(&rows).unwrap();
    let window = TimeWindow::new(ts(0), ts(1000)).unwrap();
    let series = filter_window(&ds, &"A".into(), &window).unwrap();
    assert_eq!(series.len(), 1);

    assert!(matches!(
        hive_spectra::fold(&series),
        Err(SpectraError::Dimension { .. })
    ));
    assert!(matches!(
        compute_distances(&series.spectra()),
        Err(SpectraError::Dimension { .. })
    ));
    assert!(matches!(
        bucket_edges_for(&series),
        Err(SpectraError::Dimension { .. })
    ));
}

#[test]
fn empty_batch_is_rejected() {
    assert!(matches!(build_dataset(&[]), Err(SpectraError::Configuration(_))));
}

#[test]
fn base_presence_tracks_every_input_pair() {
    let pairs = [(10, "20"), (20, "21"), (30, "20"), (30, "46"), (45, "21")];
    let rows: Vec<RawReading> = pairs
        .iter()
        .map(|&(t, s)| RawReading::new(ts(t), s, vec![t as f64; (t / 10) as usize]))
        .collect();
    let ds = build_dataset(&rows).unwrap();

    for (t_idx, t) in ds.timestamps().iter().enumerate() {
        for (s_idx, s) in ds.sensors().iter().enumerate() {
            let expected = pairs
                .iter()
                .any(|&(pt, ps)| ts(pt) == *t && SensorId::from(ps) == *s);
            assert_eq!(ds.has_reading(t_idx, s_idx), expected, "{t} / {s}");
            if expected {
                assert_eq!(ds.spectrum(t_idx, s_idx).map(<[f64]>::len), Some(ds.channels()));
            }
        }
    }
    assert_eq!(ds.channels(), 4);
}

#[test]
fn csv_file_to_distance_report() {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "Date,Sensor,Sensor_pack,Base,Temperature,Humidity,Spectrum").unwrap();
    writeln!(file, "2024-12-25 08:00:00+00:00,20,1,3,20.0,60,[1.0;2.0]").unwrap();
    writeln!(file, "2024-12-25 08:20:00+00:00,21,1,3,20.0,60,[5.0;1.0]").unwrap();
    writeln!(file, "2024-12-25 09:00:00+00:00,20,1,3,20.5,59,[2.0;2.0]").unwrap();
    writeln!(file, "2024-12-25 11:00:00+00:00,20,1,3,21.0,58,[1.0;2.0;3.0]").unwrap();
    file.flush().unwrap();

    let ds = build_dataset(&load_file(file.path()).unwrap()).unwrap();
    assert_eq!(ds.sensors().len(), 2);
    assert_eq!(ds.timestamps().len(), 4);

    let start = Utc.with_ymd_and_hms(2024, 12, 25, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 12, 25, 23, 59, 59).unwrap();
    let window = TimeWindow::new(start, end).unwrap();
    let report = correlation_report(&ds, &"20".into(), &window, &Utc.fix()).unwrap();

    assert_eq!(report.timestamps.len(), 3);
    // Gaps of 1h and 2h: outer cells mirror them.
    let t0 = start.timestamp() as f64 + 8.0 * 3600.0;
    assert_eq!(
        report.edges,
        vec![t0 - 1800.0, t0 + 1800.0, t0 + 7200.0, t0 + 3.0 * 3600.0 + 3600.0]
    );
    assert!((report.distances.euclidean.get(0, 2) - 3.0).abs() < 1e-12);

    let mean = HourFolder::utc()
        .mean_spectrum(&filter_window(&ds, &"20".into(), &window).unwrap())
        .unwrap();
    assert_eq!(mean.hours_observed, 3);
}
