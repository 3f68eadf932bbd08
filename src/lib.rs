//! Alignment and distance engines for multi-sensor acoustic spectra.
//!
//! Irregularly sampled readings (one row per sensor per timestamp, each with a
//! variable-length spectrum) are aligned into a dense label-indexed dataset,
//! from which the crate derives:
//! - hour-of-day folded mean spectra per sensor
//! - Pearson, cosine, angular and Euclidean distance matrices between the
//!   spectra a sensor recorded inside a time window
//! - cell edges for drawing those matrices against real elapsed time
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use hive_spectra::{build_dataset, filter_window, compute_distances, RawReading, TimeWindow};
//!
//! let at = |s| Utc.timestamp_opt(s, 0).unwrap();
//! let rows = vec![
//!     RawReading::new(at(100), "A", vec![1.0, 2.0]),
//!     RawReading::new(at(200), "A", vec![2.0, 2.0]),
//! ];
//! let ds = build_dataset(&rows).unwrap();
//! let series = filter_window(&ds, &"A".into(), &TimeWindow::new(at(0), at(300)).unwrap()).unwrap();
//! let d = compute_distances(&series.spectra()).unwrap();
//! assert_eq!(d.euclidean.get(0, 1), 1.0);
//! ```

pub mod analysis;
pub mod config;
pub mod data;
pub mod error;


pub use analysis::axis::{bucket_edges, bucket_edges_for, half_day_ticks};
pub use analysis::distance::{compute_distances, DistanceMatrix, DistanceSet, Metric};
pub use analysis::folding::{fold, mean_spectrum, FoldedSpectrum, HourFolder, MeanSpectrum};
pub use config::AnalysisConfig;
pub use data::dataset::{build_dataset, AlignedDataset, BuilderConfig, DatasetBuilder, DuplicatePolicy};
pub use data::filter::{filter_window, FilteredSeries, TimeWindow};
pub use data::model::{RawReading, SensorId};
pub use error::{Result, SpectraError};
