/// Data layer: readings, alignment, and window selection.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse files → Vec<RawReading>   (codec decodes spectra)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ dataset   │  DatasetBuilder → AlignedDataset (timestamp × sensor × channel)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  one sensor, [start, end], base present → FilteredSeries
///   └──────────┘
/// ```

pub mod codec;
pub mod dataset;
pub mod filter;
pub mod loader;
pub mod model;
