/// Analysis layer over a [`FilteredSeries`](crate::data::filter::FilteredSeries).
///
/// ```text
///   FilteredSeries ──┬──► folding   hour-of-day bins → MeanSpectrum
///                    ├──► distance  Pearson / cosine / angular / Euclidean
///                    └──► axis      irregular cell edges, day ticks
///                                  │
///                                  ▼
///                               report  (JSON / CSV for renderers)
/// ```

pub mod axis;
pub mod distance;
pub mod folding;
pub mod report;
