use std::f64::consts::PI;

use serde::Serialize;

use crate::error::{Result, SpectraError};

// ---------------------------------------------------------------------------
// DistanceMatrix
// ---------------------------------------------------------------------------

/// Square, symmetric, row-major N×N matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceMatrix {
    size: usize,
    values: Vec<f64>,
}

impl DistanceMatrix {
    /// Fill the upper triangle with `f` and mirror it; the diagonal stays 0.
    fn from_pairs(size: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut values = vec![0.0; size * size];
        for i in 0..size {
            for j in (i + 1)..size {
                let d = f(i, j);
                values[i * size + j] = d;
                values[j * size + i] = d;
            }
        }
        Self { size, values }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.size + j]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.values.chunks(self.size.max(1))
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }
}

/// The four matrices computed over one set of spectra.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceSet {
    pub pearson: DistanceMatrix,
    pub cosine: DistanceMatrix,
    pub angular: DistanceMatrix,
    pub euclidean: DistanceMatrix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Pearson,
    Cosine,
    Angular,
    Euclidean,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Pearson,
        Metric::Cosine,
        Metric::Angular,
        Metric::Euclidean,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Pearson => "pearson",
            Metric::Cosine => "cosine",
            Metric::Angular => "angular",
            Metric::Euclidean => "euclidean",
        }
    }
}

impl DistanceSet {
    pub fn get(&self, metric: Metric) -> &DistanceMatrix {
        match metric {
            Metric::Pearson => &self.pearson,
            Metric::Cosine => &self.cosine,
            Metric::Angular => &self.angular,
            Metric::Euclidean => &self.euclidean,
        }
    }
}

// ---------------------------------------------------------------------------
// Input checks and vector helpers
// ---------------------------------------------------------------------------

fn check_input<S: AsRef<[f64]>>(operation: &'static str, spectra: &[S]) -> Result<usize> {
    SpectraError::require_points(operation, 2, spectra.len())?;
    let width = spectra[0].as_ref().len();
    if let Some((i, s)) = spectra
        .iter()
        .enumerate()
        .find(|(_, s)| s.as_ref().len() != width)
    {
        return Err(SpectraError::data(format!(
            "{operation}: spectrum {i} has {} channels, spectrum 0 has {width}",
            s.as_ref().len()
        )));
    }
    Ok(width)
}

fn dot(u: &[f64], v: &[f64]) -> f64 {
    u.iter().zip(v).map(|(a, b)| a * b).sum()
}

fn norms<S: AsRef<[f64]>>(operation: &'static str, spectra: &[S]) -> Result<Vec<f64>> {
    spectra
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let n = dot(s.as_ref(), s.as_ref()).sqrt();
            if n == 0.0 {
                return Err(SpectraError::data(format!(
                    "{operation}: spectrum {i} is all zeros, similarity is undefined"
                )));
            }
            Ok(n)
        })
        .collect()
}

fn cosine_similarity(u: &[f64], v: &[f64], norm_u: f64, norm_v: f64) -> f64 {
    dot(u, v) / (norm_u * norm_v)
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// `1 − r` where `r` is the Pearson correlation; range [0, 2].
pub fn pearson_distance<S: AsRef<[f64]>>(spectra: &[S]) -> Result<DistanceMatrix> {
    const OP: &str = "pearson distance";
    check_input(OP, spectra)?;

    // Centring a constant spectrum leaves rounding residue, not exact zeros.
    if let Some(i) = spectra.iter().position(|s| {
        let s = s.as_ref();
        s.iter().all(|v| *v == s[0])
    }) {
        return Err(SpectraError::data(format!(
            "{OP}: spectrum {i} is constant, correlation is undefined"
        )));
    }

    let centered: Vec<Vec<f64>> = spectra
        .iter()
        .map(|s| {
            let s = s.as_ref();
            let mean = s.iter().sum::<f64>() / s.len() as f64;
            s.iter().map(|v| v - mean).collect()
        })
        .collect();
    let norms = norms(OP, &centered)?;

    Ok(DistanceMatrix::from_pairs(spectra.len(), |i, j| {
        1.0 - cosine_similarity(&centered[i], &centered[j], norms[i], norms[j])
    }))
}

/// `1 − cos θ`; range [0, 2].
pub fn cosine_distance<S: AsRef<[f64]>>(spectra: &[S]) -> Result<DistanceMatrix> {
    const OP: &str = "cosine distance";
    check_input(OP, spectra)?;
    let norms = norms(OP, spectra)?;
    Ok(DistanceMatrix::from_pairs(spectra.len(), |i, j| {
        1.0 - cosine_similarity(spectra[i].as_ref(), spectra[j].as_ref(), norms[i], norms[j])
    }))
}

/// `arccos(cos θ) / π`; range [0, 1]. The similarity is clamped to [−1, 1]
/// first to absorb rounding overshoot.
pub fn angular_distance<S: AsRef<[f64]>>(spectra: &[S]) -> Result<DistanceMatrix> {
    const OP: &str = "angular distance";
    check_input(OP, spectra)?;
    let norms = norms(OP, spectra)?;
    Ok(DistanceMatrix::from_pairs(spectra.len(), |i, j| {
        cosine_similarity(spectra[i].as_ref(), spectra[j].as_ref(), norms[i], norms[j])
            .clamp(-1.0, 1.0)
            .acos()
            / PI
    }))
}

/// `‖u − v‖₂`; range [0, ∞).
pub fn euclidean_distance<S: AsRef<[f64]>>(spectra: &[S]) -> Result<DistanceMatrix> {
    check_input("euclidean distance", spectra)?;
    Ok(DistanceMatrix::from_pairs(spectra.len(), |i, j| {
        spectra[i]
            .as_ref()
            .iter()
            .zip(spectra[j].as_ref())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }))
}

/// All four matrices over the same spectra.
pub fn compute_distances<S: AsRef<[f64]>>(spectra: &[S]) -> Result<DistanceSet> {
    Ok(DistanceSet {
        pearson: pearson_distance(spectra)?,
        cosine: cosine_distance(spectra)?,
        angular: angular_distance(spectra)?,
        euclidean: euclidean_distance(spectra)?,
    })
}
