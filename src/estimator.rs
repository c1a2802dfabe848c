//! Average distance of a set of 3D samples, ignoring unreliable readings.

use log::trace;
use rayon::prelude::*;

use crate::error::{Error, Result};

/// Position in camera space in cm. Pixels without depth data carry NaN or infinite components.
pub type Point3 = nalgebra::Point3<f32>;

/// Samples farther away than this (in cm) are considered background.
pub const DEFAULT_THRESHOLD_CM: f32 = 120.0;

/// Outcome of one estimation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Estimate {
    /// Mean magnitude of the `valid` samples that passed the filter, out of `total` samples.
    Distance {
        mean_cm: f32,
        valid: usize,
        total: usize,
    },
    /// None of the `total` samples was finite and closer than the threshold.
    NoData { total: usize },
}
impl Estimate {
    /// The mean distance, or `None` if no sample was usable.
    pub fn distance(&self) -> Option<f32> {
        match self {
            Estimate::Distance { mean_cm, .. } => Some(*mean_cm),
            Estimate::NoData { .. } => None,
        }
    }

    /// Numeric form where "no data" collapses to `0.0`. Only meant for the log file, which has no other way to express a missing value.
    pub fn sentinel(&self) -> f32 {
        self.distance().unwrap_or(0.0)
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Estimate::NoData { .. })
    }

    /// Number of samples that contributed to the mean.
    pub fn valid(&self) -> usize {
        match self {
            Estimate::Distance { valid, .. } => *valid,
            Estimate::NoData { .. } => 0,
        }
    }
}

/// Running sum of accepted magnitudes. Two accumulators over disjoint sample sets can be merged, which gives the same result as accumulating the concatenated set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accumulator {
    sum: f64,
    valid: usize,
    total: usize,
}
impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one sample. Non-finite magnitudes and magnitudes `>= threshold` are counted in `total` only.
    pub fn push(&mut self, sample: &Point3, threshold: f32) {
        self.total += 1;
        let m = magnitude(sample);
        if m.is_finite() && m < threshold {
            trace!("sample {:?}: {:.2} cm", sample, m);
            self.sum += m as f64;
            self.valid += 1;
        } else {
            trace!("sample {:?}: rejected ({})", sample, m);
        }
    }

    pub fn merge(self, other: Self) -> Self {
        Self {
            sum: self.sum + other.sum,
            valid: self.valid + other.valid,
            total: self.total + other.total,
        }
    }

    pub fn valid(&self) -> usize {
        self.valid
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn finish(&self) -> Estimate {
        if self.valid == 0 {
            Estimate::NoData { total: self.total }
        } else {
            Estimate::Distance {
                mean_cm: (self.sum / self.valid as f64) as f32,
                valid: self.valid,
                total: self.total,
            }
        }
    }
}

/// Euclidean distance of `p` from the camera origin.
pub fn magnitude(p: &Point3) -> f32 {
    p.coords.norm()
}

/// Averages the magnitudes of all `samples` that are finite and strictly below `threshold`. Invalid samples are skipped silently, they never fail the estimation. An empty slice or a threshold that is not a positive finite number is a caller error.
pub fn estimate(samples: &[Point3], threshold: f32) -> Result<Estimate> {
    check_arguments(samples, threshold)?;

    let mut acc = Accumulator::new();
    for s in samples {
        acc.push(s, threshold);
    }
    Ok(acc.finish())
}

/// Same as `estimate()` but reduces the samples on the rayon thread pool. Only worth it for large sample sets.
pub fn estimate_par(samples: &[Point3], threshold: f32) -> Result<Estimate> {
    check_arguments(samples, threshold)?;

    let acc = samples
        .par_iter()
        .fold(Accumulator::new, |mut acc, s| {
            acc.push(s, threshold);
            acc
        })
        .reduce(Accumulator::new, Accumulator::merge);
    Ok(acc.finish())
}

/// Distance of a single point rounded to two decimals, `None` if the point carries no depth.
pub fn point_distance(p: &Point3) -> Option<f32> {
    let m = magnitude(p);
    m.is_finite().then(|| (m * 100.0).round() / 100.0)
}

/// Rejects thresholds that are NaN, infinite, zero or negative.
pub fn check_threshold(threshold: f32) -> Result<()> {
    if threshold.is_finite() && threshold > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidThreshold(threshold))
    }
}

fn check_arguments(samples: &[Point3], threshold: f32) -> Result<()> {
    check_threshold(threshold)?;
    if samples.is_empty() {
        return Err(Error::EmptySampleSet);
    }
    Ok(())
}
