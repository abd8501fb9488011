//! Summary statistics over cohort lesion volumes.
//!
//! Pure slice-in/struct-out helpers; callers collect the volumes from a
//! measured dataset and choose how to present the results.

use serde::Serialize;

/// Distribution summary of a set of lesion volumes (mm^3).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

impl VolumeSummary {
    /// Summarize a set of volumes. Returns `None` for an empty set.
    pub fn from_volumes(volumes: &[f64]) -> Option<Self> {
        if volumes.is_empty() {
            return None;
        }

        let mut sorted = volumes.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        Some(Self {
            count: sorted.len(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            mean: sorted.iter().sum::<f64>() / sorted.len() as f64,
            median: percentile(&sorted, 50.0),
        })
    }
}

/// Quantile-based small/medium/large size bins.
///
/// Thresholds sit at the 33.3rd and 66.7th percentiles of the observed
/// volume distribution; counts partition the input at those thresholds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeBins {
    /// Volumes strictly below this are "small" (mm^3).
    pub small_below: f64,
    /// Volumes strictly above this are "large" (mm^3).
    pub large_above: f64,
    pub small: usize,
    pub medium: usize,
    pub large: usize,
}

impl SizeBins {
    /// Bin a set of volumes. Returns `None` for an empty set.
    pub fn from_volumes(volumes: &[f64]) -> Option<Self> {
        if volumes.is_empty() {
            return None;
        }

        let mut sorted = volumes.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let small_below = percentile(&sorted, 33.3);
        let large_above = percentile(&sorted, 66.7);

        let small = volumes.iter().filter(|&&v| v < small_below).count();
        let large = volumes.iter().filter(|&&v| v > large_above).count();
        Some(Self {
            small_below,
            large_above,
            small,
            medium: volumes.len() - small - large,
            large,
        })
    }
}

/// Linearly interpolated percentile of pre-sorted values.
///
/// `p` is in [0, 100]; the rank is p/100 * (n - 1) with linear
/// interpolation between the surrounding order statistics.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    assert!(!sorted.is_empty(), "percentile of an empty set");
    if sorted.len() == 1 {
        return sorted[0];
    }

    let rank = p.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

/// Equal-width histogram counts over [min, max].
///
/// Values equal to the maximum land in the last bin. A degenerate range
/// (all values equal) puts everything in the first bin.
pub fn histogram(volumes: &[f64], bins: usize) -> Vec<usize> {
    assert!(bins > 0, "histogram needs at least one bin");
    let mut counts = vec![0usize; bins];
    if volumes.is_empty() {
        return counts;
    }

    let min = volumes.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = volumes.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let width = (max - min) / bins as f64;

    for &volume in volumes {
        let bin = if width == 0.0 {
            0
        } else {
            (((volume - min) / width) as usize).min(bins - 1)
        };
        counts[bin] += 1;
    }
    counts
}
