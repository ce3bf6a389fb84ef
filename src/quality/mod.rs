//! Reference quality measure for candidate windows
//!
//! Scores a window by how well its distance to each series separates the
//! classes (one-way ANOVA F-statistic over the orderline). Used by the CLI
//! and benchmarks; strategies only see the [`QualityEvaluator`] trait.

use crate::data::{Dataset, TimeSeries};
use crate::search::{Candidate, QualityEvaluator};

const STD_EPSILON: f64 = 1e-12;

/// Z-normalise a subsequence; flat input maps to zeros.
pub fn z_normalise(values: &[f64]) -> Vec<f64> {
    let n = values.len() as f64;
    if values.is_empty() {
        return Vec::new();
    }
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    if std < STD_EPSILON {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - mean) / std).collect()
}

/// Smallest mean squared distance between `shapelet` (already z-normalised)
/// and any z-normalised window of `series`. `None` when the series is shorter.
pub fn min_subsequence_distance(shapelet: &[f64], series: &[f64]) -> Option<f64> {
    let length = shapelet.len();
    if length == 0 || series.len() < length {
        return None;
    }
    let mut best = f64::INFINITY;
    for window in series.windows(length) {
        let normalised = z_normalise(window);
        let mut sum = 0.0;
        for (a, b) in shapelet.iter().zip(&normalised) {
            sum += (a - b) * (a - b);
            if sum >= best * length as f64 {
                break;
            }
        }
        best = best.min(sum / length as f64);
    }
    Some(best)
}

/// One-way ANOVA F-statistic of `(class, value)` pairs.
///
/// `None` with fewer than two classes present.
pub fn f_statistic(orderline: &[(usize, f64)], num_classes: usize) -> Option<f64> {
    let mut sums = vec![0.0; num_classes];
    let mut counts = vec![0usize; num_classes];
    for &(class, value) in orderline {
        sums[class] += value;
        counts[class] += 1;
    }
    let present = counts.iter().filter(|&&c| c > 0).count();
    if present < 2 {
        return None;
    }

    let total = orderline.len() as f64;
    let grand_mean = sums.iter().sum::<f64>() / total;
    let means: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
        .collect();

    let between: f64 = means
        .iter()
        .zip(&counts)
        .map(|(m, &c)| c as f64 * (m - grand_mean).powi(2))
        .sum();
    let within: f64 = orderline.iter().map(|&(class, v)| (v - means[class]).powi(2)).sum();

    let df_between = (present - 1) as f64;
    let df_within = (orderline.len().saturating_sub(present)).max(1) as f64;
    Some((between / df_between) / (within / df_within).max(STD_EPSILON))
}

/// Scores windows against a dataset with the F-statistic.
pub struct FStatEvaluator<'a> {
    dataset: &'a Dataset,
    evaluations: usize,
}

impl<'a> FStatEvaluator<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self {
            dataset,
            evaluations: 0,
        }
    }

    /// Windows scored so far
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }
}

impl QualityEvaluator for FStatEvaluator<'_> {
    fn evaluate(
        &mut self,
        series: &TimeSeries,
        dimension: usize,
        start: usize,
        length: usize,
    ) -> Option<Candidate> {
        let window = series.window(dimension, start, length)?;
        self.evaluations += 1;
        let shapelet = z_normalise(window);

        let orderline: Vec<(usize, f64)> = self
            .dataset
            .iter()
            .filter_map(|other| {
                let values = other.dimension(dimension)?;
                min_subsequence_distance(&shapelet, values).map(|d| (other.label(), d))
            })
            .collect();

        let quality = f_statistic(&orderline, self.dataset.num_classes())?;
        Some(Candidate::for_window(series, dimension, start, length, quality))
    }
}
