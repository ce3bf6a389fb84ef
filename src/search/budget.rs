//! Evaluation budgets and series subsampling

use rand::seq::index;
use rand::Rng;
use tracing::{debug, warn};

/// Number of windows of every length in `[min_length, max_length]` over
/// `num_series` series of length `series_length`.
pub fn theoretical_shapelet_count(
    num_series: usize,
    series_length: usize,
    min_length: usize,
    max_length: usize,
) -> u64 {
    let per_series: u64 = (min_length..=max_length.min(series_length))
        .map(|l| (series_length - l + 1) as u64)
        .sum();
    per_series * num_series as u64
}

/// Analytic cost of assessing one window of `length` against the other
/// series, used in place of a wall clock by the timed random search.
pub fn timed_cost(series_length: usize, length: usize, num_series: usize) -> u64 {
    let windows = series_length.saturating_sub(length) as u64 + 1;
    windows * length as u64 * num_series.saturating_sub(1).max(1) as u64
}

/// Which series a subsampling strategy considers and how many evaluations
/// each one gets.
#[derive(Debug, Clone)]
pub struct SubsamplePlan {
    considered: Vec<bool>,
    per_series: u64,
    proportion: f64,
}

impl SubsamplePlan {
    /// Plan a subsample of `num_series` series.
    ///
    /// When the per-series budget falls below `sqrt(series_length)`, the
    /// proportion is lowered to `sqrt(n) / n` so fewer series each receive
    /// more evaluations.
    pub fn new<R: Rng + ?Sized>(
        num_series: usize,
        series_length: usize,
        num_shapelets: u64,
        proportion: f64,
        rng: &mut R,
    ) -> Self {
        let n = num_series.max(1) as f64;
        let mut proportion = proportion;
        let mut subsample = n * proportion;
        let mut per_series = (num_shapelets as f64 / subsample) as u64;

        if (per_series as f64) < (series_length as f64).sqrt() {
            proportion = n.sqrt() / n;
            subsample = n * proportion;
            per_series = (num_shapelets as f64 / subsample) as u64;
            debug!(subsample = subsample as usize, per_series, "Reduced series subsample");
        }

        if per_series < 1 {
            warn!(num_shapelets, num_series, "Too few starting shapelets per series");
        }

        let considered = if proportion >= 1.0 {
            vec![true; num_series]
        } else {
            let amount = (subsample.ceil() as usize).clamp(1, num_series.max(1));
            let mut considered = vec![false; num_series];
            for i in index::sample(rng, num_series, amount.min(num_series)) {
                considered[i] = true;
            }
            considered
        };

        Self {
            considered,
            per_series,
            proportion,
        }
    }

    /// Whether the series at call position `i` is searched
    pub fn considers(&self, i: usize) -> bool {
        self.considered.get(i).copied().unwrap_or(false)
    }

    /// Evaluations granted to each considered series
    pub fn per_series(&self) -> u64 {
        self.per_series
    }

    /// Effective proportion after the square-root adjustment
    pub fn proportion(&self) -> f64 {
        self.proportion
    }

    /// Number of considered series
    pub fn num_considered(&self) -> usize {
        self.considered.iter().filter(|&&c| c).count()
    }
}
