//! Shapelet search strategies
//!
//! Every strategy walks the `(length, start, dimension)` space of one series at
//! a time and submits windows to a caller-supplied [`QualityEvaluator`]:
//! - Full enumeration and deterministic skipping
//! - Random, timed random, importance-sampled, refined and skewed sampling
//! - Hill climbing, magnify, tabu and genetic search
//! - SAX random projection (fast shapelets)
//! - Gaussian-process guided (Bayesian) search
//!
//! Strategies are seeded once and are deterministic for a given
//! configuration and dataset. State carried between `search_series` calls
//! depends on call order, so series must be presented in dataset order.

mod bayesian;
pub mod budget;
mod config;
mod state;
mod factory;
mod fast_shapelets;
mod full;
mod genetic;
mod local;
mod magnify;
mod random;
mod sampled;
mod skipping;
mod tabu;
mod visited;

pub use bayesian::BayesianOptimisedSearch;
pub use config::{SearchConfig, SearchType};
pub use factory::{create_search, ShapeletSearcher};
pub use fast_shapelets::{separation_score, FastShapeletSearch, SaxWord, ScoredWord};
pub use full::FullSearch;
pub use genetic::GeneticSearch;
pub use local::LocalSearch;
pub use magnify::{MagnifySearch, Rectangle};
pub use random::{RandomSearch, RandomTimedSearch};
pub use sampled::{
    cumulative_counts, sample_bucket, ImportanceSampledSearch, RefinedRandomSearch,
    SkewedRandomSearch,
};
pub use skipping::{SkipCursor, SkippingSearch};
pub use tabu::{neighbourhood, TabuList, TabuSearch};
pub use visited::VisitedTracker;

use crate::data::{Dataset, TimeSeries};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A scored window into one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Index of the owning series in its dataset
    pub series_index: usize,
    /// Dimension the window was taken from
    pub dimension: usize,
    /// First sample of the window
    pub start: usize,
    /// Number of samples in the window
    pub length: usize,
    /// Quality assigned by the evaluator; higher is better
    pub quality: f64,
}

impl Candidate {
    pub fn new(series_index: usize, dimension: usize, start: usize, length: usize, quality: f64) -> Self {
        Self {
            series_index,
            dimension,
            start,
            length,
            quality,
        }
    }

    /// Candidate for a window of `series`
    pub fn for_window(series: &TimeSeries, dimension: usize, start: usize, length: usize, quality: f64) -> Self {
        Self::new(series.index(), dimension, start, length, quality)
    }

    /// Total order on quality (NaN sorts lowest)
    pub fn cmp_quality(&self, other: &Self) -> Ordering {
        match (self.quality.is_nan(), other.quality.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.quality.total_cmp(&other.quality),
        }
    }

    /// Strictly better quality than `other`
    pub fn is_better_than(&self, other: &Self) -> bool {
        self.cmp_quality(other) == Ordering::Greater
    }
}

/// Scores a window, or rejects it with `None`.
///
/// Rejection is a normal outcome (e.g. early abandon) and is never treated
/// as an error by the strategies.
pub trait QualityEvaluator {
    fn evaluate(
        &mut self,
        series: &TimeSeries,
        dimension: usize,
        start: usize,
        length: usize,
    ) -> Option<Candidate>;
}

impl<F> QualityEvaluator for F
where
    F: FnMut(&TimeSeries, usize, usize, usize) -> Option<Candidate>,
{
    fn evaluate(
        &mut self,
        series: &TimeSeries,
        dimension: usize,
        start: usize,
        length: usize,
    ) -> Option<Candidate> {
        self(series, dimension, start, length)
    }
}

/// One evaluator submission, kept when `record_visits` is enabled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub series_index: usize,
    pub length: usize,
    pub start: usize,
    pub dimension: usize,
    /// `None` when the evaluator rejected the window
    pub quality: Option<f64>,
}

/// Common interface of every search strategy
pub trait SearchStrategy: Send {
    /// Validate the configuration against `dataset` and precompute any
    /// dataset-wide state. Resets state left by a previous dataset.
    fn initialise(&mut self, dataset: &Dataset) -> Result<()>;

    /// Search one series and return the scored candidates found.
    fn search_series(
        &mut self,
        series: &TimeSeries,
        evaluator: &mut dyn QualityEvaluator,
    ) -> Result<Vec<Candidate>>;

    /// Selector this strategy was built for
    fn search_type(&self) -> SearchType;

    /// Configuration the strategy was built with
    fn config(&self) -> &SearchConfig;

    /// Evaluator submissions recorded so far (empty unless `record_visits`)
    fn visits(&self) -> &[VisitRecord];

    /// Initialise on `dataset` and search every series in order.
    fn search_dataset(
        &mut self,
        dataset: &Dataset,
        evaluator: &mut dyn QualityEvaluator,
    ) -> Result<Vec<Vec<Candidate>>> {
        self.initialise(dataset)?;
        let mut found = Vec::with_capacity(dataset.len());
        for series in dataset {
            found.push(self.search_series(series, &mut *evaluator)?);
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_ordering() {
        let a = Candidate::new(0, 0, 0, 5, 0.5);
        let b = Candidate::new(0, 0, 1, 5, 0.7);
        let nan = Candidate::new(0, 0, 2, 5, f64::NAN);
        assert!(b.is_better_than(&a));
        assert!(!a.is_better_than(&b));
        assert!(a.is_better_than(&nan));
        assert!(!a.is_better_than(&a));
    }

    #[test]
    fn test_closure_evaluator() {
        let series = TimeSeries::univariate(vec![0.0; 10], 0);
        let mut calls = 0;
        let mut eval = |s: &TimeSeries, d: usize, st: usize, l: usize| {
            calls += 1;
            Some(Candidate::for_window(s, d, st, l, l as f64))
        };
        let c = eval.evaluate(&series, 0, 2, 4).unwrap();
        assert_eq!(c.quality, 4.0);
        assert_eq!(calls, 1);
    }
}
