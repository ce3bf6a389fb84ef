//! Surrogate-guided search over the (length, start) grid of one series

use super::state::SearchCore;
use super::{Candidate, QualityEvaluator, SearchConfig, SearchStrategy, SearchType, VisitRecord};
use crate::data::{Dataset, TimeSeries};
use crate::error::Result;
use crate::surrogate::{GaussianProcess, Surrogate};
use ndarray::{Array1, Array2};
use rand::seq::index;
use tracing::{debug, warn};

/// Bayesian-optimised search.
///
/// Evaluates `pre_samples` random grid points, then for `num_iterations`
/// rounds refits the surrogate and evaluates the unevaluated point with the
/// highest predicted quality. Inputs are `(length, start)` divided by the
/// series length.
pub struct BayesianOptimisedSearch {
    core: SearchCore,
    surrogate: Box<dyn Surrogate>,
    skipped_rounds: usize,
}

impl BayesianOptimisedSearch {
    /// Search with the default Gaussian process
    pub fn new(config: SearchConfig) -> Self {
        Self::with_surrogate(config, Box::new(GaussianProcess::default()))
    }

    /// Search with a custom surrogate
    pub fn with_surrogate(config: SearchConfig, surrogate: Box<dyn Surrogate>) -> Self {
        Self {
            core: SearchCore::new(config),
            surrogate,
            skipped_rounds: 0,
        }
    }

    /// Rounds skipped because the surrogate failed to fit, over all calls
    pub fn skipped_rounds(&self) -> usize {
        self.skipped_rounds
    }

    /// Every `(length, start)` on the increment grid of a series of `series_length`
    fn grid(&self, series_length: usize) -> Result<Vec<(usize, usize)>> {
        let config = &self.core.config;
        let max_length = self.core.max_length_for(series_length)?;
        let mut grid = Vec::new();
        for length in (config.min_length..=max_length).step_by(config.length_increment) {
            for start in (0..=series_length - length).step_by(config.position_increment) {
                grid.push((length, start));
            }
        }
        Ok(grid)
    }

    fn features(points: &[(usize, usize)], scale: f64) -> Array2<f64> {
        let mut x = Array2::zeros((points.len(), 2));
        for (i, &(length, start)) in points.iter().enumerate() {
            x[[i, 0]] = length as f64 / scale;
            x[[i, 1]] = start as f64 / scale;
        }
        x
    }

    /// Index into `pending` of the point with the highest predicted mean.
    fn next_point(&mut self, samples: &[(usize, usize, f64)], pending: &[(usize, usize)], scale: f64) -> Option<usize> {
        let trained: Vec<(usize, usize)> = samples.iter().map(|&(l, s, _)| (l, s)).collect();
        let x = Self::features(&trained, scale);
        let y: Array1<f64> = samples.iter().map(|&(_, _, q)| q).collect();

        if let Err(e) = self.surrogate.fit(&x, &y) {
            warn!(error = %e, samples = samples.len(), "Surrogate fit failed, round skipped");
            self.skipped_rounds += 1;
            return None;
        }
        let predicted = match self.surrogate.predict_mean(&Self::features(pending, scale)) {
            Ok(mean) => mean,
            Err(e) => {
                warn!(error = %e, "Surrogate prediction failed, round skipped");
                self.skipped_rounds += 1;
                return None;
            }
        };
        let mut best: Option<(usize, f64)> = None;
        for (i, &m) in predicted.iter().enumerate() {
            if m.is_nan() {
                continue;
            }
            if best.map_or(true, |(_, b)| m > b) {
                best = Some((i, m));
            }
        }
        best.map(|(i, _)| i)
    }
}

impl SearchStrategy for BayesianOptimisedSearch {
    fn initialise(&mut self, dataset: &Dataset) -> Result<()> {
        self.core.initialise(dataset)?;
        self.skipped_rounds = 0;
        Ok(())
    }

    fn search_series(
        &mut self,
        series: &TimeSeries,
        evaluator: &mut dyn QualityEvaluator,
    ) -> Result<Vec<Candidate>> {
        self.core.begin_series(series)?;
        let m = series.len();
        let scale = m as f64;
        let mut pending = self.grid(m)?;

        let mut found = Vec::new();
        let mut samples: Vec<(usize, usize, f64)> = Vec::new();

        let initial = self.core.config.pre_samples.min(pending.len());
        let mut picked = index::sample(&mut self.core.rng, pending.len(), initial).into_vec();
        // remove from the back so earlier indices stay valid
        picked.sort_unstable_by(|a, b| b.cmp(a));
        let mut seeds: Vec<(usize, usize)> = picked.into_iter().map(|i| pending.swap_remove(i)).collect();
        seeds.reverse();

        for (length, start) in seeds {
            self.core.mark_visited(length, start, 0);
            if let Some(c) = self.core.evaluate(evaluator, series, 0, start, length) {
                samples.push((length, start, c.quality));
                found.push(c);
            }
        }

        for _ in 0..self.core.config.num_iterations {
            if pending.is_empty() {
                break;
            }
            let Some(i) = self.next_point(&samples, &pending, scale) else {
                continue;
            };
            let (length, start) = pending.swap_remove(i);
            self.core.mark_visited(length, start, 0);
            if let Some(c) = self.core.evaluate(evaluator, series, 0, start, length) {
                samples.push((length, start, c.quality));
                found.push(c);
            }
        }

        debug!(
            series = series.index(),
            evaluated = found.len(),
            remaining = pending.len(),
            "Bayesian search finished"
        );
        Ok(found)
    }

    fn search_type(&self) -> SearchType {
        SearchType::Bayesian
    }

    fn config(&self) -> &SearchConfig {
        &self.core.config
    }

    fn visits(&self) -> &[VisitRecord] {
        self.core.visits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShapeletError;
    use std::collections::HashSet;

    fn dataset() -> Dataset {
        Dataset::new(vec![TimeSeries::univariate(vec![0.0; 30], 0)]).unwrap()
    }

    #[test]
    fn test_no_point_evaluated_twice() {
        let ds = dataset();
        let config = SearchConfig::new()
            .with_lengths(3, 8)
            .with_bayesian_budget(10, 15)
            .with_record_visits(true)
            .with_seed(6);
        let mut search = BayesianOptimisedSearch::new(config);
        search.initialise(&ds).unwrap();
        let mut eval = |s: &TimeSeries, d: usize, st: usize, l: usize| {
            let q = -((st as f64 - 12.0).powi(2) + (l as f64 - 6.0).powi(2));
            Some(Candidate::for_window(s, d, st, l, q))
        };
        let found = search.search_series(ds.series(0).unwrap(), &mut eval).unwrap();
        assert_eq!(found.len(), 25);
        let distinct: HashSet<_> = search.visits().iter().map(|v| (v.length, v.start)).collect();
        assert_eq!(distinct.len(), 25);
    }

    #[test]
    fn test_stops_when_grid_exhausted() {
        let ds = Dataset::new(vec![TimeSeries::univariate(vec![0.0; 6], 0)]).unwrap();
        // lengths 3..=4 on m = 6: 4 + 3 grid points
        let config = SearchConfig::new().with_lengths(3, 4).with_bayesian_budget(2, 100);
        let mut search = BayesianOptimisedSearch::new(config);
        search.initialise(&ds).unwrap();
        let mut eval = |s: &TimeSeries, d: usize, st: usize, l: usize| {
            Some(Candidate::for_window(s, d, st, l, (st + l) as f64))
        };
        let found = search.search_series(ds.series(0).unwrap(), &mut eval).unwrap();
        assert_eq!(found.len(), 7);
    }

    struct FailingSurrogate;

    impl Surrogate for FailingSurrogate {
        fn fit(&mut self, _: &Array2<f64>, _: &Array1<f64>) -> Result<()> {
            Err(ShapeletError::SurrogateError("ill-conditioned".to_string()))
        }

        fn predict(&self, _: &Array2<f64>) -> Result<(Array1<f64>, Array1<f64>)> {
            Err(ShapeletError::ModelNotFitted)
        }

        fn is_fitted(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_fit_failure_skips_round() {
        let ds = dataset();
        let config = SearchConfig::new().with_lengths(3, 5).with_bayesian_budget(4, 6);
        let mut search = BayesianOptimisedSearch::with_surrogate(config, Box::new(FailingSurrogate));
        search.initialise(&ds).unwrap();
        let mut eval = |s: &TimeSeries, d: usize, st: usize, l: usize| {
            Some(Candidate::for_window(s, d, st, l, 0.0))
        };
        let found = search.search_series(ds.series(0).unwrap(), &mut eval).unwrap();
        assert_eq!(found.len(), 4);
        assert_eq!(search.skipped_rounds(), 6);
    }

    #[test]
    fn test_all_rejected_skips_every_round() {
        let ds = dataset();
        let config = SearchConfig::new().with_lengths(3, 5).with_bayesian_budget(3, 5);
        let mut search = BayesianOptimisedSearch::new(config);
        search.initialise(&ds).unwrap();
        let mut reject = |_: &TimeSeries, _: usize, _: usize, _: usize| -> Option<Candidate> { None };
        let found = search.search_series(ds.series(0).unwrap(), &mut reject).unwrap();
        assert!(found.is_empty());
        assert_eq!(search.skipped_rounds(), 5);
    }
}
