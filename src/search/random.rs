//! Uniform random sampling under draw and operation-count budgets

use super::budget::timed_cost;
use super::state::SearchCore;
use super::{Candidate, QualityEvaluator, SearchConfig, SearchStrategy, SearchType, VisitRecord};
use crate::data::{Dataset, TimeSeries};
use crate::error::Result;
use tracing::debug;

/// Draws `num_shapelets` windows per series uniformly, skipping duplicates.
///
/// Duplicate draws still consume the budget, so the evaluator is called at
/// most `num_shapelets` times per series.
pub struct RandomSearch {
    core: SearchCore,
}

impl RandomSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            core: SearchCore::new(config),
        }
    }
}

impl SearchStrategy for RandomSearch {
    fn initialise(&mut self, dataset: &Dataset) -> Result<()> {
        self.core.initialise(dataset)
    }

    fn search_series(
        &mut self,
        series: &TimeSeries,
        evaluator: &mut dyn QualityEvaluator,
    ) -> Result<Vec<Candidate>> {
        self.core.begin_series(series)?;
        let m = series.len();

        let mut found = Vec::new();
        for _ in 0..self.core.config.num_shapelets {
            let (length, start, dimension) = self.core.random_window(m)?;
            if !self.core.mark_visited(length, start, dimension) {
                continue;
            }
            if let Some(c) = self.core.evaluate(evaluator, series, dimension, start, length) {
                found.push(c);
            }
        }
        Ok(found)
    }

    fn search_type(&self) -> SearchType {
        SearchType::Random
    }

    fn config(&self) -> &SearchConfig {
        &self.core.config
    }

    fn visits(&self) -> &[VisitRecord] {
        self.core.visits()
    }
}

/// Uniform sampling until an analytic operation count exceeds the
/// per-series share of `time_limit`.
///
/// Each draw costs `(m - l + 1) * l * (n - 1)`, the work of assessing one
/// window against the rest of the dataset, whether or not it is a duplicate.
pub struct RandomTimedSearch {
    core: SearchCore,
    num_series: usize,
}

impl RandomTimedSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            core: SearchCore::new(config),
            num_series: 0,
        }
    }

    /// Operation budget granted to each series
    pub fn series_budget(&self) -> u64 {
        self.core.config.time_limit / self.num_series.max(1) as u64
    }
}

impl SearchStrategy for RandomTimedSearch {
    fn initialise(&mut self, dataset: &Dataset) -> Result<()> {
        self.core.initialise(dataset)?;
        self.num_series = dataset.len();
        debug!(budget = self.series_budget(), "Timed random search budget per series");
        Ok(())
    }

    fn search_series(
        &mut self,
        series: &TimeSeries,
        evaluator: &mut dyn QualityEvaluator,
    ) -> Result<Vec<Candidate>> {
        self.core.begin_series(series)?;
        let m = series.len();
        let budget = self.series_budget();

        let mut found = Vec::new();
        let mut spent: u64 = 0;
        loop {
            let (length, start, dimension) = self.core.random_window(m)?;
            spent += timed_cost(m, length, self.num_series);
            if spent > budget {
                break;
            }
            if !self.core.mark_visited(length, start, dimension) {
                continue;
            }
            if let Some(c) = self.core.evaluate(evaluator, series, dimension, start, length) {
                found.push(c);
            }
        }
        Ok(found)
    }

    fn search_type(&self) -> SearchType {
        SearchType::TimedRandom
    }

    fn config(&self) -> &SearchConfig {
        &self.core.config
    }

    fn visits(&self) -> &[VisitRecord] {
        self.core.visits()
    }
}
