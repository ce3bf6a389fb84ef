//! Exhaustive enumeration

use super::state::SearchCore;
use super::{Candidate, QualityEvaluator, SearchConfig, SearchStrategy, SearchType, VisitRecord};
use crate::data::{Dataset, TimeSeries};
use crate::error::Result;

/// Evaluates every legal window: length outer, start inner, dimension
/// innermost, stepping by the configured increments.
pub struct FullSearch {
    core: SearchCore,
}

impl FullSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            core: SearchCore::new(config),
        }
    }
}

/// Enumerate `[first_length, max] x [first_start, m - length]` in ascending order.
pub(crate) fn enumerate_from(
    core: &mut SearchCore,
    series: &TimeSeries,
    evaluator: &mut dyn QualityEvaluator,
    first_length: usize,
    first_start: usize,
) -> Result<Vec<Candidate>> {
    let m = series.len();
    let max_length = core.max_length_for(m)?;
    let length_step = core.config.length_increment;
    let position_step = core.config.position_increment;
    let num_dimensions = core.config.num_dimensions;

    let mut found = Vec::new();
    for length in (first_length..=max_length).step_by(length_step) {
        for start in (first_start..=m - length).step_by(position_step) {
            for dimension in 0..num_dimensions {
                if let Some(c) = core.evaluate(evaluator, series, dimension, start, length) {
                    found.push(c);
                }
            }
        }
    }
    Ok(found)
}

impl SearchStrategy for FullSearch {
    fn initialise(&mut self, dataset: &Dataset) -> Result<()> {
        self.core.initialise(dataset)
    }

    fn search_series(
        &mut self,
        series: &TimeSeries,
        evaluator: &mut dyn QualityEvaluator,
    ) -> Result<Vec<Candidate>> {
        self.core.begin_series(series)?;
        let min_length = self.core.config.min_length;
        enumerate_from(&mut self.core, series, evaluator, min_length, 0)
    }

    fn search_type(&self) -> SearchType {
        SearchType::Full
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

    #[test]
    fn test_full_enumeration_count() {
        let ds = Dataset::new(vec![TimeSeries::univariate(vec![0.0; 10], 0)]).unwrap();
        let mut search = FullSearch::new(SearchConfig::new().with_lengths(3, 5));
        search.initialise(&ds).unwrap();
        let mut eval = |s: &TimeSeries, d: usize, st: usize, l: usize| {
            Some(Candidate::for_window(s, d, st, l, 0.0))
        };
        let found = search.search_series(ds.series(0).unwrap(), &mut eval).unwrap();
        // 8 + 7 + 6 windows
        assert_eq!(found.len(), 21);
        assert_eq!((found[0].length, found[0].start), (3, 0));
        assert_eq!((found[20].length, found[20].start), (5, 5));
    }

    #[test]
    fn test_full_enumeration_with_increments_and_dimensions() {
        let series = TimeSeries::new(vec![vec![0.0; 10], vec![1.0; 10]], 0).unwrap();
        let ds = Dataset::new(vec![series]).unwrap();
        let config = SearchConfig::new()
            .with_lengths(4, 8)
            .with_increments(2, 3)
            .with_num_dimensions(2);
        let mut search = FullSearch::new(config);
        search.initialise(&ds).unwrap();
        let mut eval = |s: &TimeSeries, d: usize, st: usize, l: usize| {
            Some(Candidate::for_window(s, d, st, l, 0.0))
        };
        let found = search.search_series(ds.series(0).unwrap(), &mut eval).unwrap();
        // length 4: starts 0,3,6; length 6: 0,3; length 8: 0 -> 6 windows x 2 dims
        assert_eq!(found.len(), 12);
        assert_eq!(found[1].dimension, 1);
    }
}
