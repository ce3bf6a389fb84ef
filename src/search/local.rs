//! Random-restart hill climbing

use super::state::SearchCore;
use super::{Candidate, QualityEvaluator, SearchConfig, SearchStrategy, SearchType, VisitRecord};
use crate::data::{Dataset, TimeSeries};
use crate::error::Result;
use std::cmp::Ordering;
use tracing::debug;

/// Hill climbing over `(start +- 1, length +- 1)` from `max_iterations`
/// random seeds per series.
///
/// Each restart climbs until no neighbour is strictly better and reports the
/// window it stopped on. Among equally good neighbours the longer one wins.
pub struct LocalSearch {
    core: SearchCore,
}

impl LocalSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            core: SearchCore::new(config),
        }
    }

    /// Evaluate `(length, start)` unless it is out of bounds or already seen.
    fn try_window(
        &mut self,
        series: &TimeSeries,
        evaluator: &mut dyn QualityEvaluator,
        dimension: usize,
        start: usize,
        length: usize,
    ) -> Option<Candidate> {
        if !self.core.in_bounds(series.len(), length, start, dimension) {
            return None;
        }
        if !self.core.mark_visited(length, start, dimension) {
            return None;
        }
        self.core.evaluate(evaluator, series, dimension, start, length)
    }

    fn climb(
        &mut self,
        series: &TimeSeries,
        evaluator: &mut dyn QualityEvaluator,
        seed: Candidate,
    ) -> Candidate {
        let mut current = seed;
        let mut steps = 0usize;
        loop {
            let (length, start, dimension) = (current.length, current.start, current.dimension);
            let neighbours = [
                start.checked_sub(1).map(|s| (length, s)),
                Some((length, start + 1)),
                length.checked_sub(1).map(|l| (l, start)),
                Some((length + 1, start)),
            ];

            let mut best: Option<Candidate> = None;
            for (l, s) in neighbours.into_iter().flatten() {
                let Some(candidate) = self.try_window(series, evaluator, dimension, s, l) else {
                    continue;
                };
                let replace = match &best {
                    None => true,
                    Some(b) => match candidate.cmp_quality(b) {
                        Ordering::Greater => true,
                        Ordering::Equal => candidate.length > b.length,
                        Ordering::Less => false,
                    },
                };
                if replace {
                    best = Some(candidate);
                }
            }

            match best {
                Some(b) if b.is_better_than(&current) => {
                    current = b;
                    steps += 1;
                }
                _ => break,
            }
        }
        debug!(
            series = series.index(),
            steps,
            length = current.length,
            start = current.start,
            "Hill climb finished"
        );
        current
    }
}

impl SearchStrategy for LocalSearch {
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
        for _ in 0..self.core.config.max_iterations {
            self.core.visited.reset(m);
            let (length, start, dimension) = self.core.random_window(m)?;
            let Some(seed) = self.try_window(series, evaluator, dimension, start, length) else {
                continue;
            };
            found.push(self.climb(series, evaluator, seed));
        }
        Ok(found)
    }

    fn search_type(&self) -> SearchType {
        SearchType::Local
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

    fn dataset() -> Dataset {
        Dataset::new(vec![TimeSeries::univariate(vec![0.0; 40], 0)]).unwrap()
    }

    #[test]
    fn test_climbs_to_single_peak() {
        let ds = dataset();
        let config = SearchConfig::new().with_lengths(3, 12).with_max_iterations(4).with_seed(5);
        let mut search = LocalSearch::new(config);
        search.initialise(&ds).unwrap();
        // unimodal surface peaking at (length 8, start 20)
        let mut eval = |s: &TimeSeries, d: usize, st: usize, l: usize| {
            let q = -((st as f64 - 20.0).abs() + (l as f64 - 8.0).abs());
            Some(Candidate::for_window(s, d, st, l, q))
        };
        let found = search.search_series(ds.series(0).unwrap(), &mut eval).unwrap();
        assert_eq!(found.len(), 4);
        for c in found {
            assert_eq!((c.length, c.start), (8, 20));
        }
    }

    #[test]
    fn test_result_never_worse_than_seed() {
        let ds = dataset();
        let mut eval = |s: &TimeSeries, d: usize, st: usize, l: usize| {
            let q = ((st * 7 + l * 13) % 11) as f64;
            Some(Candidate::for_window(s, d, st, l, q))
        };
        for seed in 0..20 {
            let config = SearchConfig::new()
                .with_lengths(3, 12)
                .with_max_iterations(1)
                .with_record_visits(true)
                .with_seed(seed);
            let mut search = LocalSearch::new(config);
            search.initialise(&ds).unwrap();
            let found = search.search_series(ds.series(0).unwrap(), &mut eval).unwrap();
            let seed_quality = search.visits()[0].quality.unwrap();
            assert_eq!(found.len(), 1);
            assert!(found[0].quality >= seed_quality);
        }
    }

    #[test]
    fn test_tie_prefers_longer_neighbour() {
        let ds = dataset();
        let config = SearchConfig::new()
            .with_lengths(3, 12)
            .with_max_iterations(1)
            .with_record_visits(true)
            .with_seed(1);
        let mut search = LocalSearch::new(config);
        search.initialise(&ds).unwrap();
        // every window except the seed scores the same
        let mut first = true;
        let mut eval = |s: &TimeSeries, d: usize, st: usize, l: usize| {
            let q = if first { 0.0 } else { 1.0 };
            first = false;
            Some(Candidate::for_window(s, d, st, l, q))
        };
        let found = search.search_series(ds.series(0).unwrap(), &mut eval).unwrap();
        let seed = search.visits()[0].clone();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].quality, 1.0);
        if seed.start + seed.length < 40 {
            assert_eq!((found[0].length, found[0].start), (seed.length + 1, seed.start));
        }
    }
}
