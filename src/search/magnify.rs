//! Magnify search: sample a rectangle of (length, start) space, then zoom in
//! on the best window found so far.

use super::budget::SubsamplePlan;
use super::state::SearchCore;
use super::{Candidate, QualityEvaluator, SearchConfig, SearchStrategy, SearchType, VisitRecord};
use crate::data::{Dataset, TimeSeries};
use crate::error::{Result, ShapeletError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use tracing::{debug, trace};

/// Region of `(length, start)` space centred on a window.
///
/// Radii are nominal; the sampled ranges are clipped to the configured
/// lengths and to the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rectangle {
    pub length: usize,
    pub start: usize,
    pub length_radius: usize,
    pub start_radius: usize,
}

impl Rectangle {
    /// Rectangle covering every legal window of a series of `series_length`.
    pub fn covering(min_length: usize, max_length: usize, series_length: usize) -> Self {
        let last_start = series_length.saturating_sub(min_length);
        Self {
            length: (min_length + max_length) / 2,
            start: last_start / 2,
            length_radius: (max_length - min_length + 1) / 2,
            start_radius: (last_start + 1) / 2,
        }
    }

    /// Same radii halved, centred on `(length, start)`.
    pub fn magnified(&self, length: usize, start: usize) -> Self {
        Self {
            length,
            start,
            length_radius: self.length_radius / 2,
            start_radius: self.start_radius / 2,
        }
    }

    /// Lengths inside the rectangle and within `[min_length, max_length]`
    pub fn lengths(&self, min_length: usize, max_length: usize) -> RangeInclusive<usize> {
        let lo = self.length.saturating_sub(self.length_radius).max(min_length);
        let hi = (self.length + self.length_radius).min(max_length);
        lo..=hi
    }

    /// Starts inside the rectangle at which a window of `length` fits
    pub fn starts(&self, series_length: usize, length: usize) -> RangeInclusive<usize> {
        if length > series_length {
            return 1..=0;
        }
        let lo = self.start.saturating_sub(self.start_radius);
        let hi = (self.start + self.start_radius).min(series_length - length);
        lo..=hi
    }
}

/// Multi-level shrinking-rectangle search.
///
/// Each considered series gets its full per-series budget at every level.
/// After a level the rectangle is recentred on the best window so far and
/// both radii are halved.
pub struct MagnifySearch {
    core: SearchCore,
    plan: Option<SubsamplePlan>,
    levels: Vec<Rectangle>,
}

impl MagnifySearch {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            core: SearchCore::new(config),
            plan: None,
            levels: Vec::new(),
        }
    }

    /// Rectangles sampled during the last `search_series` call, in order
    pub fn levels(&self) -> &[Rectangle] {
        &self.levels
    }

    /// Draw one window inside `rect`; `None` if the rectangle is empty.
    fn draw(&mut self, rect: &Rectangle, series_length: usize) -> Option<(usize, usize)> {
        let lengths = rect.lengths(self.core.config.min_length, self.core.config.max_length);
        if lengths.is_empty() {
            return None;
        }
        let length = self.core.rng.gen_range(lengths);
        let starts = rect.starts(series_length, length);
        if starts.is_empty() {
            return None;
        }
        Some((length, self.core.rng.gen_range(starts)))
    }
}

impl SearchStrategy for MagnifySearch {
    fn initialise(&mut self, dataset: &Dataset) -> Result<()> {
        self.core.initialise(dataset)?;
        let config = &self.core.config;
        let plan = SubsamplePlan::new(
            dataset.len(),
            dataset.min_series_length(),
            config.num_shapelets,
            config.proportion,
            &mut self.core.rng,
        );
        debug!(
            considered = plan.num_considered(),
            per_series = plan.per_series(),
            "Magnify subsample plan"
        );
        self.plan = Some(plan);
        self.levels.clear();
        Ok(())
    }

    fn search_series(
        &mut self,
        series: &TimeSeries,
        evaluator: &mut dyn QualityEvaluator,
    ) -> Result<Vec<Candidate>> {
        let position = self.core.begin_series(series)?;
        self.levels.clear();
        let plan = self.plan.as_ref().ok_or(ShapeletError::NotInitialised)?;
        if !plan.considers(position) || plan.per_series() == 0 {
            return Ok(Vec::new());
        }

        let m = series.len();
        let max_length = self.core.max_length_for(m)?;
        let depth = self.core.config.max_depth;
        let per_level = plan.per_series();

        let mut found = Vec::new();
        let mut best: Option<Candidate> = None;
        let mut rect = Rectangle::covering(self.core.config.min_length, max_length, m);

        for level in 0..depth {
            self.levels.push(rect);
            trace!(series = series.index(), level, ?rect, "Magnify level");
            if rect.lengths(self.core.config.min_length, max_length).is_empty() {
                debug!(series = series.index(), level, "Empty rectangle, level skipped");
            } else {
                for _ in 0..per_level {
                    let Some((length, start)) = self.draw(&rect, m) else {
                        continue;
                    };
                    let dimension = self.core.random_dimension();
                    if !self.core.mark_visited(length, start, dimension) {
                        continue;
                    }
                    let Some(c) = self.core.evaluate(evaluator, series, dimension, start, length) else {
                        continue;
                    };
                    if best.as_ref().map_or(true, |b| c.is_better_than(b)) {
                        best = Some(c.clone());
                    }
                    found.push(c);
                }
            }

            let (length, start) = best
                .as_ref()
                .map_or((rect.length, rect.start), |b| (b.length, b.start));
            rect = rect.magnified(length, start);
        }
        Ok(found)
    }

    fn search_type(&self) -> SearchType {
        SearchType::Magnify
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
        Dataset::new(vec![
            TimeSeries::univariate(vec![0.0; 100], 0),
            TimeSeries::univariate(vec![1.0; 100], 1),
        ])
        .unwrap()
    }

    #[test]
    fn test_rectangle_ranges_are_clipped() {
        let rect = Rectangle::covering(3, 20, 100);
        assert_eq!(rect.lengths(3, 20), 3..=20);
        assert_eq!(rect.starts(100, 20), 0..=80);

        let small = rect.magnified(4, 2);
        assert_eq!(small.length_radius, 4);
        assert_eq!(small.lengths(3, 20), 3..=8);
        assert_eq!(*small.starts(100, 5).start(), 0);
        assert!(rect.starts(10, 11).is_empty());
    }

    #[test]
    fn test_radii_strictly_decrease() {
        let ds = dataset();
        let config = SearchConfig::new()
            .with_lengths(3, 60)
            .with_num_shapelets(600)
            .with_max_depth(4)
            .with_seed(8);
        let mut search = MagnifySearch::new(config);
        search.initialise(&ds).unwrap();
        let mut eval = |s: &TimeSeries, d: usize, st: usize, l: usize| {
            Some(Candidate::for_window(s, d, st, l, -((st as f64) - 30.0).abs()))
        };
        search.search_series(ds.series(0).unwrap(), &mut eval).unwrap();

        let levels = search.levels();
        assert_eq!(levels.len(), 4);
        for pair in levels.windows(2) {
            assert!(pair[1].length_radius < pair[0].length_radius);
            assert!(pair[1].start_radius < pair[0].start_radius);
        }
    }

    #[test]
    fn test_every_level_gets_the_series_budget() {
        let ds = dataset();
        // per-series budget 300 over 3 levels
        let config = SearchConfig::new()
            .with_lengths(3, 60)
            .with_num_shapelets(600)
            .with_max_depth(3)
            .with_seed(11);
        let mut search = MagnifySearch::new(config);
        search.initialise(&ds).unwrap();
        let mut calls = 0u64;
        let mut eval = |s: &TimeSeries, d: usize, st: usize, l: usize| {
            calls += 1;
            Some(Candidate::for_window(s, d, st, l, -((st as f64) - 30.0).abs()))
        };
        search.search_series(ds.series(0).unwrap(), &mut eval).unwrap();
        assert!(calls > 300);
        assert!(calls <= 900);
    }

    #[test]
    fn test_windows_stay_inside_series() {
        let ds = dataset();
        let config = SearchConfig::new().with_lengths(5, 40).with_num_shapelets(300).with_seed(2);
        let mut search = MagnifySearch::new(config);
        search.initialise(&ds).unwrap();
        let mut eval = |s: &TimeSeries, d: usize, st: usize, l: usize| {
            Some(Candidate::for_window(s, d, st, l, l as f64))
        };
        for series in &ds {
            let found = search.search_series(series, &mut eval).unwrap();
            assert!(!found.is_empty());
            for c in found {
                assert!((5..=40).contains(&c.length));
                assert!(c.start + c.length <= 100);
            }
        }
    }
}
