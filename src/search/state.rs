//! State shared by every strategy: configuration, RNG, visit tracking

use super::{Candidate, QualityEvaluator, SearchConfig, VisitRecord, VisitedTracker};
use crate::data::{Dataset, TimeSeries};
use crate::error::{Result, ShapeletError};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::trace;

/// Dataset facts captured at `initialise`
#[derive(Debug, Clone, Copy)]
pub(crate) struct DatasetSummary {
    pub num_series: usize,
    pub num_classes: usize,
    pub min_series_length: usize,
}

impl DatasetSummary {
    fn of(dataset: &Dataset) -> Self {
        Self {
            num_series: dataset.len(),
            num_classes: dataset.num_classes(),
            min_series_length: dataset.min_series_length(),
        }
    }
}

/// Configuration, seeded RNG, visited grid and visit log owned by a strategy.
pub(crate) struct SearchCore {
    pub config: SearchConfig,
    pub rng: Xoshiro256PlusPlus,
    pub visited: VisitedTracker,
    summary: Option<DatasetSummary>,
    visits: Vec<VisitRecord>,
    calls: usize,
}

impl SearchCore {
    pub fn new(config: SearchConfig) -> Self {
        let rng = Xoshiro256PlusPlus::seed_from_u64(config.seed);
        let visited = VisitedTracker::new(0, config.num_dimensions);
        Self {
            config,
            rng,
            visited,
            summary: None,
            visits: Vec::new(),
            calls: 0,
        }
    }

    /// Validate against `dataset`, reseed and forget earlier calls.
    pub fn initialise(&mut self, dataset: &Dataset) -> Result<()> {
        self.config.validate_for(dataset)?;
        self.rng = Xoshiro256PlusPlus::seed_from_u64(self.config.seed);
        self.summary = Some(DatasetSummary::of(dataset));
        self.visits.clear();
        self.calls = 0;
        Ok(())
    }

    pub fn summary(&self) -> Result<DatasetSummary> {
        self.summary.ok_or(ShapeletError::NotInitialised)
    }

    /// Start a `search_series` call: clears the visited grid and returns the
    /// call position (0 for the first series searched).
    pub fn begin_series(&mut self, series: &TimeSeries) -> Result<usize> {
        self.summary()?;
        if series.num_dimensions() < self.config.num_dimensions {
            return Err(ShapeletError::DataError(format!(
                "series {} has {} dimensions, {} searched",
                series.index(),
                series.num_dimensions(),
                self.config.num_dimensions
            )));
        }
        self.visited.reset(series.len());
        let position = self.calls;
        self.calls += 1;
        Ok(position)
    }

    /// Whether a window respects the configured bounds on a series of `series_length`.
    pub fn in_bounds(&self, series_length: usize, length: usize, start: usize, dimension: usize) -> bool {
        length >= self.config.min_length
            && length <= self.config.max_length
            && start + length <= series_length
            && dimension < self.config.num_dimensions
    }

    /// Longest usable length on a series of `series_length`.
    pub fn max_length_for(&self, series_length: usize) -> Result<usize> {
        if series_length < self.config.min_length {
            return Err(ShapeletError::EmptySamplingRange {
                series_length,
                length: self.config.min_length,
            });
        }
        Ok(self.config.max_length.min(series_length))
    }

    /// Mark a window visited; `true` when it had not been seen this call.
    pub fn mark_visited(&mut self, length: usize, start: usize, dimension: usize) -> bool {
        self.visited.insert(length, start, dimension)
    }

    /// Submit a window to the evaluator.
    ///
    /// Out-of-bounds windows are dropped before reaching the evaluator.
    pub fn evaluate(
        &mut self,
        evaluator: &mut dyn QualityEvaluator,
        series: &TimeSeries,
        dimension: usize,
        start: usize,
        length: usize,
    ) -> Option<Candidate> {
        if !self.in_bounds(series.len(), length, start, dimension) {
            trace!(series = series.index(), length, start, dimension, "Window out of bounds, skipped");
            return None;
        }

        let candidate = evaluator.evaluate(series, dimension, start, length);
        let quality = candidate.as_ref().map(|c| c.quality);
        trace!(series = series.index(), length, start, dimension, ?quality, "Visited window");

        if self.config.record_visits {
            self.visits.push(VisitRecord {
                series_index: series.index(),
                length,
                start,
                dimension,
                quality,
            });
        }
        candidate
    }

    /// Visit log
    pub fn visits(&self) -> &[VisitRecord] {
        &self.visits
    }

    /// Uniform length in `[min_length, max_length)`, or `min_length` when
    /// the bounds coincide.
    pub fn random_length(&mut self, series_length: usize) -> Result<usize> {
        let max = self.max_length_for(series_length)?;
        let min = self.config.min_length;
        if max <= min {
            return Ok(min);
        }
        Ok(self.rng.gen_range(min..max))
    }

    /// Uniform start such that the window fits in the series.
    pub fn random_start(&mut self, series_length: usize, length: usize) -> Result<usize> {
        if length == 0 || length > series_length {
            return Err(ShapeletError::EmptySamplingRange { series_length, length });
        }
        Ok(self.rng.gen_range(0..=series_length - length))
    }

    /// Uniform dimension; consumes no randomness for univariate searches.
    pub fn random_dimension(&mut self) -> usize {
        if self.config.num_dimensions <= 1 {
            0
        } else {
            self.rng.gen_range(0..self.config.num_dimensions)
        }
    }

    /// Uniform `(length, start, dimension)` on a series of `series_length`.
    pub fn random_window(&mut self, series_length: usize) -> Result<(usize, usize, usize)> {
        let length = self.random_length(series_length)?;
        let start = self.random_start(series_length, length)?;
        let dimension = self.random_dimension();
        Ok((length, start, dimension))
    }
}
