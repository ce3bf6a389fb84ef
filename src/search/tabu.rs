//! Tabu search over square (length, start) neighbourhoods

use super::budget::SubsamplePlan;
use super::state::SearchCore;
use super::{Candidate, QualityEvaluator, SearchConfig, SearchStrategy, SearchType, VisitRecord};
use crate::data::{Dataset, TimeSeries};
use crate::error::{Result, ShapeletError};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Consecutive rounds without an evaluation before a series is given up
const MAX_STALLED_ROUNDS: usize = 100;

/// Bounded FIFO of recently exploited `(length, start)` pairs.
#[derive(Debug, Clone)]
pub struct TabuList {
    entries: VecDeque<(usize, usize)>,
    capacity: usize,
}

impl TabuList {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append, evicting the oldest entry once over capacity.
    pub fn push(&mut self, length: usize, start: usize) {
        self.entries.push_back((length, start));
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn contains(&self, length: usize, start: usize) -> bool {
        self.entries.contains(&(length, start))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Oldest entry still held
    pub fn oldest(&self) -> Option<(usize, usize)> {
        self.entries.front().copied()
    }
}

/// Every `(length, start)` within `width / 2` of the seed on both axes,
/// seed included, before any bounds are applied.
pub fn neighbourhood(length: usize, start: usize, width: usize) -> Vec<(usize, usize)> {
    let half = (width / 2) as isize;
    let mut out = Vec::with_capacity(width * width);
    for dp in -half..=half {
        for dl in -half..=half {
            let (Some(l), Some(s)) = (length.checked_add_signed(dl), start.checked_add_signed(dp)) else {
                continue;
            };
            out.push((l, s));
        }
    }
    out
}

/// Result of exploring one neighbourhood
#[derive(Debug, Default)]
struct Round {
    evaluated: u64,
    best: Option<Candidate>,
}

/// Tabu search seeded with the best window of the previous series.
///
/// Series are subsampled with the same plan as the magnify search. A
/// neighbourhood touching any tabu pair is abandoned unevaluated; otherwise
/// its unvisited members are evaluated, and the best one becomes tabu.
/// Returns each improvement of the series best.
pub struct TabuSearch {
    core: SearchCore,
    plan: Option<SubsamplePlan>,
    tabu: TabuList,
    carried: Option<(usize, usize, usize)>,
}

impl TabuSearch {
    pub fn new(config: SearchConfig) -> Self {
        let tabu = TabuList::new(config.max_tabu_size);
        Self {
            core: SearchCore::new(config),
            plan: None,
            tabu,
            carried: None,
        }
    }

    /// Tabu list as left by the last `search_series` call
    pub fn tabu_list(&self) -> &TabuList {
        &self.tabu
    }

    /// Evaluate the unvisited members of one neighbourhood.
    ///
    /// Nothing is evaluated when any in-bounds member is tabu.
    fn explore(
        &mut self,
        series: &TimeSeries,
        evaluator: &mut dyn QualityEvaluator,
        length: usize,
        start: usize,
        dimension: usize,
    ) -> Round {
        let members = self.pruned_neighbourhood(series.len(), length, start, dimension);
        if members.iter().any(|&(l, s)| self.tabu.contains(l, s)) {
            return Round::default();
        }

        let mut round = Round::default();
        for (l, s) in members {
            if !self.core.mark_visited(l, s, dimension) {
                continue;
            }
            round.evaluated += 1;
            let Some(c) = self.core.evaluate(evaluator, series, dimension, s, l) else {
                continue;
            };
            if round.best.as_ref().map_or(true, |b| c.is_better_than(b)) {
                round.best = Some(c);
            }
        }
        round
    }

    /// In-bounds members of the neighbourhood of `(length, start)`.
    fn pruned_neighbourhood(&self, series_length: usize, length: usize, start: usize, dimension: usize) -> Vec<(usize, usize)> {
        neighbourhood(length, start, self.core.config.neighbourhood_width)
            .into_iter()
            .filter(|&(l, s)| self.core.in_bounds(series_length, l, s, dimension))
            .collect()
    }
}

impl SearchStrategy for TabuSearch {
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
            "Tabu subsample plan"
        );
        self.plan = Some(plan);
        self.tabu = TabuList::new(self.core.config.max_tabu_size);
        self.carried = None;
        Ok(())
    }

    fn search_series(
        &mut self,
        series: &TimeSeries,
        evaluator: &mut dyn QualityEvaluator,
    ) -> Result<Vec<Candidate>> {
        let position = self.core.begin_series(series)?;
        let plan = self.plan.as_ref().ok_or(ShapeletError::NotInitialised)?;
        if !plan.considers(position) {
            return Ok(Vec::new());
        }
        let budget = plan.per_series();
        let m = series.len();
        self.tabu.clear();

        let mut improvements = Vec::new();
        let mut best: Option<Candidate> = None;
        let mut evaluated: u64 = 0;
        let mut stalled = 0usize;

        while evaluated < budget {
            let (length, start, dimension) = match self.carried.take() {
                Some(seed) if evaluated == 0 => seed,
                _ => self.core.random_window(m)?,
            };

            let outcome = self.explore(series, evaluator, length, start, dimension);
            evaluated += outcome.evaluated;
            if outcome.evaluated > 0 {
                stalled = 0;
            } else {
                stalled += 1;
                if stalled >= MAX_STALLED_ROUNDS {
                    warn!(series = series.index(), evaluated, "Tabu search stalled");
                    break;
                }
            }

            let Some(local) = outcome.best else {
                continue;
            };
            if best.as_ref().map_or(true, |b| local.is_better_than(b)) {
                best = Some(local.clone());
                improvements.push(local.clone());
            }
            self.tabu.push(local.length, local.start);
        }

        self.carried = best.map(|b| (b.length, b.start, b.dimension));
        Ok(improvements)
    }

    fn search_type(&self) -> SearchType {
        SearchType::Tabu
    }

    fn config(&self) -> &SearchConfig {
        &self.core.config
    }

    fn visits(&self) -> &[VisitRecord] {
        self.core.visits()
    }
}
