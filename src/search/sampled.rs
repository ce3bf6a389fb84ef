//! Strategies that spend a fixed, dataset-wide budget assigned at initialise.
//!
//! All three draw `num_shapelets` windows once, each owned by one series, and
//! hand every series its own share when it is searched. They differ in which
//! series may own windows and in how lengths are drawn.

use super::budget::theoretical_shapelet_count;
use super::state::SearchCore;
use super::{Candidate, QualityEvaluator, SearchConfig, SearchStrategy, SearchType, VisitRecord};
use crate::data::{Dataset, TimeSeries};
use crate::error::{Result, ShapeletError};
use rand::seq::index;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Floor on the number of series the refined search keeps
const REFINED_MIN_SERIES: usize = 25;

/// Fraction removed from the series count per refinement step
const REFINED_SHRINK: f64 = 0.1;

type Window = (usize, usize, usize);

/// Windows pre-assigned to their owning series, keyed by series index.
#[derive(Debug, Clone, Default)]
struct Assignments {
    by_series: BTreeMap<usize, BTreeSet<Window>>,
}

impl Assignments {
    fn clear(&mut self) {
        self.by_series.clear();
    }

    fn assign(&mut self, owner: usize, window: Window) {
        self.by_series.entry(owner).or_default().insert(window);
    }

    fn total(&self) -> usize {
        self.by_series.values().map(BTreeSet::len).sum()
    }

    /// Evaluate the windows owned by `series`, in `(length, start, dimension)` order.
    fn search(
        &self,
        core: &mut SearchCore,
        series: &TimeSeries,
        evaluator: &mut dyn QualityEvaluator,
    ) -> Result<Vec<Candidate>> {
        core.begin_series(series)?;
        let Some(windows) = self.by_series.get(&series.index()) else {
            return Ok(Vec::new());
        };

        let mut found = Vec::new();
        for &(length, start, dimension) in windows {
            if !core.mark_visited(length, start, dimension) {
                continue;
            }
            if let Some(c) = core.evaluate(evaluator, series, dimension, start, length) {
                found.push(c);
            }
        }
        Ok(found)
    }
}

fn series_length(dataset: &Dataset, owner: usize) -> Result<usize> {
    dataset
        .series(owner)
        .map(TimeSeries::len)
        .ok_or_else(|| ShapeletError::DataError(format!("no series at index {owner}")))
}

/// Assign `num_shapelets` uniform windows to owners drawn from `owners`.
fn assign_uniform(
    core: &mut SearchCore,
    dataset: &Dataset,
    owners: &[usize],
    assignments: &mut Assignments,
) -> Result<()> {
    if owners.is_empty() {
        return Ok(());
    }
    for _ in 0..core.config.num_shapelets {
        let owner = owners[core.rng.gen_range(0..owners.len())];
        let m = series_length(dataset, owner)?;
        let window = core.random_window(m)?;
        assignments.assign(owner, window);
    }
    Ok(())
}

/// Importance sampling: `num_shapelets` windows spread uniformly over every
/// series, so the total work does not grow with the dataset.
pub struct ImportanceSampledSearch {
    core: SearchCore,
    assignments: Assignments,
}

impl ImportanceSampledSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            core: SearchCore::new(config),
            assignments: Assignments::default(),
        }
    }

    /// Distinct windows assigned across the dataset
    pub fn num_assigned(&self) -> usize {
        self.assignments.total()
    }
}

impl SearchStrategy for ImportanceSampledSearch {
    fn initialise(&mut self, dataset: &Dataset) -> Result<()> {
        self.core.initialise(dataset)?;
        self.assignments.clear();
        let owners: Vec<usize> = (0..dataset.len()).collect();
        assign_uniform(&mut self.core, dataset, &owners, &mut self.assignments)?;
        info!(assigned = self.assignments.total(), "Pre-assigned sampled windows");
        Ok(())
    }

    fn search_series(
        &mut self,
        series: &TimeSeries,
        evaluator: &mut dyn QualityEvaluator,
    ) -> Result<Vec<Candidate>> {
        self.assignments.search(&mut self.core, series, evaluator)
    }

    fn search_type(&self) -> SearchType {
        SearchType::ImportanceSampled
    }

    fn config(&self) -> &SearchConfig {
        &self.core.config
    }

    fn visits(&self) -> &[VisitRecord] {
        self.core.visits()
    }
}

/// Importance sampling restricted to a random subset of series.
///
/// The subset shrinks by 10% at a time until the requested budget is at least
/// `refined_target_ratio` of the windows the subset contains, but never below
/// 25 series.
pub struct RefinedRandomSearch {
    core: SearchCore,
    assignments: Assignments,
    num_owners: usize,
}

impl RefinedRandomSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            core: SearchCore::new(config),
            assignments: Assignments::default(),
            num_owners: 0,
        }
    }

    /// Number of series allowed to own windows.
    pub fn refined_series_count(config: &SearchConfig, num_series: usize, series_length: usize) -> usize {
        let floor = REFINED_MIN_SERIES.min(num_series);
        let mut count = num_series;
        loop {
            let total = theoretical_shapelet_count(count, series_length, config.min_length, config.max_length);
            let ratio = if total == 0 {
                1.0
            } else {
                config.num_shapelets as f64 / total as f64
            };
            if ratio >= config.refined_target_ratio || count <= floor {
                return count.max(floor);
            }
            let next = (count as f64 * (1.0 - REFINED_SHRINK)) as usize;
            count = if next < count { next } else { count - 1 };
        }
    }

    /// Series allowed to own windows after the last `initialise`
    pub fn num_owners(&self) -> usize {
        self.num_owners
    }

    /// Distinct windows assigned across the dataset
    pub fn num_assigned(&self) -> usize {
        self.assignments.total()
    }
}

impl SearchStrategy for RefinedRandomSearch {
    fn initialise(&mut self, dataset: &Dataset) -> Result<()> {
        self.core.initialise(dataset)?;
        self.assignments.clear();

        let n = dataset.len();
        self.num_owners = Self::refined_series_count(&self.core.config, n, dataset.min_series_length());
        let mut owners = index::sample(&mut self.core.rng, n, self.num_owners).into_vec();
        owners.sort_unstable();
        debug!(num_series = n, owners = self.num_owners, "Refined series subset");

        assign_uniform(&mut self.core, dataset, &owners, &mut self.assignments)?;
        info!(assigned = self.assignments.total(), "Pre-assigned refined windows");
        Ok(())
    }

    fn search_series(
        &mut self,
        series: &TimeSeries,
        evaluator: &mut dyn QualityEvaluator,
    ) -> Result<Vec<Candidate>> {
        self.assignments.search(&mut self.core, series, evaluator)
    }

    fn search_type(&self) -> SearchType {
        SearchType::RefinedRandom
    }

    fn config(&self) -> &SearchConfig {
        &self.core.config
    }

    fn visits(&self) -> &[VisitRecord] {
        self.core.visits()
    }
}

/// Running totals of a histogram.
pub fn cumulative_counts(histogram: &[u64]) -> Vec<u64> {
    histogram
        .iter()
        .scan(0u64, |acc, &c| {
            *acc += c;
            Some(*acc)
        })
        .collect()
}

/// First bucket whose cumulative count exceeds `draw`.
///
/// `draw` must be below the last cumulative value; larger draws select the
/// last bucket.
pub fn sample_bucket(cumulative: &[u64], draw: u64) -> usize {
    cumulative
        .iter()
        .position(|&c| c > draw)
        .unwrap_or_else(|| cumulative.len().saturating_sub(1))
}

/// Importance sampling with lengths drawn from `length_distribution`.
///
/// Bucket `i` of the histogram stands for length
/// `min_length + i * length_increment`.
pub struct SkewedRandomSearch {
    core: SearchCore,
    assignments: Assignments,
    cumulative: Vec<u64>,
}

impl SkewedRandomSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            core: SearchCore::new(config),
            assignments: Assignments::default(),
            cumulative: Vec::new(),
        }
    }

    fn bucket_length(&self, bucket: usize) -> usize {
        self.core.config.min_length + bucket * self.core.config.length_increment
    }

    fn draw_length(&mut self) -> usize {
        let total = self.cumulative.last().copied().unwrap_or(0);
        let draw = self.core.rng.gen_range(0..total);
        self.bucket_length(sample_bucket(&self.cumulative, draw))
    }

    /// Distinct windows assigned across the dataset
    pub fn num_assigned(&self) -> usize {
        self.assignments.total()
    }
}

impl SearchStrategy for SkewedRandomSearch {
    fn initialise(&mut self, dataset: &Dataset) -> Result<()> {
        self.core.initialise(dataset)?;
        self.assignments.clear();

        let histogram = self.core.config.length_distribution.clone().unwrap_or_default();
        if !histogram.iter().any(|&c| c > 0) {
            return Err(ShapeletError::ConfigError(
                "skewed search requires a length_distribution with a non-zero bucket".to_string(),
            ));
        }
        if let Some(last) = histogram.iter().rposition(|&c| c > 0) {
            let longest = self.bucket_length(last);
            if longest > self.core.config.max_length {
                return Err(ShapeletError::invalid_parameter(
                    "length_distribution",
                    format!("{histogram:?}"),
                    format!("bucket {last} maps to length {longest} above max_length"),
                ));
            }
        }
        self.cumulative = cumulative_counts(&histogram);

        let n = dataset.len();
        for _ in 0..self.core.config.num_shapelets {
            let owner = self.core.rng.gen_range(0..n);
            let m = series_length(dataset, owner)?;
            let length = self.draw_length();
            let start = self.core.random_start(m, length)?;
            let dimension = self.core.random_dimension();
            self.assignments.assign(owner, (length, start, dimension));
        }
        info!(assigned = self.assignments.total(), "Pre-assigned skewed windows");
        Ok(())
    }

    fn search_series(
        &mut self,
        series: &TimeSeries,
        evaluator: &mut dyn QualityEvaluator,
    ) -> Result<Vec<Candidate>> {
        self.assignments.search(&mut self.core, series, evaluator)
    }

    fn search_type(&self) -> SearchType {
        SearchType::Skewed
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

    fn dataset(n: usize, m: usize) -> Dataset {
        let series = (0..n)
            .map(|i| TimeSeries::univariate((0..m).map(|j| ((i + j) as f64).cos()).collect(), i % 2))
            .collect();
        Dataset::new(series).unwrap()
    }

    fn accept(s: &TimeSeries, d: usize, st: usize, l: usize) -> Option<Candidate> {
        Some(Candidate::for_window(s, d, st, l, 1.0))
    }

    #[test]
    fn test_cumulative_counts_and_bucket() {
        let cumulative = cumulative_counts(&[4, 4, 0, 1]);
        assert_eq!(cumulative, vec![4, 8, 8, 9]);
        assert_eq!(sample_bucket(&cumulative, 7), 1);
        assert_eq!(sample_bucket(&cumulative, 0), 0);
        assert_eq!(sample_bucket(&cumulative, 3), 0);
        assert_eq!(sample_bucket(&cumulative, 4), 1);
        // the empty bucket is never selected
        assert_eq!(sample_bucket(&cumulative, 8), 3);
    }

    #[test]
    fn test_importance_sampled_total_is_bounded() {
        let ds = dataset(6, 30);
        let config = SearchConfig::new().with_lengths(3, 12).with_num_shapelets(40).with_seed(3);
        let mut search = ImportanceSampledSearch::new(config);
        search.initialise(&ds).unwrap();
        assert!(search.num_assigned() <= 40);

        let mut total = 0;
        for series in &ds {
            total += search.search_series(series, &mut accept).unwrap().len();
        }
        assert_eq!(total, search.num_assigned());
    }

    #[test]
    fn test_candidates_belong_to_their_series() {
        let ds = dataset(4, 25);
        let mut search = ImportanceSampledSearch::new(SearchConfig::new().with_num_shapelets(30));
        search.initialise(&ds).unwrap();
        for series in &ds {
            for c in search.search_series(series, &mut accept).unwrap() {
                assert_eq!(c.series_index, series.index());
            }
        }
    }

    #[test]
    fn test_refined_series_count() {
        let config = SearchConfig::new().with_lengths(3, 10).with_num_shapelets(500);
        // small datasets keep every series
        assert_eq!(RefinedRandomSearch::refined_series_count(&config, 10, 50), 10);
        // 500 / (100 * 356) is far below 0.1: shrink to the floor
        assert_eq!(RefinedRandomSearch::refined_series_count(&config, 100, 50), 25);

        let generous = config.clone().with_num_shapelets(1_000_000);
        assert_eq!(RefinedRandomSearch::refined_series_count(&generous, 100, 50), 100);
    }

    #[test]
    fn test_refined_owners_are_a_subset() {
        let ds = dataset(40, 20);
        let config = SearchConfig::new().with_lengths(3, 8).with_num_shapelets(50).with_seed(11);
        let mut search = RefinedRandomSearch::new(config);
        search.initialise(&ds).unwrap();
        assert_eq!(search.num_owners(), 25);

        let searched = ds
            .iter()
            .filter(|s| !search.search_series(s, &mut accept).unwrap().is_empty())
            .count();
        assert!(searched <= 25);
    }

    #[test]
    fn test_skewed_lengths_follow_histogram() {
        let ds = dataset(3, 30);
        let config = SearchConfig::new()
            .with_lengths(4, 10)
            .with_increments(2, 1)
            .with_search_type(SearchType::Skewed)
            .with_length_distribution(vec![4, 0, 0, 1])
            .with_num_shapelets(60);
        let mut search = SkewedRandomSearch::new(config);
        search.initialise(&ds).unwrap();
        for series in &ds {
            for c in search.search_series(series, &mut accept).unwrap() {
                assert!(c.length == 4 || c.length == 10, "length {}", c.length);
            }
        }
    }

    #[test]
    fn test_skewed_rejects_unusable_histogram() {
        let ds = dataset(3, 30);
        let empty = SearchConfig::new().with_length_distribution(vec![0, 0]);
        assert!(SkewedRandomSearch::new(empty).initialise(&ds).is_err());

        let too_long = SearchConfig::new().with_lengths(3, 5).with_length_distribution(vec![1, 1, 1, 1]);
        assert!(SkewedRandomSearch::new(too_long).initialise(&ds).is_err());
    }
}
