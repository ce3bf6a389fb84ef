//! Search configuration

use crate::data::Dataset;
use crate::error::{Result, ShapeletError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Which exploration strategy to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchType {
    /// Evaluate every legal window
    Full,
    /// SAX discretisation + random projection (univariate)
    FastShapelets,
    /// Evolutionary search over (length, start)
    Genetic,
    /// Uniform sampling with a per-series draw budget
    Random,
    /// Random-restart hill climbing
    Local,
    /// Shrinking rectangle around the best window
    Magnify,
    /// Uniform sampling under an operation-count budget
    TimedRandom,
    /// Deterministic per-class offset enumeration
    Skipping,
    /// Tabu search over 3x3 neighbourhoods
    Tabu,
    /// Importance sampling over an adaptively reduced set of series
    RefinedRandom,
    /// Windows pre-assigned to series once per dataset
    ImportanceSampled,
    /// Importance sampling with lengths drawn from a histogram
    Skewed,
    /// Gaussian-process guided search
    Bayesian,
}

impl SearchType {
    /// Every selector, in declaration order
    pub const ALL: [SearchType; 13] = [
        SearchType::Full,
        SearchType::FastShapelets,
        SearchType::Genetic,
        SearchType::Random,
        SearchType::Local,
        SearchType::Magnify,
        SearchType::TimedRandom,
        SearchType::Skipping,
        SearchType::Tabu,
        SearchType::RefinedRandom,
        SearchType::ImportanceSampled,
        SearchType::Skewed,
        SearchType::Bayesian,
    ];

    /// Selector name as accepted by [`FromStr`]
    pub fn name(&self) -> &'static str {
        match self {
            SearchType::Full => "full",
            SearchType::FastShapelets => "fast-shapelets",
            SearchType::Genetic => "genetic",
            SearchType::Random => "random",
            SearchType::Local => "local",
            SearchType::Magnify => "magnify",
            SearchType::TimedRandom => "timed-random",
            SearchType::Skipping => "skipping",
            SearchType::Tabu => "tabu",
            SearchType::RefinedRandom => "refined-random",
            SearchType::ImportanceSampled => "importance-sampled",
            SearchType::Skewed => "skewed",
            SearchType::Bayesian => "bayesian",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SearchType {
    type Err = ShapeletError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "fs" | "fast" | "sax" => return Ok(SearchType::FastShapelets),
            "bo" | "bo-search" => return Ok(SearchType::Bayesian),
            "improved-random" => return Ok(SearchType::ImportanceSampled),
            _ => {}
        }
        SearchType::ALL
            .iter()
            .copied()
            .find(|t| t.name() == normalized)
            .ok_or_else(|| {
                ShapeletError::invalid_parameter("search_type", s, "unknown search type")
            })
    }
}

/// Parameters shared by every strategy.
///
/// Built with [`SearchConfig::new`] and the `with_*` methods, or loaded from
/// JSON. Validated against the dataset when a strategy is initialised.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Shortest window length considered
    pub min_length: usize,

    /// Longest window length considered
    pub max_length: usize,

    /// Step between enumerated lengths
    pub length_increment: usize,

    /// Step between enumerated start positions
    pub position_increment: usize,

    /// Evaluation budget (per series for random/local, dataset-wide otherwise)
    pub num_shapelets: u64,

    /// Random seed
    pub seed: u64,

    /// Strategy selector
    pub search_type: SearchType,

    /// Operation-count budget for the timed random search
    pub time_limit: u64,

    /// Fraction of series considered by subsampling strategies
    pub proportion: f64,

    /// Restarts for the local search
    pub max_iterations: usize,

    /// Dimensions searched per series
    pub num_dimensions: usize,

    /// Histogram over lengths for the skewed search
    pub length_distribution: Option<Vec<u64>>,

    /// Keep an in-memory log of every evaluator submission
    pub record_visits: bool,

    /// Capacity of the tabu list
    pub max_tabu_size: usize,

    /// Side of the square tabu neighbourhood
    pub neighbourhood_width: usize,

    /// Levels of the magnify search
    pub max_depth: usize,

    /// Individuals in the first genetic generation
    pub initial_population_size: usize,

    /// Random evaluations before the surrogate is first fitted
    pub pre_samples: usize,

    /// Surrogate-guided evaluations per series
    pub num_iterations: usize,

    /// Requested/theoretical ratio the refined random search aims for
    pub refined_target_ratio: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_length: 3,
            max_length: 10,
            length_increment: 1,
            position_increment: 1,
            num_shapelets: 100,
            seed: 0,
            search_type: SearchType::Full,
            time_limit: 0,
            proportion: 1.0,
            max_iterations: 10,
            num_dimensions: 1,
            length_distribution: None,
            record_visits: false,
            max_tabu_size: 50,
            neighbourhood_width: 3,
            max_depth: 3,
            initial_population_size: 50,
            pre_samples: 100,
            num_iterations: 100,
            refined_target_ratio: 0.1,
        }
    }
}

impl SearchConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file; missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Builder method to set the length bounds (inclusive)
    pub fn with_lengths(mut self, min: usize, max: usize) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    /// Builder method to set the enumeration increments
    pub fn with_increments(mut self, length: usize, position: usize) -> Self {
        self.length_increment = length;
        self.position_increment = position;
        self
    }

    /// Builder method to set the evaluation budget
    pub fn with_num_shapelets(mut self, n: u64) -> Self {
        self.num_shapelets = n;
        self
    }

    /// Builder method to set the seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder method to set the strategy
    pub fn with_search_type(mut self, search_type: SearchType) -> Self {
        self.search_type = search_type;
        self
    }

    /// Builder method to set the operation-count budget
    pub fn with_time_limit(mut self, ops: u64) -> Self {
        self.time_limit = ops;
        self
    }

    /// Builder method to set the subsample proportion
    pub fn with_proportion(mut self, proportion: f64) -> Self {
        self.proportion = proportion;
        self
    }

    /// Builder method to set the number of local-search restarts
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    /// Builder method to set the number of dimensions searched
    pub fn with_num_dimensions(mut self, n: usize) -> Self {
        self.num_dimensions = n;
        self
    }

    /// Builder method to set the length histogram
    pub fn with_length_distribution(mut self, histogram: Vec<u64>) -> Self {
        self.length_distribution = Some(histogram);
        self
    }

    /// Builder method to enable the visit log
    pub fn with_record_visits(mut self, record: bool) -> Self {
        self.record_visits = record;
        self
    }

    /// Builder method to set the tabu list capacity
    pub fn with_max_tabu_size(mut self, n: usize) -> Self {
        self.max_tabu_size = n;
        self
    }

    /// Builder method to set the magnify depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Builder method to set the initial genetic population
    pub fn with_initial_population_size(mut self, n: usize) -> Self {
        self.initial_population_size = n;
        self
    }

    /// Builder method to set the Bayesian sampling budget
    pub fn with_bayesian_budget(mut self, pre_samples: usize, num_iterations: usize) -> Self {
        self.pre_samples = pre_samples;
        self.num_iterations = num_iterations;
        self
    }

    /// Check parameters that do not depend on the data.
    pub fn validate(&self) -> Result<()> {
        if self.min_length == 0 {
            return Err(ShapeletError::invalid_parameter(
                "min_length",
                self.min_length,
                "must be at least 1",
            ));
        }
        if self.min_length > self.max_length {
            return Err(ShapeletError::ConfigError(format!(
                "min_length {} exceeds max_length {}",
                self.min_length, self.max_length
            )));
        }
        if self.length_increment == 0 {
            return Err(ShapeletError::invalid_parameter(
                "length_increment",
                0,
                "must be at least 1",
            ));
        }
        if self.position_increment == 0 {
            return Err(ShapeletError::invalid_parameter(
                "position_increment",
                0,
                "must be at least 1",
            ));
        }
        if self.num_dimensions == 0 {
            return Err(ShapeletError::invalid_parameter(
                "num_dimensions",
                0,
                "must be at least 1",
            ));
        }
        if !(self.proportion > 0.0 && self.proportion <= 1.0) {
            return Err(ShapeletError::invalid_parameter(
                "proportion",
                self.proportion,
                "must be in (0, 1]",
            ));
        }
        if self.max_tabu_size == 0 {
            return Err(ShapeletError::invalid_parameter(
                "max_tabu_size",
                0,
                "must be at least 1",
            ));
        }
        if self.max_depth == 0 {
            return Err(ShapeletError::invalid_parameter("max_depth", 0, "must be at least 1"));
        }
        if self.search_type == SearchType::Skewed {
            let usable = self
                .length_distribution
                .as_ref()
                .is_some_and(|h| h.iter().any(|&c| c > 0));
            if !usable {
                return Err(ShapeletError::ConfigError(
                    "skewed search requires a length_distribution with a non-zero bucket"
                        .to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Check parameters against the dataset the search will run on.
    pub fn validate_for(&self, dataset: &Dataset) -> Result<()> {
        self.validate()?;
        let shortest = dataset.min_series_length();
        if self.max_length > shortest {
            return Err(ShapeletError::ConfigError(format!(
                "max_length {} exceeds the shortest series length {}",
                self.max_length, shortest
            )));
        }
        if self.num_dimensions > dataset.num_dimensions() {
            return Err(ShapeletError::ConfigError(format!(
                "num_dimensions {} exceeds the {} dimensions of the data",
                self.num_dimensions,
                dataset.num_dimensions()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TimeSeries;

    #[test]
    fn test_default_config() {
        let config = SearchConfig::default();
        assert_eq!(config.max_tabu_size, 50);
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.initial_population_size, 50);
        assert_eq!(config.pre_samples, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = SearchConfig::new()
            .with_lengths(5, 20)
            .with_num_shapelets(500)
            .with_seed(7)
            .with_search_type(SearchType::Tabu);

        assert_eq!(config.min_length, 5);
        assert_eq!(config.max_length, 20);
        assert_eq!(config.num_shapelets, 500);
        assert_eq!(config.seed, 7);
        assert_eq!(config.search_type, SearchType::Tabu);
    }

    #[test]
    fn test_inverted_lengths_rejected() {
        let config = SearchConfig::new().with_lengths(10, 3);
        assert!(matches!(config.validate(), Err(ShapeletError::ConfigError(_))));
    }

    #[test]
    fn test_proportion_bounds() {
        assert!(SearchConfig::new().with_proportion(0.0).validate().is_err());
        assert!(SearchConfig::new().with_proportion(1.5).validate().is_err());
        assert!(SearchConfig::new().with_proportion(0.5).validate().is_ok());
    }

    #[test]
    fn test_skewed_requires_histogram() {
        let config = SearchConfig::new().with_search_type(SearchType::Skewed);
        assert!(config.validate().is_err());
        let config = config.with_length_distribution(vec![0, 0]);
        assert!(config.validate().is_err());
        let config = SearchConfig::new()
            .with_search_type(SearchType::Skewed)
            .with_length_distribution(vec![4, 4, 0, 1]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_length_checked_against_data() {
        let ds = Dataset::new(vec![
            TimeSeries::univariate(vec![0.0; 12], 0),
            TimeSeries::univariate(vec![0.0; 8], 1),
        ])
        .unwrap();
        assert!(SearchConfig::new().with_lengths(3, 8).validate_for(&ds).is_ok());
        assert!(SearchConfig::new().with_lengths(3, 9).validate_for(&ds).is_err());
        assert!(SearchConfig::new()
            .with_lengths(3, 8)
            .with_num_dimensions(2)
            .validate_for(&ds)
            .is_err());
    }

    #[test]
    fn test_search_type_names() {
        for t in SearchType::ALL {
            assert_eq!(t.name().parse::<SearchType>().unwrap(), t);
        }
        assert_eq!("BO_SEARCH".parse::<SearchType>().unwrap(), SearchType::Bayesian);
        assert_eq!("fs".parse::<SearchType>().unwrap(), SearchType::FastShapelets);
        assert!("annealing".parse::<SearchType>().is_err());
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: SearchConfig =
            serde_json::from_str(r#"{"min_length": 4, "search_type": "timed-random"}"#).unwrap();
        assert_eq!(config.min_length, 4);
        assert_eq!(config.max_length, 10);
        assert_eq!(config.search_type, SearchType::TimedRandom);
    }
}
