//! Strategy construction from a selector

use super::{
    BayesianOptimisedSearch, Candidate, FastShapeletSearch, FullSearch, GeneticSearch,
    ImportanceSampledSearch, LocalSearch, MagnifySearch, QualityEvaluator, RandomSearch,
    RandomTimedSearch, RefinedRandomSearch, SearchConfig, SearchStrategy, SearchType,
    SkewedRandomSearch, SkippingSearch, TabuSearch, VisitRecord,
};
use crate::data::{Dataset, TimeSeries};
use crate::error::Result;

/// Any search strategy, selected at runtime
pub enum ShapeletSearcher {
    Full(FullSearch),
    FastShapelets(FastShapeletSearch),
    Genetic(GeneticSearch),
    Random(RandomSearch),
    Local(LocalSearch),
    Magnify(MagnifySearch),
    TimedRandom(RandomTimedSearch),
    Skipping(SkippingSearch),
    Tabu(TabuSearch),
    RefinedRandom(RefinedRandomSearch),
    ImportanceSampled(ImportanceSampledSearch),
    Skewed(SkewedRandomSearch),
    Bayesian(BayesianOptimisedSearch),
}

macro_rules! dispatch {
    ($self:expr, $s:ident => $body:expr) => {
        match $self {
            ShapeletSearcher::Full($s) => $body,
            ShapeletSearcher::FastShapelets($s) => $body,
            ShapeletSearcher::Genetic($s) => $body,
            ShapeletSearcher::Random($s) => $body,
            ShapeletSearcher::Local($s) => $body,
            ShapeletSearcher::Magnify($s) => $body,
            ShapeletSearcher::TimedRandom($s) => $body,
            ShapeletSearcher::Skipping($s) => $body,
            ShapeletSearcher::Tabu($s) => $body,
            ShapeletSearcher::RefinedRandom($s) => $body,
            ShapeletSearcher::ImportanceSampled($s) => $body,
            ShapeletSearcher::Skewed($s) => $body,
            ShapeletSearcher::Bayesian($s) => $body,
        }
    };
}

impl SearchStrategy for ShapeletSearcher {
    fn initialise(&mut self, dataset: &Dataset) -> Result<()> {
        dispatch!(self, s => s.initialise(dataset))
    }

    fn search_series(
        &mut self,
        series: &TimeSeries,
        evaluator: &mut dyn QualityEvaluator,
    ) -> Result<Vec<Candidate>> {
        dispatch!(self, s => s.search_series(series, evaluator))
    }

    fn search_type(&self) -> SearchType {
        dispatch!(self, s => s.search_type())
    }

    fn config(&self) -> &SearchConfig {
        dispatch!(self, s => s.config())
    }

    fn visits(&self) -> &[VisitRecord] {
        dispatch!(self, s => s.visits())
    }
}

/// Build the strategy named by `config.search_type`.
pub fn create_search(config: &SearchConfig) -> ShapeletSearcher {
    let config = config.clone();
    match config.search_type {
        SearchType::Full => ShapeletSearcher::Full(FullSearch::new(config)),
        SearchType::FastShapelets => ShapeletSearcher::FastShapelets(FastShapeletSearch::new(config)),
        SearchType::Genetic => ShapeletSearcher::Genetic(GeneticSearch::new(config)),
        SearchType::Random => ShapeletSearcher::Random(RandomSearch::new(config)),
        SearchType::Local => ShapeletSearcher::Local(LocalSearch::new(config)),
        SearchType::Magnify => ShapeletSearcher::Magnify(MagnifySearch::new(config)),
        SearchType::TimedRandom => ShapeletSearcher::TimedRandom(RandomTimedSearch::new(config)),
        SearchType::Skipping => ShapeletSearcher::Skipping(SkippingSearch::new(config)),
        SearchType::Tabu => ShapeletSearcher::Tabu(TabuSearch::new(config)),
        SearchType::RefinedRandom => ShapeletSearcher::RefinedRandom(RefinedRandomSearch::new(config)),
        SearchType::ImportanceSampled => {
            ShapeletSearcher::ImportanceSampled(ImportanceSampledSearch::new(config))
        }
        SearchType::Skewed => ShapeletSearcher::Skewed(SkewedRandomSearch::new(config)),
        SearchType::Bayesian => ShapeletSearcher::Bayesian(BayesianOptimisedSearch::new(config)),
    }
}
