//! Deterministic enumeration with per-class offsets

use super::full::enumerate_from;
use super::state::SearchCore;
use super::{Candidate, QualityEvaluator, SearchConfig, SearchStrategy, SearchType, VisitRecord};
use crate::data::{Dataset, TimeSeries};
use crate::error::Result;
use std::collections::BTreeMap;
use tracing::trace;

/// Offsets applied to the enumeration grid for one class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipCursor {
    pub position: usize,
    pub length: usize,
}

/// Enumerates the increment grid shifted by a cursor kept per class.
///
/// After each series the class cursor advances by one modulo the
/// corresponding increment, so successive series of a class cover different
/// residues. With an increment of 1 the offset stays at 0.
pub struct SkippingSearch {
    core: SearchCore,
    cursors: BTreeMap<usize, SkipCursor>,
}

impl SkippingSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            core: SearchCore::new(config),
            cursors: BTreeMap::new(),
        }
    }

    /// Current offsets for `class`
    pub fn cursor(&self, class: usize) -> SkipCursor {
        self.cursors.get(&class).copied().unwrap_or_default()
    }
}

impl SearchStrategy for SkippingSearch {
    fn initialise(&mut self, dataset: &Dataset) -> Result<()> {
        self.core.initialise(dataset)?;
        self.cursors.clear();
        Ok(())
    }

    fn search_series(
        &mut self,
        series: &TimeSeries,
        evaluator: &mut dyn QualityEvaluator,
    ) -> Result<Vec<Candidate>> {
        self.core.begin_series(series)?;
        let cursor = self.cursor(series.label());
        trace!(class = series.label(), ?cursor, "Skipping offsets");

        let first_length = self.core.config.min_length + cursor.length;
        let found = enumerate_from(&mut self.core, series, evaluator, first_length, cursor.position)?;

        let next = SkipCursor {
            position: (cursor.position + 1) % self.core.config.position_increment,
            length: (cursor.length + 1) % self.core.config.length_increment,
        };
        self.cursors.insert(series.label(), next);
        Ok(found)
    }

    fn search_type(&self) -> SearchType {
        SearchType::Skipping
    }

    fn config(&self) -> &SearchConfig {
        &self.core.config
    }

    fn visits(&self) -> &[VisitRecord] {
        self.core.visits()
    }
}
