//! Occupancy grid of already-evaluated windows

use std::collections::HashMap;

/// Per-length boolean grids over `start x dimension`.
///
/// Grids are allocated lazily the first time a length is touched and cleared
/// by [`VisitedTracker::reset`].
#[derive(Debug, Clone, Default)]
pub struct VisitedTracker {
    grids: HashMap<usize, Vec<bool>>,
    series_length: usize,
    num_dimensions: usize,
}

impl VisitedTracker {
    pub fn new(series_length: usize, num_dimensions: usize) -> Self {
        Self {
            grids: HashMap::new(),
            series_length,
            num_dimensions: num_dimensions.max(1),
        }
    }

    /// Forget every visit and resize for a series of `series_length`.
    pub fn reset(&mut self, series_length: usize) {
        self.grids.clear();
        self.series_length = series_length;
    }

    fn slot(&self, length: usize, start: usize, dimension: usize) -> Option<usize> {
        if dimension >= self.num_dimensions || length == 0 || start + length > self.series_length {
            return None;
        }
        Some(start * self.num_dimensions + dimension)
    }

    /// Whether the window has been marked.
    pub fn contains(&self, length: usize, start: usize, dimension: usize) -> bool {
        match (self.slot(length, start, dimension), self.grids.get(&length)) {
            (Some(slot), Some(grid)) => grid[slot],
            _ => false,
        }
    }

    /// Mark a window; returns `false` if it was already marked or does not fit.
    pub fn insert(&mut self, length: usize, start: usize, dimension: usize) -> bool {
        let Some(slot) = self.slot(length, start, dimension) else {
            return false;
        };
        let size = (self.series_length - length + 1) * self.num_dimensions;
        let grid = self.grids.entry(length).or_insert_with(|| vec![false; size]);
        if grid[slot] {
            return false;
        }
        grid[slot] = true;
        true
    }

    /// Number of marked windows
    pub fn len(&self) -> usize {
        self.grids
            .values()
            .map(|g| g.iter().filter(|&&v| v).count())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_once() {
        let mut tracker = VisitedTracker::new(20, 1);
        assert!(tracker.insert(5, 3, 0));
        assert!(!tracker.insert(5, 3, 0));
        assert!(tracker.contains(5, 3, 0));
        assert!(!tracker.contains(5, 4, 0));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_dimensions_are_distinct() {
        let mut tracker = VisitedTracker::new(20, 3);
        assert!(tracker.insert(4, 0, 0));
        assert!(tracker.insert(4, 0, 2));
        assert!(!tracker.insert(4, 0, 3));
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut tracker = VisitedTracker::new(10, 1);
        assert!(tracker.insert(10, 0, 0));
        assert!(!tracker.insert(10, 1, 0));
        assert!(!tracker.insert(0, 0, 0));
    }

    #[test]
    fn test_reset_clears() {
        let mut tracker = VisitedTracker::new(10, 1);
        tracker.insert(3, 2, 0);
        tracker.reset(15);
        assert!(tracker.is_empty());
        assert!(tracker.insert(3, 12, 0));
    }
}
