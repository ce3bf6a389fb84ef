//! Fast shapelets: SAX discretisation and random projection.
//!
//! Every window of every series is reduced to a short SAX word. Words are
//! grouped under random masks, and each word is scored by how unevenly the
//! classes of the series sharing its masked projection are spread. The
//! scoring pass runs once per dataset; each series then evaluates the best
//! word it was the first to produce.

use super::state::SearchCore;
use super::{Candidate, QualityEvaluator, SearchConfig, SearchStrategy, SearchType, VisitRecord};
use crate::data::{Dataset, TimeSeries};
use crate::error::Result;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Longest SAX word, in symbols
const MAX_WORD_LENGTH: usize = 15;

/// Number of random masks
const NUM_PROJECTIONS: u32 = 10;

/// Fraction of symbol positions masked per projection
const MASK_FRACTION: f64 = 0.25;

/// Breakpoint between the outer and inner symbols (standard normal quartiles)
const BREAKPOINT: f64 = 0.67;

/// Deviation below which a window is treated as flat
const FLAT_EPSILON: f64 = 1e-12;

/// SAX word, two bits per symbol, first segment in the most significant bits
pub type SaxWord = u32;

/// Segment width and word length for windows of `length`.
pub fn word_shape(length: usize) -> (usize, usize) {
    let width = length.div_ceil(MAX_WORD_LENGTH);
    (width, length.div_ceil(width))
}

fn symbol(z: f64) -> SaxWord {
    if z < -BREAKPOINT {
        0
    } else if z < 0.0 {
        1
    } else if z < BREAKPOINT {
        2
    } else {
        3
    }
}

/// Running sums of `x` and `x^2`, so any window's moments are O(1).
struct PrefixSums {
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
}

impl PrefixSums {
    fn new(values: &[f64]) -> Self {
        let mut sum = Vec::with_capacity(values.len() + 1);
        let mut sum_sq = Vec::with_capacity(values.len() + 1);
        sum.push(0.0);
        sum_sq.push(0.0);
        for &v in values {
            sum.push(sum[sum.len() - 1] + v);
            sum_sq.push(sum_sq[sum_sq.len() - 1] + v * v);
        }
        Self { sum, sum_sq }
    }

    fn sum(&self, start: usize, end: usize) -> f64 {
        self.sum[end] - self.sum[start]
    }

    fn sum_sq(&self, start: usize, end: usize) -> f64 {
        self.sum_sq[end] - self.sum_sq[start]
    }
}

/// SAX word of `values[start..start + length]`.
///
/// Segments are `width` samples long except the last, which takes the rest.
/// A flat window maps every segment to symbol 2.
fn sax_word(prefix: &PrefixSums, start: usize, length: usize, width: usize, word_length: usize) -> SaxWord {
    let end = start + length;
    let n = length as f64;
    let mean = prefix.sum(start, end) / n;
    let variance = (prefix.sum_sq(start, end) / n - mean * mean).max(0.0);
    let std = variance.sqrt();

    let mut word: SaxWord = 0;
    for segment in 0..word_length {
        let seg_start = start + segment * width;
        let seg_end = if segment + 1 == word_length { end } else { seg_start + width };
        let value = if std < FLAT_EPSILON {
            2
        } else {
            let seg_mean = prefix.sum(seg_start, seg_end) / (seg_end - seg_start) as f64;
            symbol((seg_mean - mean) / std)
        };
        word = (word << 2) | value;
    }
    word
}

/// Series and occurrence bookkeeping for one SAX word
#[derive(Debug, Clone, Default)]
struct WordEntry {
    series: BTreeSet<usize>,
    /// `(series, start)` in the order produced
    occurrences: Vec<(usize, usize)>,
    /// Projections in which each series shared this word's bucket
    counts: BTreeMap<usize, u32>,
}

/// A scored word of a given length
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredWord {
    pub length: usize,
    pub word: SaxWord,
    pub score: f64,
    /// First `(series, start)` that produced the word
    pub first_occurrence: (usize, usize),
}

/// Class-separation score from per-class in/out bucket counts.
pub fn separation_score(counts_in: &[f64], counts_out: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut max = f64::NEG_INFINITY;
    let mut min = f64::INFINITY;
    for (c_in, c_out) in counts_in.iter().zip(counts_out) {
        let diff = c_in - c_out;
        max = max.max(diff);
        min = min.min(diff);
        sum += diff.abs();
    }
    if counts_in.is_empty() {
        return 0.0;
    }
    (sum - max.abs() - min.abs()) + (max - min).abs()
}

/// SAX/random-projection search over univariate series.
pub struct FastShapeletSearch {
    core: SearchCore,
    scores: Vec<ScoredWord>,
}

impl FastShapeletSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            core: SearchCore::new(config),
            scores: Vec::new(),
        }
    }

    /// Words of every length, best first
    pub fn scored_words(&self) -> &[ScoredWord] {
        &self.scores
    }

    fn build_words(dataset: &Dataset, length: usize) -> BTreeMap<SaxWord, WordEntry> {
        let (width, word_length) = word_shape(length);
        let mut words: BTreeMap<SaxWord, WordEntry> = BTreeMap::new();
        for series in dataset {
            let Some(values) = series.dimension(0) else {
                continue;
            };
            if values.len() < length {
                continue;
            }
            let prefix = PrefixSums::new(values);
            let mut previous = None;
            for start in 0..=values.len() - length {
                let word = sax_word(&prefix, start, length, width, word_length);
                if previous == Some(word) {
                    continue;
                }
                previous = Some(word);
                let entry = words.entry(word).or_default();
                entry.series.insert(series.index());
                entry.occurrences.push((series.index(), start));
            }
        }
        words
    }

    /// Mask covering `ceil(0.25 * word_length)` random symbol positions;
    /// repeated positions are not redrawn.
    fn mask(&mut self, word_length: usize) -> SaxWord {
        let num_masked = (MASK_FRACTION * word_length as f64).ceil() as usize;
        let mut mask = 0;
        for _ in 0..num_masked {
            let position = self.core.rng.gen_range(0..word_length);
            mask |= 0b11 << (2 * position);
        }
        mask
    }

    fn project(&mut self, words: &mut BTreeMap<SaxWord, WordEntry>, word_length: usize) {
        for _ in 0..NUM_PROJECTIONS {
            let mask = self.mask(word_length);
            let mut buckets: BTreeMap<SaxWord, BTreeSet<usize>> = BTreeMap::new();
            for (word, entry) in words.iter() {
                buckets
                    .entry(word | mask)
                    .or_default()
                    .extend(entry.series.iter().copied());
            }
            for (word, entry) in words.iter_mut() {
                if let Some(bucket) = buckets.get(&(*word | mask)) {
                    for &series in bucket {
                        *entry.counts.entry(series).or_insert(0) += 1;
                    }
                }
            }
        }
    }

    fn score(entry: &WordEntry, dataset: &Dataset) -> f64 {
        let num_classes = dataset.num_classes();
        let mut counts_in = vec![0.0; num_classes];
        let mut counts_out = vec![0.0; num_classes];
        for (&series, &count) in &entry.counts {
            let Some(class) = dataset.series(series).map(TimeSeries::label) else {
                continue;
            };
            counts_in[class] += f64::from(count);
            counts_out[class] += f64::from(NUM_PROJECTIONS - count);
        }
        separation_score(&counts_in, &counts_out)
    }
}

impl SearchStrategy for FastShapeletSearch {
    fn initialise(&mut self, dataset: &Dataset) -> Result<()> {
        self.core.initialise(dataset)?;
        self.scores.clear();

        let min = self.core.config.min_length;
        let max = self.core.config.max_length;
        for length in (min..=max).step_by(self.core.config.length_increment) {
            let (_, word_length) = word_shape(length);
            let mut words = Self::build_words(dataset, length);
            self.project(&mut words, word_length);
            debug!(length, words = words.len(), "SAX words built");
            for (word, entry) in &words {
                let Some(&first_occurrence) = entry.occurrences.first() else {
                    continue;
                };
                self.scores.push(ScoredWord {
                    length,
                    word: *word,
                    score: Self::score(entry, dataset),
                    first_occurrence,
                });
            }
        }
        self.scores.sort_by(|a, b| b.score.total_cmp(&a.score));
        info!(words = self.scores.len(), "Fast shapelet scores computed");
        Ok(())
    }

    fn search_series(
        &mut self,
        series: &TimeSeries,
        evaluator: &mut dyn QualityEvaluator,
    ) -> Result<Vec<Candidate>> {
        self.core.begin_series(series)?;
        let index = series.index();
        let owned: Vec<(usize, usize)> = self
            .scores
            .iter()
            .filter(|w| w.first_occurrence.0 == index)
            .map(|w| (w.length, w.first_occurrence.1))
            .collect();

        for (length, start) in owned {
            if !self.core.mark_visited(length, start, 0) {
                continue;
            }
            if let Some(c) = self.core.evaluate(evaluator, series, 0, start, length) {
                return Ok(vec![c]);
            }
        }
        Ok(Vec::new())
    }

    fn search_type(&self) -> SearchType {
        SearchType::FastShapelets
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

    fn bump(at: usize, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| if (at..at + 5).contains(&i) { 5.0 } else { (i as f64 * 0.3).sin() * 0.1 })
            .collect()
    }

    fn dataset() -> Dataset {
        Dataset::new(vec![
            TimeSeries::univariate(bump(5, 40), 0),
            TimeSeries::univariate(bump(8, 40), 0),
            TimeSeries::univariate((0..40).map(|i| (i as f64 * 0.3).sin()).collect(), 1),
            TimeSeries::univariate((0..40).map(|i| (i as f64 * 0.35).sin()).collect(), 1),
        ])
        .unwrap()
    }

    #[test]
    fn test_word_shape() {
        assert_eq!(word_shape(10), (1, 10));
        assert_eq!(word_shape(15), (1, 15));
        assert_eq!(word_shape(16), (2, 8));
        assert_eq!(word_shape(40), (3, 14));
    }

    #[test]
    fn test_sax_word_symbols() {
        let values = [0.0, 0.0, 10.0, 10.0];
        let prefix = PrefixSums::new(&values);
        // two segments: low then high
        assert_eq!(sax_word(&prefix, 0, 4, 2, 2), 0b00_11);

        let flat = PrefixSums::new(&[1.0; 6]);
        assert_eq!(sax_word(&flat, 0, 6, 2, 3), 0b10_10_10);
    }

    #[test]
    fn test_separation_score() {
        // perfectly separated two-class bucket
        assert_eq!(separation_score(&[20.0, 0.0], &[0.0, 20.0]), 40.0);
        assert_eq!(separation_score(&[10.0, 10.0], &[10.0, 10.0]), 0.0);
    }

    #[test]
    fn test_scores_sorted_and_one_candidate_per_series() {
        let ds = dataset();
        let config = SearchConfig::new().with_lengths(5, 8).with_seed(21);
        let mut search = FastShapeletSearch::new(config);
        search.initialise(&ds).unwrap();

        let scores = search.scored_words();
        assert!(!scores.is_empty());
        for pair in scores.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }

        let mut eval = |s: &TimeSeries, d: usize, st: usize, l: usize| {
            Some(Candidate::for_window(s, d, st, l, 1.0))
        };
        for series in &ds {
            let found = search.search_series(series, &mut eval).unwrap();
            assert!(found.len() <= 1);
            for c in found {
                assert_eq!(c.series_index, series.index());
                assert_eq!(c.dimension, 0);
                assert!((5..=8).contains(&c.length));
            }
        }
        // the first series always produces words of its own
        let first = search.search_series(ds.series(0).unwrap(), &mut eval).unwrap();
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn test_rejected_word_falls_through() {
        let ds = dataset();
        let mut search = FastShapeletSearch::new(SearchConfig::new().with_lengths(5, 8));
        search.initialise(&ds).unwrap();
        let mut calls = 0;
        let mut eval = |s: &TimeSeries, d: usize, st: usize, l: usize| {
            calls += 1;
            (calls > 1).then(|| Candidate::for_window(s, d, st, l, 1.0))
        };
        let found = search.search_series(ds.series(0).unwrap(), &mut eval).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(calls, 2);
    }
}
