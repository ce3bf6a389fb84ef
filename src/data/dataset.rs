//! Ordered collection of labeled series

use super::TimeSeries;
use crate::error::{Result, ShapeletError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Read-only collection of labeled series.
///
/// Series indices are reassigned to their position on construction, so
/// `dataset.series(i).index() == i` always holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawDataset")]
pub struct Dataset {
    series: Vec<TimeSeries>,
    num_classes: usize,
}

/// Serialized form; `num_classes` of 0 or absent means infer from labels.
#[derive(Deserialize)]
struct RawDataset {
    series: Vec<TimeSeries>,
    #[serde(default)]
    num_classes: usize,
}

impl TryFrom<RawDataset> for Dataset {
    type Error = ShapeletError;

    fn try_from(raw: RawDataset) -> Result<Self> {
        if raw.num_classes == 0 {
            Dataset::new(raw.series)
        } else {
            Dataset::with_num_classes(raw.series, raw.num_classes)
        }
    }
}

impl Dataset {
    /// Build a dataset, inferring the class count from the largest label.
    pub fn new(series: Vec<TimeSeries>) -> Result<Self> {
        let num_classes = series.iter().map(|s| s.label() + 1).max().unwrap_or(0);
        Self::with_num_classes(series, num_classes)
    }

    /// Build a dataset with an explicit class count.
    pub fn with_num_classes(series: Vec<TimeSeries>, num_classes: usize) -> Result<Self> {
        if series.is_empty() {
            return Err(ShapeletError::DataError("dataset has no series".to_string()));
        }

        let dims = series[0].num_dimensions();
        for s in &series {
            s.validate()?;
            if s.num_dimensions() != dims {
                return Err(ShapeletError::DataError(format!(
                    "series have {} and {} dimensions",
                    dims,
                    s.num_dimensions()
                )));
            }
            if s.label() >= num_classes {
                return Err(ShapeletError::DataError(format!(
                    "label {} outside {} classes",
                    s.label(),
                    num_classes
                )));
            }
        }

        let series = series
            .into_iter()
            .enumerate()
            .map(|(i, s)| s.with_index(i))
            .collect();

        Ok(Self { series, num_classes })
    }

    /// Load a dataset from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Number of series
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Whether the dataset is empty (never true for a constructed dataset)
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Number of classes
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Number of dimensions shared by every series
    pub fn num_dimensions(&self) -> usize {
        self.series[0].num_dimensions()
    }

    /// Series at position `i`
    pub fn series(&self, i: usize) -> Option<&TimeSeries> {
        self.series.get(i)
    }

    /// Iterate series in order
    pub fn iter(&self) -> std::slice::Iter<'_, TimeSeries> {
        self.series.iter()
    }

    /// Length of the shortest series
    pub fn min_series_length(&self) -> usize {
        self.series.iter().map(TimeSeries::len).min().unwrap_or(0)
    }

    /// Length of the longest series
    pub fn max_series_length(&self) -> usize {
        self.series.iter().map(TimeSeries::len).max().unwrap_or(0)
    }

    /// Number of series per class
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.num_classes];
        for s in &self.series {
            counts[s.label()] += 1;
        }
        counts
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a TimeSeries;
    type IntoIter = std::slice::Iter<'a, TimeSeries>;

    fn into_iter(self) -> Self::IntoIter {
        self.series.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy() -> Dataset {
        Dataset::new(vec![
            TimeSeries::univariate(vec![0.0; 10], 0),
            TimeSeries::univariate(vec![1.0; 12], 1),
            TimeSeries::univariate(vec![2.0; 8], 1),
        ])
        .unwrap()
    }

    #[test]
    fn test_dataset_summary() {
        let ds = toy();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.num_classes(), 2);
        assert_eq!(ds.min_series_length(), 8);
        assert_eq!(ds.max_series_length(), 12);
        assert_eq!(ds.class_counts(), vec![1, 2]);
    }

    #[test]
    fn test_indices_follow_position() {
        let ds = toy();
        for (i, s) in ds.iter().enumerate() {
            assert_eq!(s.index(), i);
        }
    }

    #[test]
    fn test_empty_dataset_rejected() {
        assert!(Dataset::new(Vec::new()).is_err());
    }

    #[test]
    fn test_label_outside_class_count_rejected() {
        let series = vec![TimeSeries::univariate(vec![0.0; 4], 3)];
        assert!(Dataset::with_num_classes(series, 2).is_err());
    }

    #[test]
    fn test_deserialize_assigns_indices_and_classes() {
        let json = r#"{"series":[{"values":[[1.0,2.0,3.0]],"label":0},{"values":[[3.0,2.0,1.0]],"label":1}]}"#;
        let ds: Dataset = serde_json::from_str(json).unwrap();
        let indices: Vec<usize> = ds.iter().map(TimeSeries::index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(ds.num_classes(), 2);
        assert_eq!(ds.class_counts(), vec![1, 1]);
    }

    #[test]
    fn test_deserialize_validates() {
        let explicit = r#"{"series":[{"values":[[1.0,2.0]],"label":0}],"num_classes":3}"#;
        let ds: Dataset = serde_json::from_str(explicit).unwrap();
        assert_eq!(ds.num_classes(), 3);

        let bad_label = r#"{"series":[{"values":[[1.0,2.0]],"label":2}],"num_classes":2}"#;
        assert!(serde_json::from_str::<Dataset>(bad_label).is_err());
        assert!(serde_json::from_str::<Dataset>(r#"{"series":[]}"#).is_err());

        let ragged = r#"{"series":[{"values":[[1.0,2.0],[1.0]],"label":0}]}"#;
        assert!(serde_json::from_str::<Dataset>(ragged).is_err());
    }

    #[test]
    fn test_serialize_then_deserialize_keeps_dataset() {
        let ds = toy();
        let json = serde_json::to_string(&ds).unwrap();
        let back: Dataset = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 3);
        assert_eq!(back.num_classes(), 2);
        assert_eq!(back.series(2).unwrap().index(), 2);
    }
}
