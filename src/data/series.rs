//! A single labeled time series

use crate::error::{Result, ShapeletError};
use serde::{Deserialize, Serialize};

/// One labeled series with one value vector per dimension.
///
/// All dimensions share the same length. The index is the series' position
/// in its [`Dataset`](super::Dataset) and is assigned when the dataset is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Values per dimension
    values: Vec<Vec<f64>>,
    /// Class label
    label: usize,
    /// Position in the owning dataset
    #[serde(default)]
    index: usize,
}

impl TimeSeries {
    /// Create a multivariate series.
    pub fn new(values: Vec<Vec<f64>>, label: usize) -> Result<Self> {
        let series = Self { values, label, index: 0 };
        series.validate()?;
        Ok(series)
    }

    /// Create a univariate series.
    pub fn univariate(values: Vec<f64>, label: usize) -> Self {
        Self {
            values: vec![values],
            label,
            index: 0,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let first = self
            .values
            .first()
            .ok_or_else(|| ShapeletError::DataError("series has no dimensions".to_string()))?;
        if let Some(bad) = self.values.iter().position(|d| d.len() != first.len()) {
            return Err(ShapeletError::DataError(format!(
                "dimension {} has length {}, expected {}",
                bad,
                self.values[bad].len(),
                first.len()
            )));
        }
        Ok(())
    }

    pub(crate) fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Number of samples per dimension
    pub fn len(&self) -> usize {
        self.values.first().map_or(0, Vec::len)
    }

    /// Whether the series holds no samples
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of dimensions (channels)
    pub fn num_dimensions(&self) -> usize {
        self.values.len()
    }

    /// Class label
    pub fn label(&self) -> usize {
        self.label
    }

    /// Position of the series in its dataset
    pub fn index(&self) -> usize {
        self.index
    }

    /// Raw values of one dimension
    pub fn dimension(&self, dim: usize) -> Option<&[f64]> {
        self.values.get(dim).map(Vec::as_slice)
    }

    /// The window `[start, start + length)` of one dimension, if it fits.
    pub fn window(&self, dim: usize, start: usize, length: usize) -> Option<&[f64]> {
        let values = self.values.get(dim)?;
        let end = start.checked_add(length)?;
        values.get(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_univariate_series() {
        let s = TimeSeries::univariate(vec![1.0, 2.0, 3.0], 1);
        assert_eq!(s.len(), 3);
        assert_eq!(s.num_dimensions(), 1);
        assert_eq!(s.label(), 1);
        assert_eq!(s.window(0, 1, 2), Some(&[2.0, 3.0][..]));
        assert_eq!(s.window(0, 2, 2), None);
    }

    #[test]
    fn test_ragged_dimensions_rejected() {
        let result = TimeSeries::new(vec![vec![1.0, 2.0], vec![1.0]], 0);
        assert!(matches!(result, Err(ShapeletError::DataError(_))));
    }

    #[test]
    fn test_no_dimensions_rejected() {
        assert!(TimeSeries::new(Vec::new(), 0).is_err());
    }
}
