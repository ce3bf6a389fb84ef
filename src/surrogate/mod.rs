//! Regression surrogates used to guide the Bayesian search
//!
//! A surrogate is fitted on evaluated `(length, start)` points and predicts
//! the quality of unevaluated ones, with an uncertainty estimate.

mod gaussian_process;

pub use gaussian_process::{GaussianProcess, KernelType};

use crate::error::Result;
use ndarray::{Array1, Array2};

/// Regression with uncertainty
pub trait Surrogate: Send {
    /// Fit on rows of `x` with targets `y`, replacing any previous fit.
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predictive mean and variance at each row of `x`.
    fn predict(&self, x: &Array2<f64>) -> Result<(Array1<f64>, Array1<f64>)>;

    /// Predictive mean only
    fn predict_mean(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.predict(x).map(|(mean, _)| mean)
    }

    /// Whether `fit` has succeeded since construction
    fn is_fitted(&self) -> bool;
}
