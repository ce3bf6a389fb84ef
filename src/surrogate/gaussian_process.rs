//! Gaussian-process regression
//!
//! Exact GP with a fixed kernel, target normalisation and a Cholesky solve.

use super::Surrogate;
use crate::error::{Result, ShapeletError};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Kernel function types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KernelType {
    /// Radial Basis Function (squared exponential)
    RBF { length_scale: f64 },
    /// Matern kernel, `nu` one of 0.5, 1.5, 2.5
    Matern { nu: f64, length_scale: f64 },
    /// Rational quadratic kernel
    RationalQuadratic { length_scale: f64, alpha: f64 },
}

impl Default for KernelType {
    fn default() -> Self {
        KernelType::RBF { length_scale: 0.1 }
    }
}

/// Kernel matrix between the rows of `x1` and `x2`
fn compute_kernel(x1: &Array2<f64>, x2: &Array2<f64>, kernel: &KernelType) -> Array2<f64> {
    let mut k = Array2::zeros((x1.nrows(), x2.nrows()));
    for (i, xi) in x1.rows().into_iter().enumerate() {
        for (j, xj) in x2.rows().into_iter().enumerate() {
            k[[i, j]] = kernel_value(xi, xj, kernel);
        }
    }
    k
}

/// Kernel value between two points
fn kernel_value(x1: ArrayView1<f64>, x2: ArrayView1<f64>, kernel: &KernelType) -> f64 {
    let diff = &x1 - &x2;
    let dist_sq = diff.dot(&diff);
    match kernel {
        KernelType::RBF { length_scale } => (-0.5 * dist_sq / (length_scale * length_scale)).exp(),
        KernelType::Matern { nu, length_scale } => {
            let r = dist_sq.sqrt() / length_scale;
            if r < 1e-10 {
                return 1.0;
            }
            if (*nu - 0.5).abs() < 1e-6 {
                (-r).exp()
            } else if (*nu - 1.5).abs() < 1e-6 {
                let sqrt3 = 3.0_f64.sqrt();
                (1.0 + sqrt3 * r) * (-sqrt3 * r).exp()
            } else {
                let sqrt5 = 5.0_f64.sqrt();
                (1.0 + sqrt5 * r + 5.0 / 3.0 * r * r) * (-sqrt5 * r).exp()
            }
        }
        KernelType::RationalQuadratic { length_scale, alpha } => {
            (1.0 + dist_sq / (2.0 * alpha * length_scale * length_scale)).powf(-*alpha)
        }
    }
}

/// Fitted state
#[derive(Debug, Clone)]
struct Posterior {
    x_train: Array2<f64>,
    l_chol: Array2<f64>,
    alpha: Array1<f64>,
    y_mean: f64,
    y_std: f64,
}

/// Gaussian process regression model
#[derive(Debug, Clone)]
pub struct GaussianProcess {
    kernel: KernelType,
    /// Noise variance added to the kernel diagonal
    noise: f64,
    posterior: Option<Posterior>,
}

impl Default for GaussianProcess {
    fn default() -> Self {
        Self::new(KernelType::default())
    }
}

impl GaussianProcess {
    /// Create new GP with given kernel
    pub fn new(kernel: KernelType) -> Self {
        Self {
            kernel,
            noise: 1e-6,
            posterior: None,
        }
    }

    /// Set noise level
    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise.max(1e-10);
        self
    }

    pub fn kernel(&self) -> &KernelType {
        &self.kernel
    }

    fn posterior(&self) -> Result<&Posterior> {
        self.posterior.as_ref().ok_or(ShapeletError::ModelNotFitted)
    }

    /// Cholesky factor of a symmetric positive-definite matrix.
    fn cholesky(a: &Array2<f64>) -> Result<Array2<f64>> {
        let n = a.nrows();
        let mut l = Array2::zeros((n, n));

        for i in 0..n {
            for j in 0..=i {
                let mut sum = 0.0;
                for k in 0..j {
                    sum += l[[i, k]] * l[[j, k]];
                }
                if i == j {
                    let pivot = a[[i, i]] - sum;
                    if !(pivot > 0.0) || !pivot.is_finite() {
                        return Err(ShapeletError::SurrogateError(format!(
                            "kernel matrix not positive definite at row {i} (pivot {pivot})"
                        )));
                    }
                    l[[i, i]] = pivot.sqrt();
                } else {
                    l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
                }
            }
        }
        Ok(l)
    }

    /// Solve L @ x = b for lower triangular L
    fn solve_lower_triangular(l: &Array2<f64>, b: ArrayView1<f64>) -> Array1<f64> {
        let n = b.len();
        let mut x = Array1::zeros(n);
        for i in 0..n {
            let mut sum = b[i];
            for j in 0..i {
                sum -= l[[i, j]] * x[j];
            }
            x[i] = sum / l[[i, i]];
        }
        x
    }

    /// Solve L @ L^T @ x = b
    fn solve_triangular_system(l: &Array2<f64>, b: ArrayView1<f64>) -> Array1<f64> {
        let n = b.len();
        let y = Self::solve_lower_triangular(l, b);
        let mut x = Array1::zeros(n);
        for i in (0..n).rev() {
            let mut sum = y[i];
            for j in (i + 1)..n {
                sum -= l[[j, i]] * x[j];
            }
            x[i] = sum / l[[i, i]];
        }
        x
    }

    fn check_columns(&self, x: &Array2<f64>) -> Result<()> {
        let posterior = self.posterior()?;
        if x.ncols() != posterior.x_train.ncols() {
            return Err(ShapeletError::ShapeError {
                expected: format!("{} columns", posterior.x_train.ncols()),
                actual: format!("{} columns", x.ncols()),
            });
        }
        Ok(())
    }
}

impl Surrogate for GaussianProcess {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n = y.len();
        if n == 0 {
            return Err(ShapeletError::SurrogateError("no training data".to_string()));
        }
        if x.nrows() != n {
            return Err(ShapeletError::ShapeError {
                expected: format!("{n} rows"),
                actual: format!("{} rows", x.nrows()),
            });
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(ShapeletError::SurrogateError("non-finite training data".to_string()));
        }

        // Normalize y
        let y_mean = y.mean().unwrap_or(0.0);
        let mut y_std = y.std(0.0);
        if y_std < 1e-10 {
            y_std = 1.0;
        }
        let y_normalized = y.mapv(|yi| (yi - y_mean) / y_std);

        let mut k = compute_kernel(x, x, &self.kernel);
        for i in 0..n {
            k[[i, i]] += self.noise;
        }

        let l_chol = Self::cholesky(&k)?;
        let alpha = Self::solve_triangular_system(&l_chol, y_normalized.view());

        self.posterior = Some(Posterior {
            x_train: x.clone(),
            l_chol,
            alpha,
            y_mean,
            y_std,
        });
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<(Array1<f64>, Array1<f64>)> {
        self.check_columns(x)?;
        let p = self.posterior()?;

        let k_star = compute_kernel(x, &p.x_train, &self.kernel);
        let mean = k_star.dot(&p.alpha).mapv(|m| m * p.y_std + p.y_mean);

        // Variance: k** - v^T v with L v = k*
        let mut var = Array1::zeros(x.nrows());
        for (i, row) in x.rows().into_iter().enumerate() {
            let k_self = kernel_value(row, row, &self.kernel);
            let v = Self::solve_lower_triangular(&p.l_chol, k_star.row(i));
            var[i] = (k_self - v.dot(&v)).max(1e-10) * p.y_std * p.y_std;
        }
        Ok((mean, var))
    }

    fn predict_mean(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_columns(x)?;
        let p = self.posterior()?;
        let k_star = compute_kernel(x, &p.x_train, &self.kernel);
        Ok(k_star.dot(&p.alpha).mapv(|m| m * p.y_std + p.y_mean))
    }

    fn is_fitted(&self) -> bool {
        self.posterior.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_kernels_are_one_at_zero_distance() {
        let x = array![0.3, 0.7];
        for kernel in [
            KernelType::RBF { length_scale: 1.0 },
            KernelType::Matern { nu: 2.5, length_scale: 1.0 },
            KernelType::Matern { nu: 0.5, length_scale: 1.0 },
            KernelType::RationalQuadratic { length_scale: 1.0, alpha: 2.0 },
        ] {
            assert!((kernel_value(x.view(), x.view(), &kernel) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_gp_fit_predict() {
        let mut gp = GaussianProcess::new(KernelType::RBF { length_scale: 1.0 });
        // y = x^2
        let x_train = Array2::from_shape_vec((5, 1), vec![-2.0, -1.0, 0.0, 1.0, 2.0]).unwrap();
        let y_train = array![4.0, 1.0, 0.0, 1.0, 4.0];
        gp.fit(&x_train, &y_train).unwrap();

        let (mean, var) = gp.predict(&x_train).unwrap();
        for (m, y) in mean.iter().zip(y_train.iter()) {
            assert!((m - y).abs() < 1e-2, "interpolates training data");
        }
        assert!(var.iter().all(|&v| v > 0.0));

        let x_test = Array2::from_shape_vec((2, 1), vec![-1.5, 1.5]).unwrap();
        let mean_only = gp.predict_mean(&x_test).unwrap();
        let (mean, _) = gp.predict(&x_test).unwrap();
        assert!((mean_only[0] - mean[0]).abs() < 1e-12);
    }

    #[test]
    fn test_predict_before_fit() {
        let gp = GaussianProcess::default();
        let x = Array2::zeros((1, 2));
        assert!(matches!(gp.predict(&x), Err(ShapeletError::ModelNotFitted)));
        assert!(!gp.is_fitted());
    }

    #[test]
    fn test_fit_rejects_bad_data() {
        let mut gp = GaussianProcess::default();
        let empty = Array2::zeros((0, 2));
        assert!(matches!(
            gp.fit(&empty, &Array1::zeros(0)),
            Err(ShapeletError::SurrogateError(_))
        ));

        let x = array![[0.0, 0.0], [1.0, 1.0]];
        assert!(gp.fit(&x, &array![1.0, f64::NAN]).is_err());
        assert!(gp.fit(&x, &array![1.0]).is_err());
    }

    #[test]
    fn test_duplicate_points_without_noise_fail() {
        let mut gp = GaussianProcess::new(KernelType::RBF { length_scale: 1.0 });
        gp.noise = 0.0;
        let x = array![[0.5], [0.5]];
        assert!(matches!(
            gp.fit(&x, &array![1.0, 2.0]),
            Err(ShapeletError::SurrogateError(_))
        ));
    }
}
