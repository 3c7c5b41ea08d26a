//! Support Vector Machine implementations
//!
//! The classifier trains binary machines with SMO (Sequential Minimal
//! Optimization) and combines them one-vs-rest. The regressor solves the
//! epsilon-insensitive dual by cyclic coordinate descent.

use super::models::{check_xy, class_labels, Model};
use crate::error::{MycsvError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Default row limit for the dense kernel matrix
pub const MAX_KERNEL_MATRIX_SAMPLES: usize = 5_000;

/// Kernel function type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum KernelType {
    /// K(x, y) = x · y
    Linear,
    /// K(x, y) = exp(-γ ||x - y||²); `None` picks γ = 1 / (p · Var(X))
    RBF { gamma: Option<f64> },
}

impl Default for KernelType {
    fn default() -> Self {
        KernelType::RBF { gamma: None }
    }
}

/// Kernel with its bandwidth resolved against the training data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
enum Kernel {
    Linear,
    Rbf { gamma: f64 },
}

impl Kernel {
    fn resolve(kernel: KernelType, x: &Array2<f64>) -> Self {
        match kernel {
            KernelType::Linear => Kernel::Linear,
            KernelType::RBF { gamma: Some(gamma) } => Kernel::Rbf { gamma },
            KernelType::RBF { gamma: None } => Kernel::Rbf {
                gamma: scale_gamma(x),
            },
        }
    }

    #[inline]
    fn eval(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        match self {
            Kernel::Linear => a.dot(&b),
            Kernel::Rbf { gamma } => {
                let sq: f64 = a.iter().zip(b.iter()).map(|(u, v)| (u - v) * (u - v)).sum();
                (-gamma * sq).exp()
            }
        }
    }

    /// Dense symmetric kernel matrix, rows computed in parallel
    fn matrix(&self, x: &Array2<f64>) -> Array2<f64> {
        let n = x.nrows();
        let rows: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| (i..n).map(|j| self.eval(x.row(i), x.row(j))).collect())
            .collect();

        let mut k = Array2::zeros((n, n));
        for (i, row) in rows.into_iter().enumerate() {
            for (offset, val) in row.into_iter().enumerate() {
                let j = i + offset;
                k[[i, j]] = val;
                k[[j, i]] = val;
            }
        }
        k
    }
}

/// γ = 1 / (n_features · Var(X)) over every entry of X; 1 when X is constant
pub fn scale_gamma(x: &Array2<f64>) -> f64 {
    let n = x.len();
    if n == 0 || x.ncols() == 0 {
        return 1.0;
    }
    let mean = x.sum() / n as f64;
    let var = x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    if var > 0.0 {
        1.0 / (x.ncols() as f64 * var)
    } else {
        1.0
    }
}

fn check_kernel_size(n: usize, limit: usize) -> Result<()> {
    if n > limit {
        return Err(MycsvError::TrainingError(format!(
            "{} samples exceed the {} row limit for a dense kernel matrix",
            n, limit
        )));
    }
    Ok(())
}

/// SVM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMConfig {
    /// Regularization parameter (C)
    pub c: f64,
    pub kernel: KernelType,
    pub tol: f64,
    /// Maximum passes over the data
    pub max_iter: usize,
    pub random_state: Option<u64>,
    /// Width of the insensitive tube (regression)
    pub epsilon: f64,
    /// Beyond this many rows the dense kernel matrix is refused
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
}

fn default_max_samples() -> usize {
    MAX_KERNEL_MATRIX_SAMPLES
}

impl Default for SVMConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            kernel: KernelType::default(),
            tol: 1e-3,
            max_iter: 200,
            random_state: Some(42),
            epsilon: 0.1,
            max_samples: MAX_KERNEL_MATRIX_SAMPLES,
        }
    }
}

/// One binary machine: `f(x) = Σ αᵢ yᵢ K(svᵢ, x) + b`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BinarySVM {
    support_vectors: Array2<f64>,
    /// αᵢ yᵢ per support vector
    dual_coef: Array1<f64>,
    bias: f64,
}

impl BinarySVM {
    fn decision(&self, kernel: &Kernel, sample: ArrayView1<'_, f64>) -> f64 {
        self.support_vectors
            .rows()
            .into_iter()
            .zip(self.dual_coef.iter())
            .map(|(sv, coef)| coef * kernel.eval(sv, sample))
            .sum::<f64>()
            + self.bias
    }
}

/// Support Vector Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMClassifier {
    config: SVMConfig,
    kernel: Option<Kernel>,
    classes: Vec<f64>,
    /// One machine for two classes, otherwise one per class
    machines: Vec<BinarySVM>,
    is_fitted: bool,
}

impl SVMClassifier {
    pub fn new(config: SVMConfig) -> Self {
        Self {
            config,
            kernel: None,
            classes: Vec::new(),
            machines: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn config(&self) -> &SVMConfig {
        &self.config
    }

    /// `y` holds class indices as f64
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_xy(x, y)?;
        check_kernel_size(x.nrows(), self.config.max_samples)?;

        let classes = class_labels(y);
        if classes.len() < 2 {
            return Err(MycsvError::TrainingError(
                "SVM requires at least 2 distinct classes".to_string(),
            ));
        }

        let kernel = Kernel::resolve(self.config.kernel, x);
        let k = kernel.matrix(x);

        let positives: &[f64] = if classes.len() == 2 { &classes[1..] } else { &classes };
        self.machines = positives
            .iter()
            .map(|&cls| {
                let y_binary = y.mapv(|v| if v == cls { 1.0 } else { -1.0 });
                self.smo_train(x, &k, &y_binary)
            })
            .collect();
        self.kernel = Some(kernel);
        self.classes = classes;
        self.is_fitted = true;
        Ok(self)
    }

    /// Simplified SMO with a random second index. `g` caches
    /// `Σ αⱼ yⱼ K(j, ·)` so each error lookup is O(1).
    fn smo_train(&self, x: &Array2<f64>, k: &Array2<f64>, y: &Array1<f64>) -> BinarySVM {
        let n = x.nrows();
        let c = self.config.c;
        let tol = self.config.tol;
        let mut alphas: Array1<f64> = Array1::zeros(n);
        let mut g: Array1<f64> = Array1::zeros(n);
        let mut bias = 0.0;

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state.unwrap_or(42));
        let mut passes = 0;
        let max_passes = 5;
        let mut total_iter = 0;

        while n > 1 && passes < max_passes && total_iter < self.config.max_iter {
            let mut num_changed = 0;

            for i in 0..n {
                let e_i = g[i] + bias - y[i];
                if !((y[i] * e_i < -tol && alphas[i] < c) || (y[i] * e_i > tol && alphas[i] > 0.0)) {
                    continue;
                }

                let j = loop {
                    let j = rng.gen_range(0..n);
                    if j != i {
                        break j;
                    }
                };
                let e_j = g[j] + bias - y[j];

                let alpha_i_old = alphas[i];
                let alpha_j_old = alphas[j];
                let (l, h) = if y[i] != y[j] {
                    ((alpha_j_old - alpha_i_old).max(0.0), (c + alpha_j_old - alpha_i_old).min(c))
                } else {
                    ((alpha_i_old + alpha_j_old - c).max(0.0), (alpha_i_old + alpha_j_old).min(c))
                };
                if (l - h).abs() < 1e-10 {
                    continue;
                }

                let eta = 2.0 * k[[i, j]] - k[[i, i]] - k[[j, j]];
                if eta >= 0.0 {
                    continue;
                }

                let alpha_j = (alpha_j_old - y[j] * (e_i - e_j) / eta).max(l).min(h);
                if (alpha_j - alpha_j_old).abs() < 1e-5 {
                    continue;
                }
                let alpha_i = alpha_i_old + y[i] * y[j] * (alpha_j_old - alpha_j);
                alphas[i] = alpha_i;
                alphas[j] = alpha_j;

                let d_i = y[i] * (alpha_i - alpha_i_old);
                let d_j = y[j] * (alpha_j - alpha_j_old);
                let b1 = bias - e_i - d_i * k[[i, i]] - d_j * k[[i, j]];
                let b2 = bias - e_j - d_i * k[[i, j]] - d_j * k[[j, j]];
                bias = if alpha_i > 0.0 && alpha_i < c {
                    b1
                } else if alpha_j > 0.0 && alpha_j < c {
                    b2
                } else {
                    (b1 + b2) / 2.0
                };

                g.scaled_add(d_i, &k.row(i));
                g.scaled_add(d_j, &k.row(j));
                num_changed += 1;
            }

            total_iter += 1;
            if num_changed == 0 {
                passes += 1;
            } else {
                passes = 0;
            }
        }

        let support: Vec<usize> = (0..n).filter(|&i| alphas[i] > 1e-8).collect();
        BinarySVM {
            support_vectors: x.select(Axis(0), &support),
            dual_coef: support.iter().map(|&i| alphas[i] * y[i]).collect(),
            bias,
        }
    }

    /// Decision values, one column per machine
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let kernel = match (&self.kernel, self.is_fitted) {
            (Some(k), true) => k,
            _ => return Err(MycsvError::ModelNotFitted),
        };
        let rows: Vec<Vec<f64>> = x
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|sample| self.machines.iter().map(|m| m.decision(kernel, sample)).collect())
            .collect();

        let mut scores = Array2::zeros((x.nrows(), self.machines.len()));
        for (i, row) in rows.into_iter().enumerate() {
            for (m, s) in row.into_iter().enumerate() {
                scores[[i, m]] = s;
            }
        }
        Ok(scores)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let scores = self.decision_function(x)?;
        Ok(scores
            .rows()
            .into_iter()
            .map(|row| {
                if self.classes.len() == 2 {
                    if row[0] >= 0.0 {
                        self.classes[1]
                    } else {
                        self.classes[0]
                    }
                } else {
                    let mut best = 0;
                    for (k, &s) in row.iter().enumerate() {
                        if s > row[best] {
                            best = k;
                        }
                    }
                    self.classes[best]
                }
            })
            .collect())
    }

    pub fn n_support_vectors(&self) -> usize {
        self.machines.iter().map(|m| m.support_vectors.nrows()).sum()
    }
}

impl Model for SVMClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        SVMClassifier::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        SVMClassifier::predict(self, x)
    }
}

/// Support Vector Regressor
///
/// Works on `β = α - α*` with the bias folded into the kernel as `K + 1`,
/// which removes the equality constraint so each coordinate has a closed
/// form soft-threshold update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMRegressor {
    config: SVMConfig,
    kernel: Option<Kernel>,
    support_vectors: Option<Array2<f64>>,
    dual_coef: Option<Array1<f64>>,
    bias: f64,
    is_fitted: bool,
}

impl SVMRegressor {
    pub fn new(config: SVMConfig) -> Self {
        Self {
            config,
            kernel: None,
            support_vectors: None,
            dual_coef: None,
            bias: 0.0,
            is_fitted: false,
        }
    }

    pub fn config(&self) -> &SVMConfig {
        &self.config
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_xy(x, y)?;
        let n = x.nrows();
        check_kernel_size(n, self.config.max_samples)?;

        let kernel = Kernel::resolve(self.config.kernel, x);
        let mut k = kernel.matrix(x);
        k.mapv_inplace(|v| v + 1.0);

        let c = self.config.c;
        let eps = self.config.epsilon;
        let mut beta: Array1<f64> = Array1::zeros(n);
        // f = K β
        let mut f: Array1<f64> = Array1::zeros(n);

        for _ in 0..self.config.max_iter.max(1) * 5 {
            let mut max_change: f64 = 0.0;
            for i in 0..n {
                let kii = k[[i, i]];
                if kii <= 0.0 {
                    continue;
                }
                let grad = f[i] - y[i];
                let v = beta[i] - grad / kii;
                let t = eps / kii;
                let shrunk = v.signum() * (v.abs() - t).max(0.0);
                let new_beta = shrunk.max(-c).min(c);

                let delta = new_beta - beta[i];
                if delta != 0.0 {
                    f.scaled_add(delta, &k.row(i));
                    beta[i] = new_beta;
                    max_change = max_change.max(delta.abs());
                }
            }
            if max_change < self.config.tol * 1e-2 {
                break;
            }
        }

        let support: Vec<usize> = (0..n).filter(|&i| beta[i].abs() > 1e-10).collect();
        self.bias = support.iter().map(|&i| beta[i]).sum();
        self.support_vectors = Some(x.select(Axis(0), &support));
        self.dual_coef = Some(support.iter().map(|&i| beta[i]).collect());
        self.kernel = Some(kernel);
        self.is_fitted = true;
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (kernel, sv, coef) = match (&self.kernel, &self.support_vectors, &self.dual_coef, self.is_fitted) {
            (Some(k), Some(sv), Some(c), true) => (k, sv, c),
            _ => return Err(MycsvError::ModelNotFitted),
        };
        let predictions: Vec<f64> = x
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|sample| {
                sv.rows()
                    .into_iter()
                    .zip(coef.iter())
                    .map(|(row, b)| b * kernel.eval(row, sample))
                    .sum::<f64>()
                    + self.bias
            })
            .collect();
        Ok(Array1::from_vec(predictions))
    }

    pub fn n_support_vectors(&self) -> usize {
        self.support_vectors.as_ref().map_or(0, |sv| sv.nrows())
    }
}

impl Model for SVMRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        SVMRegressor::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        SVMRegressor::predict(self, x)
    }
}
