//! K-Nearest Neighbors implementation
//!
//! KNN classifier and regressor with distance metrics.

use super::models::{check_xy, class_labels, Model};
use crate::error::{MycsvError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Distance metric for KNN
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// L2
    #[default]
    Euclidean,
    /// L1
    Manhattan,
}

/// Weighting scheme for neighbors
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum WeightScheme {
    #[default]
    Uniform,
    /// Inverse distance
    Distance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNConfig {
    pub n_neighbors: usize,
    pub metric: DistanceMetric,
    pub weights: WeightScheme,
}

impl Default for KNNConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            metric: DistanceMetric::Euclidean,
            weights: WeightScheme::Uniform,
        }
    }
}

/// Stored training set shared by both estimators
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrainingSet {
    x: Array2<f64>,
    y: Array1<f64>,
}

impl TrainingSet {
    /// `(distance, label)` of the k nearest rows. Equal distances keep the
    /// earlier training row.
    fn k_nearest(&self, point: ArrayView1<'_, f64>, k: usize, metric: DistanceMetric) -> Vec<(f64, f64)> {
        let k = k.min(self.x.nrows()).max(1);
        let mut heap = BinaryHeap::with_capacity(k + 1);

        for (i, row) in self.x.rows().into_iter().enumerate() {
            let entry = Neighbor {
                dist: compute_distance(point, row, metric),
                index: i,
            };
            if heap.len() < k {
                heap.push(entry);
            } else if heap.peek().map_or(false, |top| entry < *top) {
                heap.pop();
                heap.push(entry);
            }
        }

        heap.into_sorted_vec()
            .into_iter()
            .map(|n| (n.dist, self.y[n.index]))
            .collect()
    }
}

/// Max-heap entry ordered by `(dist, index)`
#[derive(Debug, PartialEq)]
struct Neighbor {
    dist: f64,
    index: usize,
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist.total_cmp(&other.dist).then(self.index.cmp(&other.index))
    }
}

fn compute_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>, metric: DistanceMetric) -> f64 {
    match metric {
        DistanceMetric::Euclidean => a
            .iter()
            .zip(b.iter())
            .map(|(ai, bi)| (ai - bi) * (ai - bi))
            .sum::<f64>()
            .sqrt(),
        DistanceMetric::Manhattan => a.iter().zip(b.iter()).map(|(ai, bi)| (ai - bi).abs()).sum(),
    }
}

fn neighbor_weight(dist: f64, weights: WeightScheme) -> f64 {
    match weights {
        WeightScheme::Uniform => 1.0,
        WeightScheme::Distance => 1.0 / dist.max(1e-12),
    }
}

fn check_features(train: &TrainingSet, x: &Array2<f64>) -> Result<()> {
    if x.ncols() != train.x.ncols() {
        return Err(MycsvError::ShapeError {
            expected: format!("{} features", train.x.ncols()),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}

/// K-Nearest Neighbors Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNClassifier {
    config: KNNConfig,
    train: Option<TrainingSet>,
    classes: Vec<f64>,
}

impl KNNClassifier {
    pub fn new(config: KNNConfig) -> Self {
        Self {
            config,
            train: None,
            classes: Vec::new(),
        }
    }

    pub fn with_k(k: usize) -> Self {
        Self::new(KNNConfig {
            n_neighbors: k,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &KNNConfig {
        &self.config
    }

    /// Stores the training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_xy(x, y)?;
        if self.config.n_neighbors == 0 {
            return Err(MycsvError::InvalidInput("n_neighbors must be positive".to_string()));
        }
        self.classes = class_labels(y);
        self.train = Some(TrainingSet {
            x: x.clone(),
            y: y.clone(),
        });
        Ok(self)
    }

    /// Neighbor vote shares, one column per class in sorted order
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let train = self.train.as_ref().ok_or(MycsvError::ModelNotFitted)?;
        check_features(train, x)?;
        let n_classes = self.classes.len();

        let rows: Vec<Vec<f64>> = x
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|row| {
                let mut votes = vec![0.0; n_classes];
                for (dist, label) in train.k_nearest(row, self.config.n_neighbors, self.config.metric) {
                    if let Ok(k) = self.classes.binary_search_by(|c| c.total_cmp(&label)) {
                        votes[k] += neighbor_weight(dist, self.config.weights);
                    }
                }
                let total: f64 = votes.iter().sum();
                if total > 0.0 {
                    votes.iter_mut().for_each(|v| *v /= total);
                }
                votes
            })
            .collect();

        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        Ok(Array2::from_shape_vec((x.nrows(), n_classes), flat)?)
    }

    /// Majority vote; ties go to the smallest class
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| {
                let mut best = 0;
                for (k, &p) in row.iter().enumerate() {
                    if p > row[best] {
                        best = k;
                    }
                }
                self.classes[best]
            })
            .collect())
    }
}

impl Model for KNNClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        KNNClassifier::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        KNNClassifier::predict(self, x)
    }
}

/// K-Nearest Neighbors Regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNRegressor {
    config: KNNConfig,
    train: Option<TrainingSet>,
}

impl KNNRegressor {
    pub fn new(config: KNNConfig) -> Self {
        Self { config, train: None }
    }

    pub fn with_k(k: usize) -> Self {
        Self::new(KNNConfig {
            n_neighbors: k,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &KNNConfig {
        &self.config
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_xy(x, y)?;
        if self.config.n_neighbors == 0 {
            return Err(MycsvError::InvalidInput("n_neighbors must be positive".to_string()));
        }
        self.train = Some(TrainingSet {
            x: x.clone(),
            y: y.clone(),
        });
        Ok(self)
    }

    /// Weighted mean of the neighbors' targets
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let train = self.train.as_ref().ok_or(MycsvError::ModelNotFitted)?;
        check_features(train, x)?;

        let predictions: Vec<f64> = x
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|row| {
                let neighbors = train.k_nearest(row, self.config.n_neighbors, self.config.metric);
                let (sum, weight) = neighbors.iter().fold((0.0, 0.0), |(s, w), &(dist, value)| {
                    let wi = neighbor_weight(dist, self.config.weights);
                    (s + wi * value, w + wi)
                });
                if weight > 0.0 {
                    sum / weight
                } else {
                    0.0
                }
            })
            .collect();
        Ok(Array1::from_vec(predictions))
    }
}

impl Model for KNNRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        KNNRegressor::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        KNNRegressor::predict(self, x)
    }
}
