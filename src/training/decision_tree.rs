//! Decision tree implementation

use super::models::{check_xy, class_labels, Model};
use crate::error::{MycsvError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Criterion {
    /// Gini impurity (classification)
    Gini,
    /// Entropy (classification)
    Entropy,
    /// Mean squared error (regression)
    MSE,
}

/// Running target statistics of one side of a split
#[derive(Debug, Clone)]
struct NodeStats {
    count: usize,
    sum: f64,
    sq_sum: f64,
    class_counts: Vec<usize>,
}

impl NodeStats {
    fn new(n_classes: usize) -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sq_sum: 0.0,
            class_counts: vec![0; n_classes],
        }
    }

    fn add(&mut self, y: f64, label: Option<usize>) {
        self.count += 1;
        self.sum += y;
        self.sq_sum += y * y;
        if let Some(k) = label {
            self.class_counts[k] += 1;
        }
    }

    fn remove(&mut self, y: f64, label: Option<usize>) {
        self.count -= 1;
        self.sum -= y;
        self.sq_sum -= y * y;
        if let Some(k) = label {
            self.class_counts[k] -= 1;
        }
    }

    fn impurity(&self, criterion: Criterion) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        match criterion {
            Criterion::Gini => {
                1.0 - self
                    .class_counts
                    .iter()
                    .map(|&c| (c as f64 / n).powi(2))
                    .sum::<f64>()
            }
            Criterion::Entropy => -self
                .class_counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    p * p.ln()
                })
                .sum::<f64>(),
            // Var = E[X²] - E[X]²
            Criterion::MSE => (self.sq_sum / n - (self.sum / n).powi(2)).max(0.0),
        }
    }
}

/// Read-only inputs shared by the recursive build
struct BuildContext<'a> {
    x: &'a Array2<f64>,
    y: &'a Array1<f64>,
    /// class index per row (classification only)
    labels: Option<&'a [usize]>,
    n_classes: usize,
}

impl BuildContext<'_> {
    fn label(&self, i: usize) -> Option<usize> {
        self.labels.map(|l| l[i])
    }

    fn stats(&self, indices: &[usize]) -> NodeStats {
        let mut stats = NodeStats::new(self.n_classes);
        for &i in indices {
            stats.add(self.y[i], self.label(i));
        }
        stats
    }
}

/// CART decision tree for classification (class indices as f64) or
/// regression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features drawn at random per split; all features when `None`
    pub max_features: Option<usize>,
    pub random_state: Option<u64>,
    pub criterion: Criterion,
    n_features: usize,
    is_classification: bool,
    classes: Vec<f64>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_classifier()
    }
}

impl DecisionTree {
    pub fn new_classifier() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            random_state: None,
            criterion: Criterion::Gini,
            n_features: 0,
            is_classification: true,
            classes: Vec::new(),
        }
    }

    pub fn new_regressor() -> Self {
        Self {
            criterion: Criterion::MSE,
            is_classification: false,
            ..Self::new_classifier()
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_xy(x, y)?;
        self.n_features = x.ncols();

        let labels: Option<Vec<usize>> = if self.is_classification {
            self.classes = class_labels(y);
            Some(
                y.iter()
                    .map(|v| self.classes.binary_search_by(|c| c.total_cmp(v)).unwrap_or(0))
                    .collect(),
            )
        } else {
            None
        };

        let ctx = BuildContext {
            x,
            y,
            labels: labels.as_deref(),
            n_classes: self.classes.len(),
        };
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(0));
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.root = Some(self.build_tree(&ctx, &indices, 0, &mut rng));
        Ok(self)
    }

    fn build_tree(&self, ctx: &BuildContext<'_>, indices: &[usize], depth: usize, rng: &mut ChaCha8Rng) -> TreeNode {
        let n_samples = indices.len();
        let stats = ctx.stats(indices);
        let impurity = stats.impurity(self.criterion);

        let should_stop = n_samples < self.min_samples_split
            || n_samples <= self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || impurity <= 1e-12;

        let leaf = || TreeNode::Leaf {
            value: self.leaf_value(&stats),
            n_samples,
        };
        if should_stop {
            return leaf();
        }

        let Some((feature_idx, threshold)) = self.find_best_split(ctx, indices, &stats, impurity, rng) else {
            return leaf();
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| ctx.x[[i, feature_idx]] <= threshold);
        if left_indices.is_empty() || right_indices.is_empty() {
            return leaf();
        }

        let left = Box::new(self.build_tree(ctx, &left_indices, depth + 1, rng));
        let right = Box::new(self.build_tree(ctx, &right_indices, depth + 1, rng));
        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            n_samples,
            impurity,
        }
    }

    /// Best `(feature, threshold)` by impurity decrease. Thresholds are
    /// midpoints between consecutive distinct values; on equal gain the
    /// lower feature index wins.
    fn find_best_split(
        &self,
        ctx: &BuildContext<'_>,
        indices: &[usize],
        parent: &NodeStats,
        parent_impurity: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<(usize, f64)> {
        let n_features = ctx.x.ncols();
        let mut candidates: Vec<usize> = match self.max_features {
            Some(m) if m < n_features => rand::seq::index::sample(rng, n_features, m.max(1)).into_vec(),
            _ => (0..n_features).collect(),
        };
        candidates.sort_unstable();

        let n = indices.len() as f64;
        let per_feature: Vec<Option<(usize, f64, f64)>> = candidates
            .par_iter()
            .map(|&feature_idx| {
                let mut order = indices.to_vec();
                order.sort_by(|&a, &b| ctx.x[[a, feature_idx]].total_cmp(&ctx.x[[b, feature_idx]]));

                let mut left = NodeStats::new(ctx.n_classes);
                let mut right = parent.clone();
                let mut best: Option<(f64, f64)> = None;

                for pos in 0..order.len().saturating_sub(1) {
                    let i = order[pos];
                    left.add(ctx.y[i], ctx.label(i));
                    right.remove(ctx.y[i], ctx.label(i));

                    let value = ctx.x[[i, feature_idx]];
                    let next = ctx.x[[order[pos + 1], feature_idx]];
                    if value == next {
                        continue;
                    }
                    if left.count < self.min_samples_leaf || right.count < self.min_samples_leaf {
                        continue;
                    }

                    let weighted = (left.count as f64 * left.impurity(self.criterion)
                        + right.count as f64 * right.impurity(self.criterion))
                        / n;
                    let gain = parent_impurity - weighted;
                    if gain > 1e-12 && best.map_or(true, |(g, _)| gain > g) {
                        best = Some((gain, (value + next) / 2.0));
                    }
                }
                best.map(|(gain, threshold)| (feature_idx, threshold, gain))
            })
            .collect();

        per_feature
            .into_iter()
            .flatten()
            .fold(None, |acc: Option<(usize, f64, f64)>, cand| match acc {
                Some(a) if a.2 >= cand.2 => Some(a),
                _ => Some(cand),
            })
            .map(|(feature, threshold, _)| (feature, threshold))
    }

    /// Majority class (ties to the smallest) or mean
    fn leaf_value(&self, stats: &NodeStats) -> f64 {
        if self.is_classification {
            let mut best = 0;
            for (k, &c) in stats.class_counts.iter().enumerate() {
                if c > stats.class_counts[best] {
                    best = k;
                }
            }
            self.classes.get(best).copied().unwrap_or(0.0)
        } else if stats.count == 0 {
            0.0
        } else {
            stats.sum / stats.count as f64
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(MycsvError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(MycsvError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.rows().into_iter().map(|row| Self::predict_sample(root, row)).collect())
    }

    fn predict_sample(mut node: &TreeNode, sample: ArrayView1<'_, f64>) -> f64 {
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if sample[*feature_idx] <= *threshold { left } else { right };
                }
            }
        }
    }

    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    pub fn get_n_leaves(&self) -> usize {
        fn leaves(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => leaves(left) + leaves(right),
            }
        }
        self.root.as_ref().map_or(0, leaves)
    }

    pub fn classes(&self) -> &[f64] {
        &self.classes
    }
}

impl Model for DecisionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        DecisionTree::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        DecisionTree::predict(self, x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classifier_simple() {
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_classifier();
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.predict(&x).unwrap(), y);
        assert_eq!(tree.get_n_leaves(), 2);
    }

    #[test]
    fn test_regressor_simple() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0];

        let mut tree = DecisionTree::new_regressor();
        tree.fit(&x, &y).unwrap();

        let predictions = tree.predict(&x).unwrap();
        let mse: f64 = predictions
            .iter()
            .zip(y.iter())
            .map(|(p, a)| (p - a).powi(2))
            .sum::<f64>()
            / y.len() as f64;
        assert!(mse < 1e-12, "MSE too high: {}", mse);
    }

    #[test]
    fn test_max_depth() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0]];
        let y = array![1.0, 5.0, 2.0, 7.0, 3.0, 8.0, 4.0, 9.0];

        let mut tree = DecisionTree::new_regressor().with_max_depth(Some(2));
        tree.fit(&x, &y).unwrap();
        // depth counts levels of nodes, so two split levels give three
        assert!(tree.get_depth() <= 3);
    }

    #[test]
    fn test_midpoint_threshold() {
        let x = array![[1.0], [3.0]];
        let y = array![0.0, 1.0];
        let mut tree = DecisionTree::new_classifier();
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.predict(&array![[1.9], [2.1]]).unwrap(), array![0.0, 1.0]);
    }

    #[test]
    fn test_multiclass_labels_preserved() {
        let x = array![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![2.0, 2.0, 0.0, 0.0, 1.0, 1.0];
        let mut tree = DecisionTree::new_classifier().with_criterion(Criterion::Entropy);
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.classes(), &[0.0, 1.0, 2.0]);
        assert_eq!(tree.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_feature_subset_is_seeded() {
        let x = array![
            [1.0, 5.0, 0.3], [2.0, 4.0, 0.1], [3.0, 3.0, 0.7],
            [4.0, 2.0, 0.2], [5.0, 1.0, 0.9], [6.0, 0.0, 0.4]
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let fit = || {
            let mut tree = DecisionTree::new_classifier()
                .with_max_features(Some(1))
                .with_random_state(7);
            tree.fit(&x, &y).unwrap();
            tree.predict(&x).unwrap()
        };
        assert_eq!(fit(), fit());
    }

    #[test]
    fn test_predict_unfitted() {
        let tree = DecisionTree::new_regressor();
        assert!(tree.predict(&array![[1.0]]).is_err());
    }
}
