//! Model families, hyperparameters and the fitted estimator enum

use super::config::SelectionConfig;
use super::decision_tree::DecisionTree;
use super::knn::{KNNClassifier, KNNConfig, KNNRegressor};
use super::linear_models::{LinearRegression, LogisticRegression};
use super::random_forest::RandomForest;
use super::svm::{KernelType, SVMClassifier, SVMConfig, SVMRegressor};
use crate::error::{MycsvError, Result};
use crate::profiling::TaskKind;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Trait for ML models
pub trait Model: Send + Sync {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Make predictions
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}

/// Common shape checks before fitting
pub(crate) fn check_xy(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(MycsvError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(MycsvError::TrainingError("no training rows".to_string()));
    }
    Ok(())
}

/// Sorted distinct values of a label vector
pub(crate) fn class_labels(y: &Array1<f64>) -> Vec<f64> {
    let mut classes: Vec<f64> = y.iter().copied().collect();
    classes.sort_by(|a, b| a.total_cmp(b));
    classes.dedup();
    classes
}

/// One hyperparameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(usize),
    Float(f64),
    Text(String),
    /// Unbounded / library default
    Null,
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Text(v) => f.write_str(v),
            ParamValue::Null => f.write_str("None"),
        }
    }
}

/// A point of a hyperparameter grid, keyed by parameter name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HyperParams(pub BTreeMap<String, ParamValue>);

impl HyperParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: ParamValue) -> Self {
        self.0.insert(name.to_string(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    /// `Ok(None)` for an absent or `Null` parameter
    pub fn usize_or_none(&self, name: &str) -> Result<Option<usize>> {
        match self.0.get(name) {
            None | Some(ParamValue::Null) => Ok(None),
            Some(ParamValue::Int(v)) => Ok(Some(*v)),
            Some(other) => Err(MycsvError::ConfigError(format!(
                "parameter '{}' expects an integer, got {}",
                name, other
            ))),
        }
    }

    pub fn f64_or(&self, name: &str, default: f64) -> Result<f64> {
        match self.0.get(name) {
            None | Some(ParamValue::Null) => Ok(default),
            Some(ParamValue::Float(v)) => Ok(*v),
            Some(ParamValue::Int(v)) => Ok(*v as f64),
            Some(other) => Err(MycsvError::ConfigError(format!(
                "parameter '{}' expects a number, got {}",
                name, other
            ))),
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.0.get(name) {
            Some(ParamValue::Text(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for HyperParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("defaults");
        }
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        f.write_str(&parts.join(", "))
    }
}

/// Candidate model families, in roster order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFamily {
    LogisticRegression,
    RandomForest,
    Svm,
    DecisionTree,
    KNearestNeighbors,
    LinearRegression,
}

impl ModelFamily {
    /// Evaluation order; earlier families win score ties
    pub const ROSTER: [ModelFamily; 6] = [
        ModelFamily::LogisticRegression,
        ModelFamily::RandomForest,
        ModelFamily::Svm,
        ModelFamily::DecisionTree,
        ModelFamily::KNearestNeighbors,
        ModelFamily::LinearRegression,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ModelFamily::LogisticRegression => "Logistic Regression",
            ModelFamily::RandomForest => "Random Forest",
            ModelFamily::Svm => "SVM",
            ModelFamily::DecisionTree => "Decision Tree",
            ModelFamily::KNearestNeighbors => "K-Nearest Neighbors",
            ModelFamily::LinearRegression => "Linear Regression",
        }
    }

    pub fn supports(&self, kind: TaskKind) -> bool {
        match self {
            ModelFamily::LogisticRegression => kind == TaskKind::Classification,
            ModelFamily::LinearRegression => kind == TaskKind::Regression,
            _ => true,
        }
    }

    /// Hyperparameter axes searched for this family and task
    pub fn param_axes(&self, kind: TaskKind) -> Vec<(String, Vec<ParamValue>)> {
        use ParamValue::*;
        let axis = |name: &str, values: Vec<ParamValue>| (name.to_string(), values);
        match self {
            ModelFamily::LogisticRegression | ModelFamily::LinearRegression => Vec::new(),
            ModelFamily::RandomForest => vec![
                axis("n_estimators", vec![Int(50), Int(100)]),
                axis("max_depth", vec![Null, Int(10)]),
            ],
            ModelFamily::Svm => match kind {
                TaskKind::Classification => vec![
                    axis("C", vec![Float(0.1), Float(1.0), Float(10.0)]),
                    axis("kernel", vec![Text("linear".into()), Text("rbf".into())]),
                ],
                TaskKind::Regression => vec![
                    axis("C", vec![Float(0.1), Float(1.0), Float(10.0)]),
                    axis("epsilon", vec![Float(0.01), Float(0.1), Float(1.0)]),
                ],
            },
            ModelFamily::DecisionTree => vec![axis("max_depth", vec![Null, Int(5), Int(10)])],
            ModelFamily::KNearestNeighbors => vec![axis("n_neighbors", vec![Int(3), Int(5), Int(7)])],
        }
    }

    /// Unfitted estimator for one grid point
    pub fn build(&self, kind: TaskKind, params: &HyperParams, settings: &SelectionConfig) -> Result<Estimator> {
        let classification = kind == TaskKind::Classification;
        let seed = settings.random_state;
        let estimator = match self {
            ModelFamily::LogisticRegression => {
                if !classification {
                    return Err(MycsvError::TrainingError(
                        "logistic regression only handles classification".to_string(),
                    ));
                }
                Estimator::LogisticRegression(LogisticRegression::new())
            }
            ModelFamily::LinearRegression => {
                if classification {
                    return Err(MycsvError::TrainingError(
                        "linear regression only handles regression".to_string(),
                    ));
                }
                Estimator::LinearRegression(LinearRegression::new())
            }
            ModelFamily::RandomForest => {
                let n_estimators = params.usize_or_none("n_estimators")?.unwrap_or(100);
                let forest = if classification {
                    RandomForest::new_classifier(n_estimators)
                } else {
                    RandomForest::new_regressor(n_estimators)
                };
                Estimator::RandomForest(
                    forest
                        .with_max_depth(params.usize_or_none("max_depth")?)
                        .with_random_state(seed),
                )
            }
            ModelFamily::DecisionTree => {
                let tree = if classification {
                    DecisionTree::new_classifier()
                } else {
                    DecisionTree::new_regressor()
                };
                Estimator::DecisionTree(
                    tree.with_max_depth(params.usize_or_none("max_depth")?)
                        .with_random_state(seed),
                )
            }
            ModelFamily::Svm => {
                let kernel = match params.text("kernel") {
                    Some("linear") => KernelType::Linear,
                    None | Some("rbf") => KernelType::RBF { gamma: None },
                    Some(other) => {
                        return Err(MycsvError::ConfigError(format!("unknown kernel '{}'", other)))
                    }
                };
                let config = SVMConfig {
                    c: params.f64_or("C", 1.0)?,
                    epsilon: params.f64_or("epsilon", 0.1)?,
                    kernel,
                    random_state: Some(seed),
                    max_samples: settings.max_svm_rows,
                    ..Default::default()
                };
                if classification {
                    Estimator::SvmClassifier(SVMClassifier::new(config))
                } else {
                    Estimator::SvmRegressor(SVMRegressor::new(config))
                }
            }
            ModelFamily::KNearestNeighbors => {
                let config = KNNConfig {
                    n_neighbors: params.usize_or_none("n_neighbors")?.unwrap_or(5),
                    ..Default::default()
                };
                if classification {
                    Estimator::KnnClassifier(KNNClassifier::new(config))
                } else {
                    Estimator::KnnRegressor(KNNRegressor::new(config))
                }
            }
        };
        Ok(estimator)
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fitted (or fit-ready) estimator of any family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Estimator {
    LogisticRegression(LogisticRegression),
    LinearRegression(LinearRegression),
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
    SvmClassifier(SVMClassifier),
    SvmRegressor(SVMRegressor),
    KnnClassifier(KNNClassifier),
    KnnRegressor(KNNRegressor),
}

impl Estimator {
    fn as_model(&self) -> &dyn Model {
        match self {
            Estimator::LogisticRegression(m) => m,
            Estimator::LinearRegression(m) => m,
            Estimator::DecisionTree(m) => m,
            Estimator::RandomForest(m) => m,
            Estimator::SvmClassifier(m) => m,
            Estimator::SvmRegressor(m) => m,
            Estimator::KnnClassifier(m) => m,
            Estimator::KnnRegressor(m) => m,
        }
    }

    fn as_model_mut(&mut self) -> &mut dyn Model {
        match self {
            Estimator::LogisticRegression(m) => m,
            Estimator::LinearRegression(m) => m,
            Estimator::DecisionTree(m) => m,
            Estimator::RandomForest(m) => m,
            Estimator::SvmClassifier(m) => m,
            Estimator::SvmRegressor(m) => m,
            Estimator::KnnClassifier(m) => m,
            Estimator::KnnRegressor(m) => m,
        }
    }
}

impl Model for Estimator {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.as_model_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.as_model().predict(x)
    }
}

/// Outcome of searching one family
#[derive(Debug, Clone)]
pub struct CandidateResult {
    pub family: ModelFamily,
    /// Best grid point refit on all rows
    pub estimator: Estimator,
    pub params: HyperParams,
    pub score: f64,
}

/// Score summary of one attempted family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyScore {
    pub family: ModelFamily,
    pub params: HyperParams,
    pub score: f64,
}

/// A family that was left out of selection, and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedFamily {
    pub family: ModelFamily,
    pub reason: String,
}

/// The winning candidate plus the scores of every family that trained
#[derive(Debug, Clone)]
pub struct BestCandidate {
    pub family: ModelFamily,
    pub estimator: Estimator,
    pub params: HyperParams,
    pub score: f64,
    pub leaderboard: Vec<FamilyScore>,
    pub skipped: Vec<SkippedFamily>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_roster_support() {
        let classification: Vec<_> = ModelFamily::ROSTER
            .iter()
            .filter(|f| f.supports(TaskKind::Classification))
            .map(|f| f.name())
            .collect();
        assert_eq!(
            classification,
            vec!["Logistic Regression", "Random Forest", "SVM", "Decision Tree", "K-Nearest Neighbors"]
        );
        assert!(!ModelFamily::LogisticRegression.supports(TaskKind::Regression));
        assert!(ModelFamily::LinearRegression.supports(TaskKind::Regression));
    }

    #[test]
    fn test_params_json_shape() {
        let params = HyperParams::new()
            .with("max_depth", ParamValue::Null)
            .with("n_estimators", ParamValue::Int(50));
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(json, r#"{"max_depth":null,"n_estimators":50}"#);

        let back: HyperParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
        assert_eq!(params.to_string(), "max_depth=None, n_estimators=50");
    }

    #[test]
    fn test_build_and_fit_estimator() {
        let params = HyperParams::new().with("max_depth", ParamValue::Int(5));
        let mut estimator = ModelFamily::DecisionTree
            .build(TaskKind::Classification, &params, &SelectionConfig::default())
            .unwrap();
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];
        estimator.fit(&x, &y).unwrap();
        assert_eq!(estimator.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_mismatched_family_rejected() {
        let params = HyperParams::new();
        assert!(ModelFamily::LinearRegression
            .build(TaskKind::Classification, &params, &SelectionConfig::default())
            .is_err());
    }

    #[test]
    fn test_class_labels_sorted() {
        assert_eq!(class_labels(&array![2.0, 0.0, 2.0, 1.0]), vec![0.0, 1.0, 2.0]);
    }
}
