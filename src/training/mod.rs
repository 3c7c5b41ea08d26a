//! Model training and selection
//!
//! Estimators for the candidate roster:
//! - Logistic and linear regression
//! - Decision trees and Random Forests
//! - Support Vector Machines (SMO classifier, kernel SVR)
//! - K-Nearest Neighbors
//!
//! [`ModelSelector`] grid-searches each applicable family with
//! cross-validation and returns the best refit candidate.

mod config;
mod models;
pub mod cross_validation;
pub mod grid_search;
pub mod metrics;
pub mod selector;
pub mod linear_models;
pub mod decision_tree;
pub mod random_forest;
pub mod knn;
pub mod svm;

pub use config::SelectionConfig;
pub use models::{
    BestCandidate, CandidateResult, Estimator, FamilyScore, HyperParams, Model, ModelFamily, ParamValue, SkippedFamily,
};
pub use cross_validation::{CVResults, CVSplit, CVStrategy, CrossValidator};
pub use grid_search::{GridPointResult, GridSearch, GridSearchOutcome, ParamGrid};
pub use metrics::Scoring;
pub use selector::ModelSelector;
pub use linear_models::{LinearRegression, LogisticRegression};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use random_forest::{MaxFeatures, RandomForest};
pub use knn::{DistanceMetric, KNNClassifier, KNNConfig, KNNRegressor, WeightScheme};
pub use svm::{KernelType, SVMClassifier, SVMConfig, SVMRegressor};
