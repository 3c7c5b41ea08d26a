//! Feature preprocessing
//!
//! Provides the transformations between a cleaned table and the numeric
//! matrices the estimators consume:
//! - Standard scaling of continuous columns and of the regression target
//! - One-hot encoding of discrete columns
//! - Label encoding of classification targets
//! - The fitted `FeatureTransformer` replayed at inference time

mod encoder;
mod scaler;
mod transformer;

pub use encoder::{LabelEncoder, OneHotEncoder};
pub use scaler::{Scaler, ScalerParams, TargetScaler};
pub use transformer::{FeatureSpec, FeatureTransformer};
