//! Column roles, task inference and dataset summaries
//!
//! A table is profiled once after cleaning; the resulting `ColumnProfile`
//! and `TaskSpec` are threaded through feature transformation and model
//! selection.

mod profiler;
mod summary;
mod task;

pub use profiler::{ColumnInfo, ColumnProfile, ColumnProfiler, ColumnRole};
pub use summary::{pearson, quantile_sorted, CorrelatedPair, DatasetSummary, NumericStats};
pub use task::{TargetVector, TaskInferencer, TaskKind, TaskSpec};
