//! Cleaning pipeline
//!
//! Runs a fixed sequence of steps over a table: deduplication, optional
//! column restriction, date detection and normalization, sparse column and
//! row pruning, then median/mode imputation. Later steps depend on the
//! column set left by earlier ones, so the order is part of the contract.

mod cleaner;
mod config;
pub mod dates;
mod imputer;

pub use cleaner::{CleaningOutcome, CleaningReport, DataCleaner};
pub use config::CleaningConfig;
pub use imputer::{median, most_frequent, ImputeStrategy, ImputeValue, Imputer};
