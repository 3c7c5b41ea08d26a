//! mycsv CLI Module
//!
//! Command-line interface for cleaning, training, prediction and inspection.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::autopipeline::{AutoPipeline, PipelineConfig};
use crate::inference::TrainedArtifact;
use crate::profiling::ColumnProfiler;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "mycsv")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Clean CSV files and train models on them automatically")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean a CSV file
    Clean {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,

        /// Keep only these columns (comma separated)
        #[arg(long, value_delimiter = ',')]
        columns: Option<Vec<String>>,

        /// Restrict date normalization and imputation to these columns
        #[arg(long, value_delimiter = ',')]
        clean_columns: Option<Vec<String>>,

        /// Pipeline configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Train the best model for a target column
    Train {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,

        /// Target column name (defaults to the last column)
        #[arg(short, long)]
        target: Option<String>,

        /// Output artifact file (JSON)
        #[arg(short, long)]
        output: PathBuf,

        /// Keep only these columns (comma separated)
        #[arg(long, value_delimiter = ',')]
        columns: Option<Vec<String>>,

        /// Number of cross-validation folds
        #[arg(long)]
        cv_folds: Option<usize>,

        /// Pipeline configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Make predictions using a trained artifact
    Predict {
        /// Trained artifact file
        #[arg(short, long)]
        model: PathBuf,

        /// Input data file
        #[arg(short, long)]
        data: PathBuf,

        /// Output CSV file with a Predictions column
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show data information
    Info {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,

        /// Number of rows to preview
        #[arg(long, default_value = "5")]
        rows: usize,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    Ok(match path {
        Some(p) => PipelineConfig::from_json_file(p)?,
        None => PipelineConfig::default(),
    })
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_clean(
    data_path: &Path,
    output_path: &Path,
    columns: Option<Vec<String>>,
    clean_columns: Option<Vec<String>>,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    section("Clean");

    let mut config = load_config(config_path)?;
    if let Some(cols) = columns {
        config.cleaning = config.cleaning.with_columns(cols);
    }
    if let Some(cols) = clean_columns {
        config.cleaning = config.cleaning.with_columns_to_clean(cols);
    }

    let bytes = std::fs::read(data_path)?;
    step_run("Cleaning");
    let start = Instant::now();
    let (csv, report) = AutoPipeline::new(config).clean_bytes(&bytes)?;
    step_done(&format!("{:?}", start.elapsed()));

    std::fs::write(output_path, csv)?;

    println!();
    println!("  {:<22} {} → {}", muted("Rows"), report.rows_in, report.rows_out.to_string().white().bold());
    println!("  {:<22} {} → {}", muted("Columns"), report.columns_in, report.columns_out.to_string().white().bold());
    println!("  {:<22} {}", muted("Duplicates removed"), report.duplicates_removed);
    if !report.date_columns.is_empty() {
        println!("  {:<22} {}", muted("Date columns"), report.date_columns.join(", "));
        println!("  {:<22} {}", muted("Rows with bad dates"), report.rows_dropped_by_dates);
    }
    if !report.dropped_columns.is_empty() {
        println!("  {:<22} {}", muted("Sparse columns"), report.dropped_columns.join(", ").yellow());
    }
    println!("  {:<22} {}", muted("Sparse rows dropped"), report.rows_dropped_missing);
    for (column, cells) in &report.imputed_cells {
        println!("  {:<22} {} cells", muted(&format!("Imputed {}", column)), cells);
    }
    println!("  {:<22} {}", muted("Saved"), output_path.display());
    println!();

    Ok(())
}

pub fn cmd_train(
    data_path: &Path,
    target: Option<String>,
    output_path: &Path,
    columns: Option<Vec<String>>,
    cv_folds: Option<usize>,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    section("Train");

    let mut config = load_config(config_path)?;
    if let Some(t) = target {
        config.target = Some(t);
    }
    if let Some(cols) = columns {
        config.cleaning = config.cleaning.with_columns(cols);
    }
    if let Some(k) = cv_folds {
        config.selection = config.selection.with_cv_folds(k);
    }

    let bytes = std::fs::read(data_path)?;
    step_run("Searching models");
    let outcome = AutoPipeline::new(config).train_bytes(&bytes)?;
    step_done(&format!("{:.2}s", outcome.duration_secs));

    step_run(&format!("Saving → {}", output_path.display()));
    outcome.artifact.save(output_path)?;
    step_done("");

    let meta = &outcome.artifact.metadata;
    println!();
    println!("  {:<16} {}", muted("Target"), meta.target);
    println!("  {:<16} {}", muted("Task"), meta.task);
    println!("  {:<16} {}", muted("Rows"), meta.n_training_rows);
    println!("  {:<16} {}", muted("Features"), meta.feature_columns.join(", "));

    println!();
    println!("  {:<24} {:>10} {}", muted("Model"), muted("Score"), muted("Params"));
    println!("  {}", dim(&"─".repeat(56)));
    for entry in &meta.leaderboard {
        println!("  {:<24} {:>10.4} {}", entry.family.name(), entry.score, dim(&entry.params.to_string()));
    }
    for entry in &meta.skipped {
        println!("  {:<24} {:>10} {}", entry.family.name(), muted("skipped"), dim(&entry.reason));
    }
    println!("  {}", dim(&"─".repeat(56)));
    println!();
    println!("  {} {} {} {:.4}", ok("best"), meta.family_name.white().bold(), muted("score:"), meta.score);
    println!();

    Ok(())
}

pub fn cmd_predict(model_path: &Path, data_path: &Path, output_path: &Path) -> anyhow::Result<()> {
    section("Predict");

    step_run("Loading artifact");
    let artifact = TrainedArtifact::load(model_path)?;
    step_done(&format!("{} for '{}'", artifact.metadata.family_name, artifact.metadata.target));

    let bytes = std::fs::read(data_path)?;
    step_run("Predicting");
    let start = Instant::now();
    let pipeline = AutoPipeline::new(PipelineConfig::default().with_cleaning(artifact.cleaning.clone()));
    let csv = pipeline.predict_bytes(&bytes, &artifact)?;
    step_done(&format!("{:?}", start.elapsed()));

    std::fs::write(output_path, csv)?;
    println!("  {:<12} {}", muted("Saved"), output_path.display());
    println!();
    Ok(())
}

pub fn cmd_info(data_path: &Path, rows: usize) -> anyhow::Result<()> {
    section("Data Info");

    let bytes = std::fs::read(data_path)?;
    let pipeline = AutoPipeline::default();
    let df = pipeline.read(&bytes)?;
    let profile = ColumnProfiler::new().profile(&df)?;

    println!("  {:<12} {}", muted("File"), data_path.display());
    println!("  {:<12} {}", muted("Rows"), df.height());
    println!("  {:<12} {}", muted("Columns"), df.width());
    println!();

    println!("  {:<20} {:<12} {:>6} {:>8}", muted("Column"), muted("Role"), muted("Nulls"), muted("Unique"));
    println!("  {}", dim(&"─".repeat(50)));
    for info in &profile.columns {
        println!(
            "  {:<20} {:<12} {:>6} {:>8}",
            info.name,
            info.role.to_string().truecolor(140, 140, 140),
            info.n_missing,
            info.n_unique
        );
    }

    if rows > 0 {
        section("Preview");
        println!("{}", df.head(Some(rows)));
    }

    section("Summary (cleaned)");
    let summary = pipeline.summarize_bytes(&bytes)?;
    println!("{}", summary);
    Ok(())
}
