//! Loanfund CLI Module
//!
//! Command-line interface for inspecting loan data, engineering features,
//! comparing models, and training / scoring with a saved bundle.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::data::{DataLoader, DataSaver, DatasetSummary, LoanRecord};
use crate::features::{FeatureEngineer, UnseenCategoryPolicy};
use crate::pipeline::{ModelBundle, Pipeline, PipelineReport};
use crate::training::ModelKind;

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

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
#[command(name = "loanfund")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Predict whether microfinance loan requests get funded")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show shape, status counts and rows lost to missing fields
    Info {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,
    },

    /// Write the engineered feature table to CSV
    Features {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Cross-validate and holdout-evaluate every configured model
    Compare {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// JSON pipeline configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of cross-validation folds
        #[arg(long)]
        folds: Option<usize>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Use class-preserving folds
        #[arg(long)]
        stratified: bool,

        /// Unseen category policy (reject, zero_fill, unknown_bucket)
        #[arg(long)]
        unseen: Option<UnseenCategoryPolicy>,

        /// Write the full report as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Train one model and save it with its feature vocabulary
    Train {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Model (logistic_regression, decision_tree, random_forest, gradient_boosting)
        #[arg(short, long, default_value = "random_forest")]
        model: ModelKind,

        /// JSON pipeline configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Unseen category policy (reject, zero_fill, unknown_bucket)
        #[arg(long)]
        unseen: Option<UnseenCategoryPolicy>,

        /// Output bundle file (JSON)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Score a CSV with a trained bundle
    Predict {
        /// Trained bundle file
        #[arg(short, long)]
        model: PathBuf,

        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Output predictions CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

// ─── Shared helpers ────────────────────────────────────────────────────────────

fn load_records(path: &Path, labeled: bool) -> anyhow::Result<Vec<LoanRecord>> {
    step_run("Loading data");
    let start = Instant::now();
    let df = DataLoader::new().load_csv(path)?;
    let records = if labeled {
        LoanRecord::from_frame(&df)?
    } else {
        LoanRecord::from_frame_unlabeled(&df)?
    };
    step_done(&format!("{} rows × {} cols in {:.2?}", df.height(), df.width(), start.elapsed()));
    Ok(records)
}

/// Config file (or defaults) with command-line overrides applied
pub fn resolve_config(
    path: Option<&Path>,
    folds: Option<usize>,
    seed: Option<u64>,
    stratified: bool,
    unseen: Option<UnseenCategoryPolicy>,
) -> anyhow::Result<PipelineConfig> {
    let mut config = match path {
        Some(p) => PipelineConfig::from_file(p)?,
        None => PipelineConfig::default(),
    };
    if let Some(k) = folds {
        config = config.with_cv_folds(k);
    }
    if let Some(s) = seed {
        config = config.with_seed(s);
    }
    if stratified {
        config = config.with_stratified_folds(true);
    }
    if let Some(policy) = unseen {
        config = config.with_unseen_category_policy(policy);
    }
    config.validate()?;
    Ok(config)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_info(data_path: &Path) -> anyhow::Result<()> {
    section("Data Info");

    let df = DataLoader::new().load_csv(data_path)?;
    let summary = DatasetSummary::from_frame(&df)?;

    println!("  {:<12} {}", muted("File"), data_path.display());
    println!("  {:<12} {}", muted("Rows"), summary.n_rows);
    println!("  {:<12} {}", muted("Columns"), summary.n_cols);
    println!("  {:<12} {:.1}%", muted("Funded"), summary.funded_rate() * 100.0);
    println!();

    println!("  {:<20} {:>8}", muted("Status"), muted("Count"));
    println!("  {}", dim(&"─".repeat(30)));
    for (status, count) in &summary.status_counts {
        println!("  {:<20} {:>8}", status, count);
    }

    println!();
    let engineered = LoanRecord::from_frame(&df).and_then(|records| {
        FeatureEngineer::new(UnseenCategoryPolicy::default()).fit_transform(&records)
    });
    match engineered {
        Ok(features) => {
            println!("  {:<12} {}", muted("Complete"), features.n_rows());
            println!("  {:<12} {}", muted("Dropped"), features.n_dropped);
            println!("  {:<12} {}", muted("Features"), features.n_features());
        }
        // Diagnostic command: report and keep going
        Err(e) => {
            println!("  {:<12} {}", muted("Engineering"), format!("failed: {}", e).red());
        }
    }
    println!();
    Ok(())
}

pub fn cmd_features(data_path: &Path, output_path: &Path) -> anyhow::Result<()> {
    section("Features");

    let records = load_records(data_path, true)?;

    step_run("Engineering");
    let start = Instant::now();
    let features = FeatureEngineer::new(UnseenCategoryPolicy::default()).fit_transform(&records)?;
    step_done(&format!(
        "{} rows × {} features, {} dropped in {:.2?}",
        features.n_rows(),
        features.n_features(),
        features.n_dropped,
        start.elapsed()
    ));

    step_run(&format!("Saving → {}", output_path.display()));
    let mut df = features.to_dataframe()?;
    DataSaver::save_csv(&mut df, output_path)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    println!();
    Ok(())
}

pub fn cmd_compare(
    data_path: &Path,
    config: PipelineConfig,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    section("Compare");

    let records = load_records(data_path, true)?;
    let pipeline = Pipeline::new(config)?;

    step_run(&format!(
        "Running {} models × {} folds",
        pipeline.config().models.len(),
        pipeline.config().cv_folds
    ));
    let start = Instant::now();
    let report = pipeline.run(&records)?;
    step_done(&format!("{:.2?}", start.elapsed()));

    print_report(&report);

    if let Some(path) = output {
        report.save(path)?;
        step_ok(&format!("Report written to {}", path.display()));
    }

    println!();
    Ok(())
}

fn print_report(report: &PipelineReport) {
    let s = &report.summary;
    println!();
    println!("  {:<12} {} ({} dropped)", muted("Rows"), s.n_rows, s.n_dropped);
    println!("  {:<12} {} / {}", muted("Train/hold"), s.n_train, s.n_holdout);
    println!("  {:<12} {}", muted("Features"), s.n_features);

    println!();
    println!(
        "  {:<22} {:>16} {:>8} {:>9} {:>8}",
        muted("Model"),
        muted("CV accuracy"),
        muted("AUC"),
        muted("Accuracy"),
        muted("Time")
    );
    println!("  {}", dim(&"─".repeat(67)));
    for m in &report.models {
        println!(
            "  {:<22} {:>9.4} ± {:.3} {:>8.4} {:>9.4} {:>7.2}s",
            m.name,
            m.cv.mean_score,
            m.cv.std_score,
            m.holdout.auc,
            m.holdout.metrics.accuracy,
            m.training_time_secs
        );
    }
    println!("  {}", dim(&"─".repeat(67)));

    let Some(best) = report.best_by_auc() else {
        return;
    };

    println!();
    line_box_top();
    line_box_center(&format!("{}", "Best holdout AUC".white().bold()));
    line_box_sep();
    line_box(&kv("Model   ", &best.name));
    line_box(&kv("AUC     ", &format!("{:.4}", best.holdout.auc)));
    line_box(&kv("Recall  ", &format!("{:.4}", best.holdout.metrics.recall)));
    line_box(&kv("F1      ", &format!("{:.4}", best.holdout.metrics.f1_score)));
    if !best.top_features.is_empty() {
        line_box_sep();
        for (name, importance) in best.top_features.iter().take(5) {
            line_box(&kv(&format!("{:<36}", name), &format!("{:.4}", importance)));
        }
    }
    line_box_bottom();

    if let Some(curve) = &best.learning_curve {
        section("Learning curve");
        println!("  {:>8} {:>10} {:>10}", muted("Rows"), muted("Train"), muted("Test"));
        for p in &curve.points {
            println!("  {:>8} {:>10.4} {:>10.4}", p.n_train, p.train_mean, p.test_mean);
        }
    }
}

pub fn cmd_train(
    data_path: &Path,
    kind: ModelKind,
    config: PipelineConfig,
    output: &Path,
) -> anyhow::Result<()> {
    section("Train");

    let records = load_records(data_path, true)?;
    let pipeline = Pipeline::new(config)?;

    step_run(&format!("Training {}", kind.name().cyan()));
    let start = Instant::now();
    let bundle = pipeline.train(&records, kind)?;
    step_done(&format!("{:.2?}", start.elapsed()));

    if let Some(eval) = &bundle.evaluation {
        println!();
        println!("  {:<16} {}", muted("Holdout AUC"), format!("{:.4}", eval.auc).white().bold());
        println!("  {:<16} {}", muted("Accuracy"), format!("{:.4}", eval.metrics.accuracy).white());
        println!("  {:<16} {}", muted("Features"), bundle.feature_names.len());
        println!();
    }

    bundle.save(output)?;
    step_ok(&format!("Bundle written to {}", output.display()));
    println!();
    Ok(())
}

pub fn cmd_predict(
    model_path: &Path,
    data_path: &Path,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    section("Predict");

    step_run("Loading model");
    let bundle = ModelBundle::load(model_path)?;
    step_done(bundle.model.kind().name());

    let records = load_records(data_path, false)?;

    step_run("Scoring");
    let predictions = bundle.predict(&records)?;
    let n_funded = predictions.probabilities.iter().filter(|&&p| p >= 0.5).count();
    step_done(&format!(
        "{} scored, {} predicted funded, {} dropped",
        predictions.len(),
        n_funded,
        predictions.n_dropped
    ));

    let mut df = predictions.to_dataframe()?;
    match output {
        Some(path) => {
            DataSaver::save_csv(&mut df, path)?;
            step_ok(&format!("Predictions written to {}", path.display()));
        }
        None => {
            println!();
            println!("{}", df.head(Some(10)));
        }
    }

    println!();
    Ok(())
}
