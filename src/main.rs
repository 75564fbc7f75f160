// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Rule learner evaluation CLI
//!
//! Usage:
//!   lcs-eval data/weather.arff --seed 42
//!   lcs-eval data/train.arff --test data/test.arff --config config/lcs.properties
//!   lcs-eval data/weather.arff --no-test-set --save-rules out/rules.json

use anyhow::{Context, Result};
use clap::Parser;
use lcs_eval::{RunSummary, Settings, SupervisedLcs, TrainTestLoader};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lcs-eval")]
#[command(about = "Train and evaluate a learning classifier system on ARFF data")]
#[command(version)]
struct Args {
    /// Training ARFF file (split into folds unless --test is given)
    train: PathBuf,

    /// Explicit test ARFF file
    #[arg(short, long)]
    test: Option<PathBuf>,

    /// Train on the whole file without carving out a test fold
    #[arg(long, conflicts_with = "test")]
    no_test_set: bool,

    /// Properties file with run settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Random seed for reproducibility
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of cross-validation folds
    #[arg(long)]
    folds: Option<usize>,

    /// Number of label attributes at the end of each instance
    #[arg(long)]
    labels: Option<usize>,

    /// Training passes over the data
    #[arg(long)]
    iterations: Option<usize>,

    /// Maximum total numerosity of the rule population
    #[arg(long)]
    population_size: Option<usize>,

    /// Load a saved population before training
    #[arg(long)]
    load_rules: Option<PathBuf>,

    /// Save the trained population
    #[arg(long)]
    save_rules: Option<PathBuf>,

    /// Write per-instance classifications of the test set as CSV
    #[arg(long)]
    classification: Option<PathBuf>,

    /// Output directory for the run summary
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Summary format (json, markdown, both)
    #[arg(short, long, default_value = "both")]
    format: String,
}

impl Args {
    fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load_from_file(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => Settings::default(),
        };

        if let Some(seed) = self.seed {
            settings.seed = Some(seed);
        }
        if let Some(folds) = self.folds {
            settings.number_of_folds = folds;
        }
        if let Some(labels) = self.labels {
            settings.number_of_labels = labels;
        }
        if let Some(iterations) = self.iterations {
            settings.train_iterations = iterations;
        }
        if let Some(size) = self.population_size {
            settings.population_size = size;
        }
        if self.load_rules.is_some() {
            settings.load_rules_file = self.load_rules.clone();
        }
        if self.save_rules.is_some() {
            settings.save_rules_file = self.save_rules.clone();
        }
        if self.classification.is_some() {
            settings.test_classification_file = self.classification.clone();
        }

        settings.validate().context("Invalid settings")?;
        Ok(settings)
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let settings = args.settings()?;

    tracing::info!("Rule Learner Evaluation");
    tracing::info!("=======================");
    tracing::info!("Train: {}", args.train.display());
    if let Some(test) = &args.test {
        tracing::info!("Test: {}", test.display());
    }
    tracing::info!("Labels: {}, folds: {}", settings.number_of_labels, settings.number_of_folds);
    if let Some(seed) = settings.seed {
        tracing::info!("Seed: {}", seed);
    }

    let mut lcs = SupervisedLcs::new(&settings).context("Failed to create learner")?;
    let mut loader = TrainTestLoader::new(&mut lcs, &settings);

    match &args.test {
        Some(test) => loader
            .load_with_explicit_test_file(&args.train, test)
            .with_context(|| format!("Failed to load {} and {}", args.train.display(), test.display()))?,
        None => loader
            .load_for_cross_validation(&args.train, !args.no_test_set)
            .with_context(|| format!("Failed to load {}", args.train.display()))?,
    }

    let dataset = loader
        .dataset_info()
        .context("Train set missing after load")?;

    let stdout = std::io::stdout();
    let report = loader.evaluate(&mut stdout.lock()).context("Evaluation failed")?;

    let Some(output) = &args.output else {
        return Ok(());
    };

    std::fs::create_dir_all(output)?;
    let stem = args
        .train
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "dataset".to_string());
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let summary = RunSummary::new(&settings, dataset, report);

    if args.format == "json" || args.format == "both" {
        let json_path = output.join(format!("eval_{}_{}.json", stem, timestamp));
        summary.save_json(&json_path)?;
        println!("\nJSON results saved to: {}", json_path.display());
    }

    if args.format == "markdown" || args.format == "both" {
        let md_path = output.join(format!("eval_{}_{}.md", stem, timestamp));
        std::fs::write(&md_path, summary.to_markdown())
            .with_context(|| format!("Failed to write {}", md_path.display()))?;
        println!("Markdown report saved to: {}", md_path.display());
    }

    Ok(())
}
