// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Train-then-report evaluation pipeline
//!
//! Runs, in order:
//! - Optional population load
//! - Training
//! - Metric computation on the held-out test set
//! - Population dump sorted by exploitation fitness
//! - Optional per-instance classification export (failures are recovered)
//! - Optional population save
//! - Metric lines and population statistics

use crate::convert;
use crate::datasets::Instances;
use crate::error::{LoaderError, Result};
use crate::lcs::{
    ClassificationExport, ClassifierSet, ComparisonMode, LearningSystem, SetStatisticsBundle, SortPopulationControl,
};
use crate::settings::Settings;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Pipeline progress; stages only move forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Idle,
    PopulationLoaded,
    Trained,
    Evaluated,
    Reported,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::PopulationLoaded => "population loaded",
            Stage::Trained => "trained",
            Stage::Evaluated => "evaluated",
            Stage::Reported => "reported",
        };
        f.write_str(name)
    }
}

/// Result of the optional classification export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExportOutcome {
    /// No target configured, or nothing to classify
    Skipped,
    Written { path: PathBuf, records: usize },
    /// The export failed; the rest of the report still ran
    Failed { path: PathBuf, error: String },
}

/// Which matrix the metrics were computed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvaluationTarget {
    TestSet,
    /// No test set was loaded
    TrainingSet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEntry {
    pub name: String,
    pub value: f64,
}

/// Everything one pipeline run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub metrics: Vec<MetricEntry>,
    pub evaluated_on: EvaluationTarget,
    pub evaluated_instances: usize,
    pub export: ExportOutcome,
    pub population_loaded_from: Option<PathBuf>,
    pub population_saved_to: Option<PathBuf>,
    pub statistics: SetStatisticsBundle,
}

impl EvaluationReport {
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.iter().find(|m| m.name == name).map(|m| m.value)
    }
}

/// Drives one learning system from training to printed report
pub struct EvaluationPipeline<'a> {
    settings: &'a Settings,
    stage: Stage,
}

impl<'a> EvaluationPipeline<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self {
            settings,
            stage: Stage::Idle,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(next > self.stage, "stage {} cannot follow {}", next, self.stage);
        tracing::info!("Pipeline stage: {} -> {}", self.stage, next);
        self.stage = next;
    }

    /// Run every stage, writing the human-readable report to `out`
    pub fn run<L, W>(&mut self, lcs: &mut L, test_set: Option<&Instances>, out: &mut W) -> Result<EvaluationReport>
    where
        L: LearningSystem + ?Sized,
        W: Write,
    {
        let population_loaded_from = self.load_population(lcs)?;

        lcs.train()?;
        self.advance(Stage::Trained);

        let (test_matrix, evaluated_on) = match test_set {
            Some(set) => {
                if set.is_empty() {
                    tracing::warn!("Test set '{}' is empty; metrics are degenerate", set.relation);
                }
                (convert::to_numeric_matrix(set)?, EvaluationTarget::TestSet)
            }
            None => {
                tracing::warn!("No test set loaded; evaluating on the training instances");
                let train = lcs
                    .instances()
                    .cloned()
                    .ok_or_else(|| LoaderError::Precondition("no training instances to evaluate".to_string()))?;
                (train, EvaluationTarget::TrainingSet)
            }
        };

        let values = lcs.evaluations(&test_matrix)?;
        let names = lcs.evaluation_names();
        if names.len() != values.len() {
            return Err(LoaderError::Evaluation(format!(
                "{} metric names but {} values",
                names.len(),
                values.len()
            )));
        }
        let metrics: Vec<MetricEntry> = names
            .into_iter()
            .zip(values)
            .map(|(name, value)| MetricEntry { name, value })
            .collect();
        self.advance(Stage::Evaluated);

        SortPopulationControl::new(ComparisonMode::Exploitation).control_population(lcs.population_mut());
        lcs.population().print(out).map_err(report_io)?;

        let export = match (&self.settings.test_classification_file, test_set) {
            (Some(path), Some(set)) => self.export_classification(&*lcs, set, path),
            (Some(path), None) => {
                tracing::warn!("No test set to classify; skipping export to {}", path.display());
                ExportOutcome::Skipped
            }
            (None, _) => ExportOutcome::Skipped,
        };

        let population_saved_to = match &self.settings.save_rules_file {
            Some(path) => {
                lcs.population().save(path)?;
                Some(path.clone())
            }
            None => None,
        };

        for metric in &metrics {
            writeln!(out, "{}: {}", metric.name, metric.value).map_err(report_io)?;
        }

        let statistics = SetStatisticsBundle::new(&*lcs, self.settings.number_of_labels);
        writeln!(out, "{}", statistics).map_err(report_io)?;
        out.flush().map_err(report_io)?;
        self.advance(Stage::Reported);

        Ok(EvaluationReport {
            metrics,
            evaluated_on,
            evaluated_instances: test_matrix.nrows(),
            export,
            population_loaded_from,
            population_saved_to,
            statistics,
        })
    }

    fn load_population<L: LearningSystem + ?Sized>(&mut self, lcs: &mut L) -> Result<Option<PathBuf>> {
        let settings = self.settings;
        let Some(path) = &settings.load_rules_file else {
            return Ok(None);
        };
        let control = lcs.population().control();
        let population = ClassifierSet::open(path, control)?;
        lcs.set_population(population);
        self.advance(Stage::PopulationLoaded);
        Ok(Some(path.clone()))
    }

    fn export_classification<L: LearningSystem + ?Sized>(&self, lcs: &L, set: &Instances, path: &Path) -> ExportOutcome {
        let attempt = convert::to_numeric_matrix(set).and_then(|matrix| {
            ClassificationExport::new(matrix, path, self.settings.number_of_labels).produce_classification(lcs)
        });

        match attempt {
            Ok(records) => ExportOutcome::Written {
                path: path.to_path_buf(),
                records,
            },
            Err(e) => {
                tracing::warn!("Classification export to {} failed: {}", path.display(), e);
                ExportOutcome::Failed {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                }
            }
        }
    }
}

fn report_io(e: std::io::Error) -> LoaderError {
    LoaderError::io("<report output>", e)
}

/// Dataset facts recorded alongside a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub relation: String,
    pub source: String,
    pub test_source: Option<String>,
    pub train_instances: usize,
    pub test_instances: Option<usize>,
    pub fold: Option<usize>,
    pub num_folds: Option<usize>,
    pub label_cardinality: f64,
}

/// Complete record of one run, suitable for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub settings: Settings,
    pub dataset: DatasetInfo,
    pub report: EvaluationReport,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl RunSummary {
    pub fn new(settings: &Settings, dataset: DatasetInfo, report: EvaluationReport) -> Self {
        Self {
            settings: settings.clone(),
            dataset,
            report,
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Save as pretty JSON
    pub fn save_json(&self, output_path: &Path) -> Result<()> {
        let parent = output_path.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(parent).map_err(|e| LoaderError::io(parent, e))?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(output_path, json).map_err(|e| LoaderError::io(output_path, e))?;
        tracing::info!("Results saved to {}", output_path.display());
        Ok(())
    }

    /// Generate a markdown report
    pub fn to_markdown(&self) -> String {
        let mut report = String::new();

        report.push_str("# Rule Learner Evaluation Report\n\n");
        report.push_str(&format!("**Generated:** {}\n\n", self.timestamp.format("%Y-%m-%d %H:%M:%S UTC")));
        report.push_str(&format!("**Version:** {}\n\n", self.version));

        report.push_str("## Dataset\n\n");
        report.push_str(&format!("- **Relation:** {}\n", self.dataset.relation));
        report.push_str(&format!("- **Source:** {}\n", self.dataset.source));
        if let Some(test_source) = &self.dataset.test_source {
            report.push_str(&format!("- **Test Source:** {}\n", test_source));
        }
        report.push_str(&format!("- **Train Instances:** {}\n", self.dataset.train_instances));
        match self.dataset.test_instances {
            Some(n) => report.push_str(&format!("- **Test Instances:** {}\n", n)),
            None => report.push_str("- **Test Instances:** none (evaluated on training data)\n"),
        }
        if let (Some(fold), Some(folds)) = (self.dataset.fold, self.dataset.num_folds) {
            report.push_str(&format!("- **Fold:** {} of {}\n", fold + 1, folds));
        }
        report.push_str(&format!("- **Label Cardinality:** {:.4}\n\n", self.dataset.label_cardinality));

        report.push_str("## Metrics\n\n");
        report.push_str("| Metric | Value |\n");
        report.push_str("|--------|-------|\n");
        for metric in &self.report.metrics {
            report.push_str(&format!("| {} | {:.4} |\n", metric.name, metric.value));
        }

        report.push_str("\n## Population\n\n");
        report.push_str(&format!("```\n{}\n```\n\n", self.report.statistics));

        report.push_str("## Outputs\n\n");
        match &self.report.export {
            ExportOutcome::Skipped => report.push_str("- Classification export: skipped\n"),
            ExportOutcome::Written { path, records } => {
                report.push_str(&format!("- Classification export: {} ({} records)\n", path.display(), records))
            }
            ExportOutcome::Failed { path, error } => {
                report.push_str(&format!("- Classification export: FAILED for {} ({})\n", path.display(), error))
            }
        }
        if let Some(path) = &self.report.population_loaded_from {
            report.push_str(&format!("- Population loaded from: {}\n", path.display()));
        }
        if let Some(path) = &self.report.population_saved_to {
            report.push_str(&format!("- Population saved to: {}\n", path.display()));
        }

        report.push_str("\n## Configuration\n\n");
        report.push_str(&format!(
            "```json\n{}\n```\n",
            serde_json::to_string_pretty(&self.settings).unwrap_or_default()
        ));

        report
    }
}
