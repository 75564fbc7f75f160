// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Learning classifier system seam
//!
//! The loader and the evaluation pipeline only talk to a learner through
//! [`LearningSystem`]. [`SupervisedLcs`] is the bundled rule learner.

pub mod classifier;
pub mod export;
pub mod population;
pub mod statistics;
pub mod supervised;

pub use classifier::{Classifier, ComparisonMode, Condition, Macroclassifier};
pub use export::ClassificationExport;
pub use population::{ClassifierSet, PopulationControl, SortPopulationControl};
pub use statistics::SetStatisticsBundle;
pub use supervised::SupervisedLcs;

use crate::error::Result;
use ndarray::Array2;

/// Outcome of classifying one converted instance
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Predicted label values, one per label column
    pub labels: Vec<f64>,
    /// Whether any rule matched the instance
    pub covered: bool,
}

/// A trainable rule-based learner.
///
/// Rows handed to the learner are full converted instances: attribute
/// columns first, then `number_of_labels()` label columns.
pub trait LearningSystem {
    /// Replace the training matrix
    fn set_instances(&mut self, instances: Array2<f64>);

    fn instances(&self) -> Option<&Array2<f64>>;

    fn set_label_cardinality(&mut self, cardinality: f64);

    fn label_cardinality(&self) -> f64;

    fn number_of_labels(&self) -> usize;

    /// Run the full training procedure over the current training matrix
    fn train(&mut self) -> Result<()>;

    /// Classify one converted instance; its label columns are ignored
    fn classify(&self, row: &[f64]) -> Prediction;

    /// Names aligned with [`LearningSystem::evaluations`]
    fn evaluation_names(&self) -> Vec<String>;

    /// Metric values for a converted test matrix
    fn evaluations(&self, test: &Array2<f64>) -> Result<Vec<f64>>;

    fn population(&self) -> &ClassifierSet;

    fn population_mut(&mut self) -> &mut ClassifierSet;

    fn set_population(&mut self, population: ClassifierSet);
}
