// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Train/test loading and evaluation for learning classifier systems
//!
//! This crate provides:
//! - ARFF dataset reading into typed instances
//! - Shuffled k-fold partitioning with a seedable random source
//! - Conversion to numeric matrices and label cardinality
//! - A supervised rule learner behind the `LearningSystem` trait
//! - Population persistence with checksummed JSON files
//! - An evaluation pipeline with metrics, classification export and statistics

pub mod arff;
pub mod convert;
pub mod datasets;
pub mod error;
pub mod lcs;
pub mod loader;
pub mod metrics;
pub mod partition;
pub mod pipeline;
pub mod settings;

pub use datasets::{Attribute, AttributeKind, Instance, Instances, Value};
pub use error::{LoaderError, Result};
pub use lcs::{ClassifierSet, LearningSystem, Prediction, SupervisedLcs};
pub use loader::TrainTestLoader;
pub use metrics::{ConfusionMatrix, EvaluationMetrics};
pub use partition::{FoldPartition, PartitionPlanner};
pub use pipeline::{EvaluationPipeline, EvaluationReport, ExportOutcome, RunSummary};
pub use settings::Settings;
