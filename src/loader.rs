// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Train/test loading and evaluation entry point
//!
//! A [`TrainTestLoader`] borrows a learning system for its whole lifetime,
//! loads a train (and usually test) set into it, then hands both to the
//! [`EvaluationPipeline`].

use crate::convert;
use crate::datasets::Instances;
use crate::error::{LoaderError, Result};
use crate::lcs::LearningSystem;
use crate::partition::{FoldPartition, PartitionPlanner};
use crate::pipeline::{DatasetInfo, EvaluationPipeline, EvaluationReport};
use crate::settings::Settings;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct TrainTestLoader<'a, L: LearningSystem + ?Sized, R: Rng = ChaCha8Rng> {
    lcs: &'a mut L,
    settings: &'a Settings,
    planner: PartitionPlanner<R>,
    train_set: Option<Instances>,
    test_set: Option<Instances>,
    fold: Option<usize>,
    num_folds: Option<usize>,
    source: Option<PathBuf>,
    test_source: Option<PathBuf>,
}

impl<'a, L: LearningSystem + ?Sized> TrainTestLoader<'a, L, ChaCha8Rng> {
    /// Planner seeded from `settings.seed`, or from entropy when unset
    pub fn new(lcs: &'a mut L, settings: &'a Settings) -> Self {
        let planner = match settings.seed {
            Some(seed) => PartitionPlanner::seeded(seed),
            None => PartitionPlanner::from_entropy(),
        };
        Self::with_planner(lcs, settings, planner)
    }
}

impl<'a, L: LearningSystem + ?Sized, R: Rng> TrainTestLoader<'a, L, R> {
    pub fn with_planner(lcs: &'a mut L, settings: &'a Settings, planner: PartitionPlanner<R>) -> Self {
        Self {
            lcs,
            settings,
            planner,
            train_set: None,
            test_set: None,
            fold: None,
            num_folds: None,
            source: None,
            test_source: None,
        }
    }

    /// Load one file and split it with a randomly drawn fold, or keep
    /// everything for training when `generate_test_set` is false
    pub fn load_for_cross_validation(&mut self, path: &Path, generate_test_set: bool) -> Result<()> {
        if generate_test_set && self.settings.number_of_folds < 2 {
            return Err(LoaderError::Configuration(format!(
                "NumberOfFolds must be at least 2, got {}",
                self.settings.number_of_folds
            )));
        }

        let set = Instances::open(path)?;
        let partition = if generate_test_set {
            self.planner.plan(set, self.settings.number_of_folds)?
        } else {
            self.planner.plan_without_test(set)?
        };

        self.install(partition, path, None)
    }

    /// Load a shuffled train file and a test file kept in file order
    pub fn load_with_explicit_test_file(&mut self, train_path: &Path, test_path: &Path) -> Result<()> {
        let partition = self.planner.plan_with_explicit_test_file(train_path, test_path)?;
        self.install(partition, train_path, Some(test_path))
    }

    fn install(&mut self, partition: FoldPartition, source: &Path, test_source: Option<&Path>) -> Result<()> {
        let cardinality = convert::label_cardinality(&partition.train, self.settings.number_of_labels)?;
        let matrix = convert::to_numeric_matrix(&partition.train)?;

        tracing::info!(
            "Loaded '{}': {}x{} training matrix, label cardinality {:.4}",
            partition.train.relation,
            matrix.nrows(),
            matrix.ncols(),
            cardinality
        );

        self.lcs.set_instances(matrix);
        self.lcs.set_label_cardinality(cardinality);

        self.train_set = Some(partition.train);
        self.test_set = partition.test;
        self.fold = partition.fold;
        self.num_folds = partition.num_folds;
        self.source = Some(source.to_path_buf());
        self.test_source = test_source.map(Path::to_path_buf);
        Ok(())
    }

    pub fn train_set(&self) -> Option<&Instances> {
        self.train_set.as_ref()
    }

    pub fn test_set(&self) -> Option<&Instances> {
        self.test_set.as_ref()
    }

    /// Fold drawn by the last cross-validation load
    pub fn fold(&self) -> Option<usize> {
        self.fold
    }

    pub fn learning_system(&self) -> &L {
        &*self.lcs
    }

    /// Facts about the loaded data, for run summaries
    pub fn dataset_info(&self) -> Option<DatasetInfo> {
        let train = self.train_set.as_ref()?;
        Some(DatasetInfo {
            relation: train.relation.clone(),
            source: self
                .source
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            test_source: self.test_source.as_ref().map(|p| p.display().to_string()),
            train_instances: train.num_instances(),
            test_instances: self.test_set.as_ref().map(Instances::num_instances),
            fold: self.fold,
            num_folds: self.num_folds,
            label_cardinality: self.lcs.label_cardinality(),
        })
    }

    /// Train and report; requires a prior load
    pub fn evaluate<W: Write>(&mut self, out: &mut W) -> Result<EvaluationReport> {
        if self.train_set.is_none() {
            return Err(LoaderError::Precondition(
                "evaluate called before a train set was loaded".to_string(),
            ));
        }

        let mut pipeline = EvaluationPipeline::new(self.settings);
        pipeline.run(&mut *self.lcs, self.test_set.as_ref(), out)
    }
}
