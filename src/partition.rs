// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Shuffled k-fold train/test partitioning with an injected random source

use crate::datasets::Instances;
use crate::error::{LoaderError, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::Path;

/// A train/test split of one dataset
#[derive(Debug, Clone)]
pub struct FoldPartition {
    pub train: Instances,
    /// Absent when test-set generation is disabled
    pub test: Option<Instances>,
    /// Fold drawn for the test block
    pub fold: Option<usize>,
    pub num_folds: Option<usize>,
}

/// Shuffles datasets and carves out one randomly drawn cross-validation fold
#[derive(Debug, Clone)]
pub struct PartitionPlanner<R: Rng = ChaCha8Rng> {
    rng: R,
}

impl PartitionPlanner<ChaCha8Rng> {
    /// Reproducible planner
    pub fn seeded(seed: u64) -> Self {
        Self::new(ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(ChaCha8Rng::from_entropy())
    }
}

impl<R: Rng> PartitionPlanner<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Default the class index and shuffle in place
    pub fn prepare(&mut self, set: &mut Instances) -> Result<()> {
        set.ensure_class_index()?;
        set.randomize(&mut self.rng);
        Ok(())
    }

    /// Shuffle, draw one fold index and split off that fold as the test set
    pub fn plan(&mut self, mut set: Instances, num_folds: usize) -> Result<FoldPartition> {
        if num_folds < 2 {
            return Err(LoaderError::Configuration(format!(
                "NumberOfFolds must be at least 2, got {}",
                num_folds
            )));
        }
        if num_folds > set.num_instances() {
            tracing::warn!(
                "{} folds requested for {} instances; some folds are empty",
                num_folds,
                set.num_instances()
            );
        }

        self.prepare(&mut set)?;

        let fold = self.rng.gen_range(0..num_folds);
        let train = set.train_cv(num_folds, fold)?;
        let test = set.test_cv(num_folds, fold)?;

        tracing::info!(
            "Fold {}/{} drawn: {} train, {} test instances",
            fold + 1,
            num_folds,
            train.num_instances(),
            test.num_instances()
        );

        Ok(FoldPartition {
            train,
            test: Some(test),
            fold: Some(fold),
            num_folds: Some(num_folds),
        })
    }

    /// Shuffle only; everything goes to training
    pub fn plan_without_test(&mut self, mut set: Instances) -> Result<FoldPartition> {
        self.prepare(&mut set)?;
        tracing::info!("Test set generation disabled: {} train instances", set.num_instances());
        Ok(FoldPartition {
            train: set,
            test: None,
            fold: None,
            num_folds: None,
        })
    }

    /// Load a shuffled train file and an untouched test file
    pub fn plan_with_explicit_test_file(&mut self, train_path: &Path, test_path: &Path) -> Result<FoldPartition> {
        let mut train = Instances::open(train_path)?;
        self.prepare(&mut train)?;
        let test = Instances::open(test_path)?;

        Ok(FoldPartition {
            train,
            test: Some(test),
            fold: None,
            num_folds: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::tests::numbered;
    use crate::datasets::Value;

    fn ids(set: &Instances) -> Vec<usize> {
        set.rows
            .iter()
            .map(|r| match r.values[0] {
                Value::Numeric(v) => v as usize,
                _ => unreachable!(),
            })
            .collect()
    }

    #[test]
    fn test_partition_covers_dataset_disjointly() {
        for seed in 0..20 {
            for &(n, folds) in &[(100, 10), (17, 4), (5, 2), (31, 7)] {
                let mut planner = PartitionPlanner::seeded(seed);
                let part = planner.plan(numbered(n), folds).unwrap();
                let test = part.test.as_ref().unwrap();

                let mut all = ids(&part.train);
                all.extend(ids(test));
                all.sort_unstable();
                assert_eq!(all, (0..n).collect::<Vec<_>>(), "seed {} n {} folds {}", seed, n, folds);

                let expected = n as f64 / folds as f64;
                assert!((test.num_instances() as f64 - expected).abs() <= 1.0);
            }
        }
    }

    #[test]
    fn test_hundred_instances_ten_folds() {
        let mut planner = PartitionPlanner::seeded(3);
        let part = planner.plan(numbered(100), 10).unwrap();
        let test_len = part.test.as_ref().unwrap().num_instances();
        assert!((9..=11).contains(&test_len));
        assert_eq!(part.train.num_instances(), 100 - test_len);
        assert!(part.fold.unwrap() < 10);
    }

    #[test]
    fn test_fold_count_below_two_rejected() {
        let mut planner = PartitionPlanner::seeded(1);
        for folds in [0, 1] {
            let err = planner.plan(numbered(10), folds).unwrap_err();
            assert!(matches!(err, LoaderError::Configuration(_)));
        }
    }

    #[test]
    fn test_class_index_defaulted() {
        let mut planner = PartitionPlanner::seeded(1);
        let part = planner.plan(numbered(10), 2).unwrap();
        assert_eq!(part.train.class_index(), Some(1));
        assert_eq!(part.test.unwrap().class_index(), Some(1));
    }

    #[test]
    fn test_same_seed_same_partition() {
        let a = PartitionPlanner::seeded(99).plan(numbered(40), 5).unwrap();
        let b = PartitionPlanner::seeded(99).plan(numbered(40), 5).unwrap();
        assert_eq!(a.fold, b.fold);
        assert_eq!(ids(&a.train), ids(&b.train));
        assert_eq!(ids(a.test.as_ref().unwrap()), ids(b.test.as_ref().unwrap()));
    }

    #[test]
    fn test_fold_draw_reaches_every_fold() {
        let mut planner = PartitionPlanner::seeded(5);
        let mut seen = [false; 4];
        for _ in 0..200 {
            let part = planner.plan(numbered(8), 4).unwrap();
            seen[part.fold.unwrap()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_without_test_keeps_everything() {
        let mut planner = PartitionPlanner::seeded(2);
        let part = planner.plan_without_test(numbered(30)).unwrap();
        assert!(part.test.is_none());
        assert_eq!(part.train.num_instances(), 30);
        assert_eq!(part.train.class_index(), Some(1));
    }
}
