// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Tabular dataset model shared by the reader, the partitioner and the converter

use crate::arff;
use crate::error::{LoaderError, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Declared type of an attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeKind {
    Numeric,
    /// Nominal attribute with its declared values, in declaration order
    Nominal(Vec<String>),
    String,
}

/// A named column of the dataset schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
}

impl Attribute {
    pub fn numeric(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: AttributeKind::Numeric,
        }
    }

    pub fn nominal(name: &str, values: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind: AttributeKind::Nominal(values.iter().map(|v| v.to_string()).collect()),
        }
    }

    /// Position of a nominal value in the declaration
    pub fn index_of(&self, value: &str) -> Option<usize> {
        match &self.kind {
            AttributeKind::Nominal(values) => values.iter().position(|v| v == value),
            _ => None,
        }
    }
}

/// One cell of an instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Numeric(f64),
    Nominal(String),
    Text(String),
    Missing,
}

/// One row: values in schema order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub values: Vec<Value>,
}

impl Instance {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }
}

/// An ordered set of instances sharing one schema and class index
#[derive(Debug, Clone, PartialEq)]
pub struct Instances {
    pub relation: String,
    pub attributes: Vec<Attribute>,
    pub rows: Vec<Instance>,
    class_index: Option<usize>,
}

impl Instances {
    pub fn new(relation: &str, attributes: Vec<Attribute>, rows: Vec<Instance>) -> Self {
        Self {
            relation: relation.to_string(),
            attributes,
            rows,
            class_index: None,
        }
    }

    /// Read an attribute-relation file
    pub fn open(path: &Path) -> Result<Self> {
        let set = arff::read_file(path)?;
        tracing::info!(
            "Loaded '{}' from {}: {} instances, {} attributes",
            set.relation,
            path.display(),
            set.num_instances(),
            set.num_attributes()
        );
        Ok(set)
    }

    pub fn num_attributes(&self) -> usize {
        self.attributes.len()
    }

    pub fn num_instances(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn class_index(&self) -> Option<usize> {
        self.class_index
    }

    pub fn set_class_index(&mut self, index: usize) -> Result<()> {
        if index >= self.num_attributes() {
            return Err(LoaderError::Configuration(format!(
                "class index {} out of range for {} attributes",
                index,
                self.num_attributes()
            )));
        }
        self.class_index = Some(index);
        Ok(())
    }

    /// Default the class index to the last attribute when unset
    pub fn ensure_class_index(&mut self) -> Result<()> {
        if self.class_index.is_none() {
            let last = self.num_attributes().checked_sub(1).ok_or_else(|| {
                LoaderError::format(self.relation.clone(), None, "dataset declares no attributes")
            })?;
            self.class_index = Some(last);
        }
        Ok(())
    }

    /// Full uniform permutation of the rows
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.rows.shuffle(rng);
    }

    /// Row range of fold `fold` when split into `num_folds` contiguous blocks.
    ///
    /// The first `n % num_folds` blocks hold one extra row.
    pub fn fold_bounds(&self, num_folds: usize, fold: usize) -> Result<(usize, usize)> {
        if num_folds < 2 {
            return Err(LoaderError::Configuration(format!(
                "number of folds must be at least 2, got {}",
                num_folds
            )));
        }
        if fold >= num_folds {
            return Err(LoaderError::Configuration(format!(
                "fold index {} out of range for {} folds",
                fold, num_folds
            )));
        }

        let n = self.num_instances();
        let base = n / num_folds;
        let remainder = n % num_folds;
        let size = if fold < remainder { base + 1 } else { base };
        let start = fold * base + fold.min(remainder);
        Ok((start, start + size))
    }

    /// Held-out block `fold`
    pub fn test_cv(&self, num_folds: usize, fold: usize) -> Result<Instances> {
        let (start, end) = self.fold_bounds(num_folds, fold)?;
        Ok(self.with_rows(self.rows[start..end].to_vec()))
    }

    /// Every block except `fold`, in order
    pub fn train_cv(&self, num_folds: usize, fold: usize) -> Result<Instances> {
        let (start, end) = self.fold_bounds(num_folds, fold)?;
        let rows = self.rows[..start]
            .iter()
            .chain(self.rows[end..].iter())
            .cloned()
            .collect();
        Ok(self.with_rows(rows))
    }

    /// Same schema and class index, different rows
    fn with_rows(&self, rows: Vec<Instance>) -> Instances {
        Instances {
            relation: self.relation.clone(),
            attributes: self.attributes.clone(),
            rows,
            class_index: self.class_index,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Rows whose first column is the row id
    pub(crate) fn numbered(n: usize) -> Instances {
        let attributes = vec![Attribute::numeric("id"), Attribute::nominal("class", &["a", "b"])];
        let rows = (0..n)
            .map(|i| {
                Instance::new(vec![
                    Value::Numeric(i as f64),
                    Value::Nominal(if i % 2 == 0 { "a" } else { "b" }.to_string()),
                ])
            })
            .collect();
        Instances::new("numbered", attributes, rows)
    }

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
    fn test_ensure_class_index_defaults_to_last() {
        let mut set = numbered(4);
        assert_eq!(set.class_index(), None);
        set.ensure_class_index().unwrap();
        assert_eq!(set.class_index(), Some(1));

        set.set_class_index(0).unwrap();
        set.ensure_class_index().unwrap();
        assert_eq!(set.class_index(), Some(0));
    }

    #[test]
    fn test_set_class_index_out_of_range() {
        let mut set = numbered(4);
        assert!(set.set_class_index(2).is_err());
    }

    #[test]
    fn test_fold_bounds_front_load_remainder() {
        let set = numbered(17);
        let sizes: Vec<usize> = (0..4)
            .map(|f| {
                let (s, e) = set.fold_bounds(4, f).unwrap();
                e - s
            })
            .collect();
        assert_eq!(sizes, vec![5, 4, 4, 4]);
        assert_eq!(set.fold_bounds(4, 0).unwrap(), (0, 5));
        assert_eq!(set.fold_bounds(4, 3).unwrap(), (13, 17));
    }

    #[test]
    fn test_train_and_test_cv_are_complementary() {
        let set = numbered(23);
        for fold in 0..5 {
            let train = set.train_cv(5, fold).unwrap();
            let test = set.test_cv(5, fold).unwrap();

            let mut all = ids(&train);
            all.extend(ids(&test));
            all.sort_unstable();
            assert_eq!(all, (0..23).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_single_fold_rejected() {
        let set = numbered(10);
        assert!(matches!(set.test_cv(1, 0), Err(LoaderError::Configuration(_))));
        assert!(matches!(set.train_cv(0, 0), Err(LoaderError::Configuration(_))));
    }

    #[test]
    fn test_randomize_is_a_permutation() {
        let mut set = numbered(50);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        set.randomize(&mut rng);

        let shuffled = ids(&set);
        assert_ne!(shuffled, (0..50).collect::<Vec<_>>());

        let mut sorted = shuffled;
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }
}
