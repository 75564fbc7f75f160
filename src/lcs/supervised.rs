// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Supervised accuracy-based rule learner
//!
//! Each pass walks the training matrix in order. Every matching rule has its
//! accuracy updated; when no matching rule advocates the instance's labels a
//! new rule is created by covering. Total numerosity is bounded by the
//! population control strategy.

use super::classifier::{Classifier, Condition, Macroclassifier};
use super::population::{ClassifierSet, PopulationControl};
use super::{LearningSystem, Prediction};
use crate::error::{LoaderError, Result};
use crate::metrics::{label_set, EvaluationMetrics, LabelSet};
use crate::settings::Settings;
use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// Exponent turning accuracy into fitness
const FITNESS_EXPONENT: f64 = 10.0;
/// Largest covering interval as a fraction of the attribute's observed span
const MAX_SPREAD: f64 = 0.25;

pub struct SupervisedLcs {
    number_of_labels: usize,
    train_iterations: usize,
    wildcard_probability: f64,
    rng: ChaCha8Rng,
    instances: Option<Array2<f64>>,
    label_cardinality: f64,
    population: ClassifierSet,
    default_labels: Vec<f64>,
    attribute_spans: Vec<(f64, f64)>,
    class_count: usize,
}

impl SupervisedLcs {
    /// Seeded from `settings.seed`, or from entropy when unset
    pub fn new(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let rng = match settings.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Ok(Self {
            number_of_labels: settings.number_of_labels,
            train_iterations: settings.train_iterations,
            wildcard_probability: settings.wildcard_probability,
            rng,
            instances: None,
            label_cardinality: 0.0,
            population: ClassifierSet::new(PopulationControl::FixedSize {
                max_numerosity: settings.population_size,
            }),
            default_labels: vec![0.0; settings.number_of_labels],
            attribute_spans: Vec::new(),
            class_count: 0,
        })
    }

    fn split<'a>(&self, row: &'a [f64]) -> (&'a [f64], &'a [f64]) {
        row.split_at(row.len().saturating_sub(self.number_of_labels))
    }

    fn cover(&mut self, attributes: &[f64], labels: &[f64]) -> Classifier {
        let conditions = attributes
            .iter()
            .enumerate()
            .map(|(j, &value)| {
                if value.is_nan() || self.rng.gen_bool(self.wildcard_probability) {
                    return Condition::Wildcard;
                }
                let (lo, hi) = self.attribute_spans.get(j).copied().unwrap_or((value, value));
                let width = (hi - lo) * self.rng.gen_range(0.0..MAX_SPREAD);
                Condition::Range {
                    min: value - width,
                    max: value + width,
                }
            })
            .collect();

        Classifier {
            conditions,
            labels: labels.to_vec(),
        }
    }

    fn learn_spans(&mut self, matrix: &Array2<f64>) {
        let n_attributes = matrix.ncols() - self.number_of_labels;
        self.attribute_spans = (0..n_attributes)
            .map(|j| {
                matrix
                    .column(j)
                    .iter()
                    .filter(|v| !v.is_nan())
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
            })
            .map(|(lo, hi)| if lo > hi { (0.0, 0.0) } else { (lo, hi) })
            .collect();
    }

    // Most frequent class, or per-label majority for multi-label data.
    fn learn_defaults(&mut self, matrix: &Array2<f64>) -> Result<()> {
        let label_start = matrix.ncols() - self.number_of_labels;
        let labelled: Vec<Vec<f64>> = matrix
            .rows()
            .into_iter()
            .map(|row| row.iter().skip(label_start).copied().collect::<Vec<f64>>())
            .filter(|labels| labels.iter().all(|v| !v.is_nan()))
            .collect();

        if self.number_of_labels == 1 {
            let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
            for labels in &labelled {
                *counts.entry(class_index(labels[0])?).or_insert(0) += 1;
            }
            self.class_count = counts.keys().next_back().map_or(0, |c| c.saturating_add(1));
            let majority = counts
                .iter()
                .max_by(|(ca, a), (cb, b)| a.cmp(b).then(cb.cmp(ca)))
                .map(|(c, _)| *c)
                .unwrap_or(0);
            self.default_labels = vec![majority as f64];
        } else {
            self.class_count = self.number_of_labels;
            self.default_labels = (0..self.number_of_labels)
                .map(|l| {
                    let positives = labelled.iter().filter(|labels| labels[l] == 1.0).count();
                    if positives * 2 > labelled.len() {
                        1.0
                    } else {
                        0.0
                    }
                })
                .collect();
        }
        Ok(())
    }

    fn label_space(&self, test_sets: &[LabelSet]) -> usize {
        if self.number_of_labels > 1 {
            return self.number_of_labels;
        }
        let seen = test_sets
            .iter()
            .filter_map(|s| s.iter().next_back())
            .map(|c| c.saturating_add(1))
            .max()
            .unwrap_or(0);
        self.class_count.max(seen)
    }
}

impl LearningSystem for SupervisedLcs {
    fn set_instances(&mut self, instances: Array2<f64>) {
        self.instances = Some(instances);
    }

    fn instances(&self) -> Option<&Array2<f64>> {
        self.instances.as_ref()
    }

    fn set_label_cardinality(&mut self, cardinality: f64) {
        self.label_cardinality = cardinality;
    }

    fn label_cardinality(&self) -> f64 {
        self.label_cardinality
    }

    fn number_of_labels(&self) -> usize {
        self.number_of_labels
    }

    fn train(&mut self) -> Result<()> {
        let matrix = self
            .instances
            .take()
            .ok_or_else(|| LoaderError::Precondition("no training instances assigned".to_string()))?;

        if matrix.ncols() <= self.number_of_labels {
            let cols = matrix.ncols();
            self.instances = Some(matrix);
            return Err(LoaderError::Training(format!(
                "{} columns leave no attributes for {} labels",
                cols, self.number_of_labels
            )));
        }

        self.learn_spans(&matrix);
        if let Err(e) = self.learn_defaults(&matrix) {
            self.instances = Some(matrix);
            return Err(e);
        }

        tracing::info!(
            "Training on {} instances for {} iterations",
            matrix.nrows(),
            self.train_iterations
        );

        for iteration in 0..self.train_iterations {
            let mut covered = 0usize;
            for row in matrix.rows() {
                let row = row.to_vec();
                let (attributes, labels) = self.split(&row);
                if labels.iter().any(|v| v.is_nan()) {
                    continue;
                }

                let mut any_correct = false;
                for m in self.population.iter_mut() {
                    if m.classifier.matches(attributes) {
                        let correct = m.classifier.advocates(labels);
                        any_correct |= correct;
                        m.record(correct, FITNESS_EXPONENT);
                    }
                }

                if !any_correct {
                    let mut rule = Macroclassifier::new(self.cover(attributes, labels));
                    rule.record(true, FITNESS_EXPONENT);
                    self.population.add(rule);
                    covered += 1;
                }
            }

            tracing::debug!(
                "Iteration {}: {} covering events, {} macroclassifiers",
                iteration + 1,
                covered,
                self.population.len()
            );
        }

        tracing::info!(
            "Training finished: {} macroclassifiers, numerosity {}",
            self.population.len(),
            self.population.total_numerosity()
        );

        self.instances = Some(matrix);
        Ok(())
    }

    fn classify(&self, row: &[f64]) -> Prediction {
        let (attributes, _) = self.split(row);
        let matching: Vec<&Macroclassifier> = self
            .population
            .iter()
            .filter(|m| m.classifier.labels.len() == self.number_of_labels && m.classifier.matches(attributes))
            .collect();

        let covered = !matching.is_empty();
        let total: f64 = matching.iter().map(|m| m.fitness * m.numerosity as f64).sum();
        if total <= 0.0 {
            return Prediction {
                labels: self.default_labels.clone(),
                covered,
            };
        }

        let labels = if self.number_of_labels == 1 {
            let mut votes: Vec<(f64, f64)> = Vec::new();
            for m in &matching {
                let class = m.classifier.labels[0];
                let weight = m.fitness * m.numerosity as f64;
                match votes.iter_mut().find(|(c, _)| *c == class) {
                    Some((_, w)) => *w += weight,
                    None => votes.push((class, weight)),
                }
            }
            let best = votes
                .iter()
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(c, _)| *c)
                .unwrap_or(self.default_labels[0]);
            vec![best]
        } else {
            (0..self.number_of_labels)
                .map(|l| {
                    let positive: f64 = matching
                        .iter()
                        .filter(|m| m.classifier.labels[l] == 1.0)
                        .map(|m| m.fitness * m.numerosity as f64)
                        .sum();
                    if positive * 2.0 > total {
                        1.0
                    } else {
                        0.0
                    }
                })
                .collect()
        };

        Prediction { labels, covered }
    }

    fn evaluation_names(&self) -> Vec<String> {
        EvaluationMetrics::NAMES.iter().map(|n| n.to_string()).collect()
    }

    fn evaluations(&self, test: &Array2<f64>) -> Result<Vec<f64>> {
        let expected = self.attribute_spans.len() + self.number_of_labels;
        if !self.attribute_spans.is_empty() && test.ncols() != expected {
            return Err(LoaderError::Evaluation(format!(
                "test matrix has {} columns, training had {}",
                test.ncols(),
                expected
            )));
        }

        let mut predicted = Vec::with_capacity(test.nrows());
        let mut actual = Vec::with_capacity(test.nrows());
        let mut covered = 0usize;

        for row in test.rows() {
            let row = row.to_vec();
            let prediction = self.classify(&row);
            if prediction.covered {
                covered += 1;
            }
            let (_, labels) = self.split(&row);
            predicted.push(label_set(&prediction.labels, self.number_of_labels));
            actual.push(label_set(labels, self.number_of_labels));
        }

        let label_space = self.label_space(&actual);
        Ok(EvaluationMetrics::from_label_sets(&predicted, &actual, label_space, covered).values())
    }

    fn population(&self) -> &ClassifierSet {
        &self.population
    }

    fn population_mut(&mut self) -> &mut ClassifierSet {
        &mut self.population
    }

    fn set_population(&mut self, population: ClassifierSet) {
        self.population = population;
    }
}

/// A single-label class value must be a non-negative integer index
fn class_index(value: f64) -> Result<usize> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
        Ok(value as usize)
    } else {
        Err(LoaderError::Training(format!("class value {} is not a class index", value)))
    }
}
