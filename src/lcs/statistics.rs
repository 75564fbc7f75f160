// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Summary statistics over a trained rule population

use super::{ClassifierSet, LearningSystem, Macroclassifier};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Population-level statistics printed after evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetStatisticsBundle {
    pub macroclassifiers: usize,
    pub total_numerosity: usize,
    /// Numerosity-weighted means
    pub mean_fitness: f64,
    pub mean_accuracy: f64,
    pub mean_specificity: f64,
    pub mean_experience: f64,
    /// Label cardinality of the training data
    pub label_cardinality: f64,
    /// Mean number of positive labels advocated per rule (multi-label only)
    pub rule_label_cardinality: Option<f64>,
    /// Microclassifiers advocating each label (multi-label) or class
    pub rules_per_label: BTreeMap<usize, usize>,
}

impl SetStatisticsBundle {
    pub fn new<L: LearningSystem + ?Sized>(lcs: &L, number_of_labels: usize) -> Self {
        let population = lcs.population();
        let total_numerosity = population.total_numerosity();
        let weight = |f: fn(&Macroclassifier) -> f64| weighted_mean(population, f);

        let mut rules_per_label: BTreeMap<usize, usize> = BTreeMap::new();
        if number_of_labels > 1 {
            rules_per_label.extend((0..number_of_labels).map(|l| (l, 0)));
        }
        for m in population.iter() {
            if number_of_labels > 1 {
                for (l, v) in m.classifier.labels.iter().enumerate().take(number_of_labels) {
                    if *v == 1.0 {
                        *rules_per_label.entry(l).or_insert(0) += m.numerosity;
                    }
                }
            } else if let Some(class) = m.classifier.labels.first().filter(|c| c.is_finite() && **c >= 0.0) {
                *rules_per_label.entry(*class as usize).or_insert(0) += m.numerosity;
            }
        }

        let rule_label_cardinality = (number_of_labels > 1)
            .then(|| weight(|m| m.classifier.labels.iter().filter(|v| **v == 1.0).count() as f64));

        Self {
            macroclassifiers: population.len(),
            total_numerosity,
            mean_fitness: weight(|m| m.fitness),
            mean_accuracy: weight(|m| m.accuracy()),
            mean_specificity: weight(|m| m.classifier.specificity()),
            mean_experience: weight(|m| m.experience as f64),
            label_cardinality: lcs.label_cardinality(),
            rule_label_cardinality,
            rules_per_label,
        }
    }
}

fn weighted_mean(population: &ClassifierSet, f: fn(&Macroclassifier) -> f64) -> f64 {
    let total = population.total_numerosity();
    if total == 0 {
        return 0.0;
    }
    population.iter().map(|m| f(m) * m.numerosity as f64).sum::<f64>() / total as f64
}

impl fmt::Display for SetStatisticsBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Population Statistics")?;
        writeln!(f, "=====================")?;
        writeln!(f, "Macroclassifiers:  {}", self.macroclassifiers)?;
        writeln!(f, "Total numerosity:  {}", self.total_numerosity)?;
        writeln!(f, "Mean fitness:      {:.4}", self.mean_fitness)?;
        writeln!(f, "Mean accuracy:     {:.4}", self.mean_accuracy)?;
        writeln!(f, "Mean specificity:  {:.4}", self.mean_specificity)?;
        writeln!(f, "Mean experience:   {:.1}", self.mean_experience)?;
        writeln!(f, "Label cardinality: {:.4}", self.label_cardinality)?;
        if let Some(card) = self.rule_label_cardinality {
            writeln!(f, "Rule cardinality:  {:.4}", card)?;
        }
        let per_label: Vec<String> = self
            .rules_per_label
            .iter()
            .map(|(label, count)| format!("{}: {}", label, count))
            .collect();
        write!(f, "Rules per label:   [{}]", per_label.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lcs::supervised::tests::quick_settings;
    use crate::lcs::{Classifier, ClassifierSet, Condition, Macroclassifier, PopulationControl, SupervisedLcs};

    fn rule(labels: Vec<f64>, numerosity: usize, fitness: f64) -> Macroclassifier {
        let mut m = Macroclassifier::new(Classifier {
            conditions: vec![Condition::Wildcard, Condition::Range { min: 0.0, max: 1.0 }],
            labels,
        });
        m.numerosity = numerosity;
        m.fitness = fitness;
        m
    }

    #[test]
    fn test_bundle_multi_label() {
        let mut lcs = SupervisedLcs::new(&quick_settings(2)).unwrap();
        let mut set = ClassifierSet::new(PopulationControl::Unbounded);
        set.add(rule(vec![1.0, 0.0], 3, 1.0));
        set.add(rule(vec![1.0, 1.0], 1, 0.0));
        lcs.set_population(set);
        lcs.set_label_cardinality(1.25);

        let bundle = SetStatisticsBundle::new(&lcs, 2);
        assert_eq!(bundle.macroclassifiers, 2);
        assert_eq!(bundle.total_numerosity, 4);
        assert!((bundle.mean_fitness - 0.75).abs() < 1e-12);
        assert!((bundle.mean_specificity - 0.5).abs() < 1e-12);
        assert_eq!(bundle.rules_per_label, BTreeMap::from([(0, 4), (1, 1)]));
        assert!((bundle.rule_label_cardinality.unwrap() - 1.25).abs() < 1e-12);
        assert!(bundle.to_string().contains("Label cardinality: 1.2500"));
    }

    #[test]
    fn test_bundle_single_label_and_empty() {
        let mut lcs = SupervisedLcs::new(&quick_settings(1)).unwrap();
        let empty = SetStatisticsBundle::new(&lcs, 1);
        assert_eq!(empty.total_numerosity, 0);
        assert_eq!(empty.mean_fitness, 0.0);

        let mut set = ClassifierSet::new(PopulationControl::Unbounded);
        set.add(rule(vec![2.0], 2, 1.0));
        lcs.set_population(set);
        let bundle = SetStatisticsBundle::new(&lcs, 1);
        assert_eq!(bundle.rules_per_label, BTreeMap::from([(2, 2)]));
        assert!(bundle.rule_label_cardinality.is_none());
    }

    #[test]
    fn test_large_class_value_counted_sparsely() {
        let mut lcs = SupervisedLcs::new(&quick_settings(1)).unwrap();
        let mut set = ClassifierSet::new(PopulationControl::Unbounded);
        set.add(rule(vec![1e13], 3, 1.0));
        set.add(rule(vec![f64::INFINITY], 1, 1.0));
        lcs.set_population(set);

        let bundle = SetStatisticsBundle::new(&lcs, 1);
        assert_eq!(bundle.rules_per_label.len(), 1);
        assert_eq!(bundle.rules_per_label.get(&10_000_000_000_000), Some(&3));
        assert!(bundle.to_string().contains("10000000000000: 3"));
    }
}
