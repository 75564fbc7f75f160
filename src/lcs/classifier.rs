// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Rules and macroclassifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Condition on one attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// Matches any value
    Wildcard,
    /// Matches values in `[min, max]`
    Range { min: f64, max: f64 },
}

impl Condition {
    /// Missing (`NaN`) inputs match every condition
    pub fn matches(&self, value: f64) -> bool {
        match self {
            Condition::Wildcard => true,
            Condition::Range { min, max } => value.is_nan() || (*min <= value && value <= *max),
        }
    }

    pub fn is_specific(&self) -> bool {
        !matches!(self, Condition::Wildcard)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Wildcard => write!(f, "#"),
            Condition::Range { min, max } if min == max => write!(f, "{:.3}", min),
            Condition::Range { min, max } => write!(f, "{:.3}..{:.3}", min, max),
        }
    }
}

/// A rule: attribute conditions and the labels it advocates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classifier {
    pub conditions: Vec<Condition>,
    pub labels: Vec<f64>,
}

impl Classifier {
    pub fn matches(&self, attributes: &[f64]) -> bool {
        self.conditions.iter().zip(attributes).all(|(c, v)| c.matches(*v))
    }

    /// Fraction of non-wildcard conditions
    pub fn specificity(&self) -> f64 {
        if self.conditions.is_empty() {
            return 0.0;
        }
        self.conditions.iter().filter(|c| c.is_specific()).count() as f64 / self.conditions.len() as f64
    }

    /// Same advocated labels, treating two missing values as equal
    pub fn advocates(&self, labels: &[f64]) -> bool {
        self.labels.len() == labels.len()
            && self
                .labels
                .iter()
                .zip(labels)
                .all(|(a, b)| a == b || (a.is_nan() && b.is_nan()))
    }
}

/// Ordering key used when ranking macroclassifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonMode {
    /// Fitness of a single microclassifier
    Exploitation,
    /// Fitness weighted by numerosity
    Exploration,
    /// Raw accuracy
    PureFitness,
}

/// A rule with its numerosity and performance counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Macroclassifier {
    pub classifier: Classifier,
    pub numerosity: usize,
    pub experience: usize,
    pub correct: usize,
    pub fitness: f64,
}

impl Macroclassifier {
    pub fn new(classifier: Classifier) -> Self {
        Self {
            classifier,
            numerosity: 1,
            experience: 0,
            correct: 0,
            fitness: 0.0,
        }
    }

    pub fn accuracy(&self) -> f64 {
        if self.experience == 0 {
            0.0
        } else {
            self.correct as f64 / self.experience as f64
        }
    }

    /// Record one match and refresh fitness as `accuracy ^ exponent`
    pub fn record(&mut self, correct: bool, exponent: f64) {
        self.experience += 1;
        if correct {
            self.correct += 1;
        }
        self.fitness = self.accuracy().powf(exponent);
    }

    pub fn comparison_value(&self, mode: ComparisonMode) -> f64 {
        match mode {
            ComparisonMode::Exploitation => self.fitness,
            ComparisonMode::Exploration => self.fitness * self.numerosity as f64,
            ComparisonMode::PureFitness => self.accuracy(),
        }
    }
}

impl fmt::Display for Macroclassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let conditions: Vec<String> = self.classifier.conditions.iter().map(|c| c.to_string()).collect();
        let labels: Vec<String> = self.classifier.labels.iter().map(|l| format!("{}", l)).collect();
        write!(
            f,
            "[{}] => [{}] fit={:.4} acc={:.4} num={} exp={}",
            conditions.join(", "),
            labels.join(", "),
            self.fitness,
            self.accuracy(),
            self.numerosity,
            self.experience
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule() -> Classifier {
        Classifier {
            conditions: vec![Condition::Range { min: 0.0, max: 1.0 }, Condition::Wildcard],
            labels: vec![1.0],
        }
    }

    #[test]
    fn test_matching() {
        let r = rule();
        assert!(r.matches(&[0.5, 100.0]));
        assert!(r.matches(&[f64::NAN, 3.0]));
        assert!(!r.matches(&[1.5, 0.0]));
    }

    #[test]
    fn test_specificity() {
        assert!((rule().specificity() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_record_updates_fitness() {
        let mut m = Macroclassifier::new(rule());
        m.record(true, 2.0);
        m.record(false, 2.0);
        assert_eq!(m.experience, 2);
        assert_eq!(m.correct, 1);
        assert!((m.fitness - 0.25).abs() < 1e-12);
        m.numerosity = 4;
        assert!((m.comparison_value(ComparisonMode::Exploration) - 1.0).abs() < 1e-12);
        assert!((m.comparison_value(ComparisonMode::PureFitness) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_display() {
        let text = Macroclassifier::new(rule()).to_string();
        assert!(text.starts_with("[0.000..1.000, #] => [1]"));
    }
}
