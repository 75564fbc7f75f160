// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Run settings loaded from a `key = value` properties file
//!
//! Settings are resolved once at start-up and handed to the loader and the
//! evaluation pipeline by reference. Empty values leave a setting unset.

use crate::error::{LoaderError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Typed view over the recognised setting keys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Population file read before training
    pub load_rules_file: Option<PathBuf>,
    /// Population file written after evaluation
    pub save_rules_file: Option<PathBuf>,
    /// Per-instance classification export target
    pub test_classification_file: Option<PathBuf>,
    /// Labels per instance (1 for single-label data)
    pub number_of_labels: usize,
    /// Fold count for cross-validation loads
    #[serde(rename = "NumberOfFolds")]
    pub number_of_folds: usize,
    /// Passes over the training matrix
    pub train_iterations: usize,
    /// Upper bound on total numerosity of the rule population
    pub population_size: usize,
    /// Chance of generalising an attribute when covering
    pub wildcard_probability: f64,
    /// Seed for partitioning and learning; entropy when unset
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            load_rules_file: None,
            save_rules_file: None,
            test_classification_file: None,
            number_of_labels: 1,
            number_of_folds: 10,
            train_iterations: 100,
            population_size: 1000,
            wildcard_probability: 0.33,
            seed: None,
        }
    }
}

impl Settings {
    /// Load settings from a properties file on disk
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| LoaderError::io(path, e))?;
        let settings = Self::from_properties_str(&contents)?;
        tracing::info!("Settings loaded from {}", path.display());
        Ok(settings)
    }

    /// Parse `key = value` (or `key: value`) lines; `#` and `!` start comments
    pub fn from_properties_str(text: &str) -> Result<Self> {
        let mut settings = Self::default();

        for (idx, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                continue;
            }

            let (key, value) = trimmed
                .split_once('=')
                .or_else(|| trimmed.split_once(':'))
                .ok_or_else(|| {
                    LoaderError::Configuration(format!("line {}: expected key = value, got '{}'", idx + 1, trimmed))
                })?;

            settings.apply(key.trim(), value.trim().trim_matches('"'))?;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Set one key; unknown keys are ignored
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "loadRulesFile" => self.load_rules_file = optional_path(value),
            "saveRulesFile" => self.save_rules_file = optional_path(value),
            "testClassificationFile" => self.test_classification_file = optional_path(value),
            "numberOfLabels" => self.number_of_labels = parse_count(key, value)?,
            "NumberOfFolds" => self.number_of_folds = parse_count(key, value)?,
            "trainIterations" => self.train_iterations = parse_count(key, value)?,
            "populationSize" => self.population_size = parse_count(key, value)?,
            "wildcardProbability" => {
                self.wildcard_probability = value.parse().map_err(|_| {
                    LoaderError::Configuration(format!("{} must be a number, got '{}'", key, value))
                })?
            }
            "seed" => {
                self.seed = if value.is_empty() {
                    None
                } else {
                    Some(value.parse().map_err(|_| {
                        LoaderError::Configuration(format!("seed must be an unsigned integer, got '{}'", value))
                    })?)
                }
            }
            other => tracing::debug!("Ignoring unknown setting '{}'", other),
        }
        Ok(())
    }

    /// Reject values no run can use
    pub fn validate(&self) -> Result<()> {
        if self.number_of_labels == 0 {
            return Err(LoaderError::Configuration("numberOfLabels must be at least 1".to_string()));
        }
        if self.population_size == 0 {
            return Err(LoaderError::Configuration("populationSize must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.wildcard_probability) {
            return Err(LoaderError::Configuration(format!(
                "wildcardProbability must lie in [0, 1], got {}",
                self.wildcard_probability
            )));
        }
        Ok(())
    }
}

fn optional_path(value: &str) -> Option<PathBuf> {
    if value.is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

// Integer settings may be written as `10` or `10.0`.
fn parse_count(key: &str, value: &str) -> Result<usize> {
    if let Ok(n) = value.parse::<usize>() {
        return Ok(n);
    }
    match value.parse::<f64>() {
        Ok(f) if f >= 0.0 && f.fract() == 0.0 => Ok(f as usize),
        _ => Err(LoaderError::Configuration(format!(
            "{} must be a non-negative integer, got '{}'",
            key, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.load_rules_file, None);
        assert_eq!(settings.save_rules_file, None);
        assert_eq!(settings.test_classification_file, None);
        assert_eq!(settings.number_of_labels, 1);
        assert_eq!(settings.number_of_folds, 10);
    }

    #[test]
    fn test_parse_properties() {
        let text = r#"
# run configuration
loadRulesFile =
saveRulesFile = rules/out.json
testClassificationFile: "classified.csv"
numberOfLabels = 6
NumberOfFolds = 5.0
seed = 7
someOtherKey = ignored
"#;
        let settings = Settings::from_properties_str(text).unwrap();
        assert_eq!(settings.load_rules_file, None);
        assert_eq!(settings.save_rules_file, Some(PathBuf::from("rules/out.json")));
        assert_eq!(settings.test_classification_file, Some(PathBuf::from("classified.csv")));
        assert_eq!(settings.number_of_labels, 6);
        assert_eq!(settings.number_of_folds, 5);
        assert_eq!(settings.seed, Some(7));
    }

    #[test]
    fn test_rejects_malformed_line() {
        let err = Settings::from_properties_str("NumberOfFolds 10").unwrap_err();
        assert!(matches!(err, LoaderError::Configuration(_)));
    }

    #[test]
    fn test_rejects_non_numeric_count() {
        let err = Settings::from_properties_str("NumberOfFolds = ten").unwrap_err();
        assert!(matches!(err, LoaderError::Configuration(_)));

        let err = Settings::from_properties_str("numberOfLabels = 1.5").unwrap_err();
        assert!(matches!(err, LoaderError::Configuration(_)));
    }

    #[test]
    fn test_rejects_zero_labels() {
        let err = Settings::from_properties_str("numberOfLabels = 0").unwrap_err();
        assert!(matches!(err, LoaderError::Configuration(_)));
    }

    #[test]
    fn test_serializes_with_setting_keys() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert!(json.get("NumberOfFolds").is_some());
        assert!(json.get("numberOfLabels").is_some());
        assert!(json.get("testClassificationFile").is_some());
    }
}
