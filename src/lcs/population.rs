// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Rule population, population control and persistence
//!
//! Populations are stored as JSON with a SHA-256 checksum over the
//! macroclassifier array so truncated or hand-edited files are rejected.

use super::classifier::{ComparisonMode, Macroclassifier};
use crate::error::{LoaderError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

const FORMAT_TAG: &str = "lcs-population/1";

/// Strategy applied after the population grows
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PopulationControl {
    Unbounded,
    /// Delete the weakest microclassifiers until total numerosity fits
    FixedSize { max_numerosity: usize },
}

impl PopulationControl {
    pub fn control_population(&self, macroclassifiers: &mut Vec<Macroclassifier>) {
        let PopulationControl::FixedSize { max_numerosity } = *self else {
            return;
        };

        let mut total: usize = macroclassifiers.iter().map(|m| m.numerosity).sum();
        while total > max_numerosity {
            let Some(weakest) = macroclassifiers
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    a.comparison_value(ComparisonMode::Exploitation)
                        .total_cmp(&b.comparison_value(ComparisonMode::Exploitation))
                })
                .map(|(i, _)| i)
            else {
                break;
            };

            if macroclassifiers[weakest].numerosity > 1 {
                macroclassifiers[weakest].numerosity -= 1;
            } else {
                macroclassifiers.remove(weakest);
            }
            total -= 1;
        }
    }
}

/// Reorders a population by a comparison mode, best first
#[derive(Debug, Clone, Copy)]
pub struct SortPopulationControl {
    mode: ComparisonMode,
}

impl SortPopulationControl {
    pub fn new(mode: ComparisonMode) -> Self {
        Self { mode }
    }

    /// Stable sort; membership and numerosities are untouched
    pub fn control_population(&self, set: &mut ClassifierSet) {
        let mode = self.mode;
        set.macroclassifiers
            .sort_by(|a, b| b.comparison_value(mode).total_cmp(&a.comparison_value(mode)));
    }
}

/// The learner's rule population
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierSet {
    macroclassifiers: Vec<Macroclassifier>,
    control: PopulationControl,
}

#[derive(Serialize, Deserialize)]
struct PopulationFile {
    format: String,
    checksum: String,
    macroclassifiers: Vec<Macroclassifier>,
}

impl ClassifierSet {
    pub fn new(control: PopulationControl) -> Self {
        Self {
            macroclassifiers: Vec::new(),
            control,
        }
    }

    pub fn control(&self) -> PopulationControl {
        self.control
    }

    /// Number of macroclassifiers
    pub fn len(&self) -> usize {
        self.macroclassifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macroclassifiers.is_empty()
    }

    pub fn total_numerosity(&self) -> usize {
        self.macroclassifiers.iter().map(|m| m.numerosity).sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Macroclassifier> {
        self.macroclassifiers.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Macroclassifier> {
        self.macroclassifiers.iter_mut()
    }

    /// Add a macroclassifier, merging into an identical rule if present
    pub fn add(&mut self, macroclassifier: Macroclassifier) {
        match self
            .macroclassifiers
            .iter_mut()
            .find(|m| m.classifier == macroclassifier.classifier)
        {
            Some(existing) => existing.numerosity += macroclassifier.numerosity,
            None => self.macroclassifiers.push(macroclassifier),
        }
        self.control.control_population(&mut self.macroclassifiers);
    }

    /// Write one macroclassifier per line
    pub fn print<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        write!(out, "{}", self)
    }

    /// Read a saved population, attaching the given control strategy
    pub fn open(path: &Path, control: PopulationControl) -> Result<Self> {
        let file = File::open(path).map_err(|e| LoaderError::io(path, e))?;
        let stored: PopulationFile = serde_json::from_reader(BufReader::new(file)).map_err(|e| LoaderError::Population {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if stored.format != FORMAT_TAG {
            return Err(LoaderError::Population {
                path: path.to_path_buf(),
                reason: format!("unsupported format '{}'", stored.format),
            });
        }

        let actual = checksum(&stored.macroclassifiers)?;
        if actual != stored.checksum {
            tracing::warn!("Checksum mismatch: expected {}, got {}", stored.checksum, actual);
            return Err(LoaderError::Population {
                path: path.to_path_buf(),
                reason: "checksum mismatch".to_string(),
            });
        }

        tracing::info!("Loaded {} macroclassifiers from {}", stored.macroclassifiers.len(), path.display());
        Ok(Self {
            macroclassifiers: stored.macroclassifiers,
            control,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| LoaderError::io(parent, e))?;
        }

        let stored = PopulationFile {
            format: FORMAT_TAG.to_string(),
            checksum: checksum(&self.macroclassifiers)?,
            macroclassifiers: self.macroclassifiers.clone(),
        };

        let file = File::create(path).map_err(|e| LoaderError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &stored)?;
        writer.flush().map_err(|e| LoaderError::io(path, e))?;

        tracing::info!("Saved {} macroclassifiers to {}", self.len(), path.display());
        Ok(())
    }
}

fn checksum(macroclassifiers: &[Macroclassifier]) -> Result<String> {
    let bytes = serde_json::to_vec(macroclassifiers)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

impl fmt::Display for ClassifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.macroclassifiers {
            writeln!(f, "{}", m)?;
        }
        Ok(())
    }
}
