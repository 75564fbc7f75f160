// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Error types for loading, training and evaluation

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for loader operations
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Errors raised while loading data, training or reporting
#[derive(Error, Debug)]
pub enum LoaderError {
    /// Invalid settings, detected before training starts
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Dataset text or a value inside it could not be interpreted
    #[error("Input format error in {source_name}{}: {reason}", .line.map(|l| format!(" (line {})", l)).unwrap_or_default())]
    InputFormat {
        source_name: String,
        line: Option<usize>,
        reason: String,
    },

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Persisted rule population is malformed
    #[error("Population file error in {}: {reason}", .path.display())]
    Population { path: PathBuf, reason: String },

    /// An operation was called before the state it needs exists
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LoaderError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LoaderError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn format(source_name: impl Into<String>, line: Option<usize>, reason: impl Into<String>) -> Self {
        LoaderError::InputFormat {
            source_name: source_name.into(),
            line,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_format_message_includes_line() {
        let err = LoaderError::format("iris.arff", Some(12), "bad value");
        assert_eq!(err.to_string(), "Input format error in iris.arff (line 12): bad value");

        let err = LoaderError::format("iris.arff", None, "bad value");
        assert_eq!(err.to_string(), "Input format error in iris.arff: bad value");
    }

    #[test]
    fn test_io_message_includes_path() {
        let err = LoaderError::io("/tmp/missing.json", std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(err.to_string().contains("/tmp/missing.json"));
    }
}
