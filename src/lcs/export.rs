// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Per-instance classification export

use super::LearningSystem;
use crate::error::{LoaderError, Result};
use ndarray::Array2;
use std::path::{Path, PathBuf};

/// Writes one CSV record per test instance, in test-set order
pub struct ClassificationExport {
    instances: Array2<f64>,
    path: PathBuf,
    number_of_labels: usize,
}

impl ClassificationExport {
    pub fn new(instances: Array2<f64>, path: &Path, number_of_labels: usize) -> Self {
        Self {
            instances,
            path: path.to_path_buf(),
            number_of_labels,
        }
    }

    /// Classify every instance and write the records; returns the record count
    pub fn produce_classification<L: LearningSystem + ?Sized>(&self, lcs: &L) -> Result<usize> {
        let to_io = |e: csv::Error| LoaderError::io(&self.path, e.into());

        let mut writer = csv::Writer::from_path(&self.path).map_err(to_io)?;

        let mut header = vec!["instance".to_string()];
        header.extend((0..self.number_of_labels).map(|l| format!("predicted_{}", l)));
        header.extend((0..self.number_of_labels).map(|l| format!("actual_{}", l)));
        header.push("covered".to_string());
        writer.write_record(&header).map_err(to_io)?;

        let label_start = self.instances.ncols().saturating_sub(self.number_of_labels);
        let mut records = 0usize;

        for (i, row) in self.instances.rows().into_iter().enumerate() {
            let row = row.to_vec();
            let prediction = lcs.classify(&row);

            let mut record = Vec::with_capacity(2 + 2 * self.number_of_labels);
            record.push(i.to_string());
            record.extend((0..self.number_of_labels).map(|l| format_label(prediction.labels.get(l).copied())));
            record.extend((0..self.number_of_labels).map(|l| format_label(row.get(label_start + l).copied())));
            record.push(prediction.covered.to_string());

            writer.write_record(&record).map_err(to_io)?;
            records += 1;
        }

        writer.flush().map_err(|e| LoaderError::io(&self.path, e))?;
        tracing::info!("Wrote {} classification records to {}", records, self.path.display());
        Ok(records)
    }
}

fn format_label(value: Option<f64>) -> String {
    match value {
        Some(v) if !v.is_nan() => format!("{}", v),
        _ => "?".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lcs::supervised::tests::{quick_settings, threshold_matrix};
    use crate::lcs::SupervisedLcs;

    #[test]
    fn test_one_record_per_instance() {
        let mut lcs = SupervisedLcs::new(&quick_settings(1)).unwrap();
        lcs.set_instances(threshold_matrix(30));
        lcs.train().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classified.csv");
        let export = ClassificationExport::new(threshold_matrix(12), &path, 1);
        assert_eq!(export.produce_classification(&lcs).unwrap(), 12);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), vec!["instance", "predicted_0", "actual_0", "covered"]);
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 12);
        assert_eq!(&rows[3][0], "3");
    }

    #[test]
    fn test_unwritable_path_is_io_error() {
        let lcs = SupervisedLcs::new(&quick_settings(1)).unwrap();
        let export = ClassificationExport::new(threshold_matrix(2), Path::new("/nonexistent/dir/out.csv"), 1);
        assert!(matches!(export.produce_classification(&lcs), Err(LoaderError::Io { .. })));
    }
}
