// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Conversion of tabular instances to the numeric form the learner consumes

use crate::datasets::{AttributeKind, Instances, Value};
use crate::error::{LoaderError, Result};
use ndarray::Array2;

/// Convert every instance to a row of `f64`, columns in schema order.
///
/// Nominal values become their declaration index and missing values become
/// `NaN`. String values must parse as numbers.
pub fn to_numeric_matrix(set: &Instances) -> Result<Array2<f64>> {
    let n_rows = set.num_instances();
    let n_cols = set.num_attributes();
    let mut matrix = Array2::<f64>::zeros((n_rows, n_cols));

    for (i, row) in set.rows.iter().enumerate() {
        if row.values.len() != n_cols {
            return Err(LoaderError::format(
                set.relation.clone(),
                None,
                format!("instance {} has {} values, schema has {}", i, row.values.len(), n_cols),
            ));
        }
        for (j, (value, attr)) in row.values.iter().zip(&set.attributes).enumerate() {
            matrix[[i, j]] = match (value, &attr.kind) {
                (Value::Missing, _) => f64::NAN,
                (Value::Numeric(v), _) => *v,
                (Value::Nominal(label), AttributeKind::Nominal(_)) => attr.index_of(label).ok_or_else(|| {
                    LoaderError::format(
                        set.relation.clone(),
                        None,
                        format!("instance {}: '{}' is not a declared value of '{}'", i, label, attr.name),
                    )
                })? as f64,
                (Value::Nominal(text), _) | (Value::Text(text), _) => text.trim().parse::<f64>().map_err(|_| {
                    LoaderError::format(
                        set.relation.clone(),
                        None,
                        format!("instance {}: cannot coerce '{}' of '{}' to a number", i, text, attr.name),
                    )
                })?,
            };
        }
    }

    Ok(matrix)
}

/// Columns holding the labels: the `number_of_labels` attributes ending at
/// the class index, or the trailing columns when no class index is set.
pub fn label_columns(set: &Instances, number_of_labels: usize) -> Result<std::ops::Range<usize>> {
    let end = set.class_index().map(|c| c + 1).unwrap_or_else(|| set.num_attributes());
    if number_of_labels == 0 || number_of_labels > end {
        return Err(LoaderError::Configuration(format!(
            "{} labels do not fit before class index {} of '{}'",
            number_of_labels,
            end.saturating_sub(1),
            set.relation
        )));
    }
    Ok(end - number_of_labels..end)
}

/// Mean number of positive labels per instance.
///
/// Multi-label indicators count as positive when their value is `1`; a
/// single-label instance counts one label unless its class is missing.
/// An empty dataset yields `0.0`.
pub fn label_cardinality(set: &Instances, number_of_labels: usize) -> Result<f64> {
    if set.is_empty() {
        return Ok(0.0);
    }

    let columns = label_columns(set, number_of_labels)?;
    let matrix = to_numeric_matrix(set)?;

    let positives: usize = matrix
        .rows()
        .into_iter()
        .map(|row| {
            if number_of_labels == 1 {
                usize::from(!row[columns.start].is_nan())
            } else {
                columns.clone().filter(|&c| row[c] == 1.0).count()
            }
        })
        .sum();

    Ok(positives as f64 / set.num_instances() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arff;
    use crate::datasets::{Attribute, Instance};

    fn multi_label() -> Instances {
        let text = r#"@relation emotions
@attribute f1 numeric
@attribute colour {red,green}
@attribute amazed {0,1}
@attribute happy {0,1}
@attribute sad {0,1}
@data
0.1,red,1,1,0
0.2,green,0,0,0
0.3,red,1,1,1
?,green,0,1,0
"#;
        arff::parse_str(text, "emotions.arff").unwrap()
    }

    #[test]
    fn test_matrix_values() {
        let set = multi_label();
        let m = to_numeric_matrix(&set).unwrap();
        assert_eq!(m.dim(), (4, 5));
        assert_eq!(m[[0, 0]], 0.1);
        assert_eq!(m[[1, 1]], 1.0);
        assert_eq!(m[[2, 4]], 1.0);
        assert!(m[[3, 0]].is_nan());
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let set = multi_label();
        let a = to_numeric_matrix(&set).unwrap();
        let b = to_numeric_matrix(&set).unwrap();
        // NaN != NaN, so compare bit patterns
        let bits = |m: &Array2<f64>| m.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn test_uncoercible_text_fails() {
        let set = Instances::new(
            "notes",
            vec![Attribute {
                name: "note".to_string(),
                kind: AttributeKind::String,
            }],
            vec![Instance::new(vec![Value::Text("12.5".to_string())]), Instance::new(vec![Value::Text("twelve".to_string())])],
        );
        let err = to_numeric_matrix(&set).unwrap_err();
        assert!(matches!(err, LoaderError::InputFormat { .. }));
    }

    #[test]
    fn test_undeclared_nominal_fails() {
        let set = Instances::new(
            "bad",
            vec![Attribute::nominal("c", &["a", "b"])],
            vec![Instance::new(vec![Value::Nominal("z".to_string())])],
        );
        assert!(matches!(to_numeric_matrix(&set), Err(LoaderError::InputFormat { .. })));
    }

    #[test]
    fn test_label_cardinality_multi_label() {
        let set = multi_label();
        // 2 + 0 + 3 + 1 positives over 4 rows
        let card = label_cardinality(&set, 3).unwrap();
        assert!((card - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_label_cardinality_single_label() {
        let mut set = multi_label();
        set.rows[1].values[4] = Value::Missing;
        let card = label_cardinality(&set, 1).unwrap();
        assert!((card - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_label_cardinality_empty() {
        let mut set = multi_label();
        set.rows.clear();
        assert_eq!(label_cardinality(&set, 3).unwrap(), 0.0);
    }

    #[test]
    fn test_label_columns_follow_class_index() {
        let mut set = multi_label();
        assert_eq!(label_columns(&set, 3).unwrap(), 2..5);
        set.set_class_index(3).unwrap();
        assert_eq!(label_columns(&set, 2).unwrap(), 2..4);
        assert!(label_columns(&set, 5).is_err());
    }
}
