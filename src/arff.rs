// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Attribute-relation (ARFF) file reader
//!
//! Supports `@relation`, `@attribute` (numeric, real, integer, string, date,
//! nominal), `@data` with dense or sparse rows, `%` comments and `?` for
//! missing values.

use crate::datasets::{Attribute, AttributeKind, Instance, Instances, Value};
use crate::error::{LoaderError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Read and parse a file from disk
pub fn read_file(path: &Path) -> Result<Instances> {
    let file = File::open(path).map_err(|e| LoaderError::io(path, e))?;
    let reader = BufReader::new(file);
    parse_reader(reader, &path.display().to_string())
}

/// Parse ARFF text held in memory
pub fn parse_str(text: &str, source_name: &str) -> Result<Instances> {
    parse_reader(text.as_bytes(), source_name)
}

fn parse_reader<R: BufRead>(reader: R, source_name: &str) -> Result<Instances> {
    let mut relation = String::new();
    let mut attributes: Vec<Attribute> = Vec::new();
    let mut rows: Vec<Instance> = Vec::new();
    let mut in_data = false;

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| LoaderError::format(source_name, Some(line_no), e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('%') {
            continue;
        }

        if in_data {
            let row = if trimmed.starts_with('{') {
                parse_sparse_row(trimmed, &attributes, source_name, line_no)?
            } else {
                parse_dense_row(trimmed, &attributes, source_name, line_no)?
            };
            rows.push(row);
            continue;
        }

        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("@relation") {
            let (name, _) = next_token(trimmed["@relation".len()..].trim_start());
            relation = name;
        } else if lower.starts_with("@attribute") {
            attributes.push(parse_attribute(&trimmed["@attribute".len()..], source_name, line_no)?);
        } else if lower.starts_with("@data") {
            if attributes.is_empty() {
                return Err(LoaderError::format(source_name, Some(line_no), "@data before any @attribute"));
            }
            in_data = true;
        } else {
            return Err(LoaderError::format(
                source_name,
                Some(line_no),
                format!("unexpected header line '{}'", trimmed),
            ));
        }
    }

    if !in_data {
        return Err(LoaderError::format(source_name, None, "missing @data section"));
    }

    Ok(Instances::new(&relation, attributes, rows))
}

fn parse_attribute(decl: &str, source_name: &str, line_no: usize) -> Result<Attribute> {
    let (name, rest) = next_token(decl.trim_start());
    if name.is_empty() {
        return Err(LoaderError::format(source_name, Some(line_no), "attribute without a name"));
    }
    let declared = rest.trim();

    let kind = if declared.starts_with('{') {
        let inner = declared
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .ok_or_else(|| LoaderError::format(source_name, Some(line_no), "unterminated nominal declaration"))?;
        let values: Vec<String> = inner
            .split(',')
            .map(|v| unquote(v.trim()).to_string())
            .filter(|v| !v.is_empty())
            .collect();
        AttributeKind::Nominal(values)
    } else {
        let type_name = declared.split_whitespace().next().unwrap_or("").to_ascii_lowercase();
        match type_name.as_str() {
            "numeric" | "real" | "integer" => AttributeKind::Numeric,
            "string" | "date" => AttributeKind::String,
            other => {
                return Err(LoaderError::format(
                    source_name,
                    Some(line_no),
                    format!("unsupported attribute type '{}' for '{}'", other, name),
                ))
            }
        }
    };

    Ok(Attribute { name, kind })
}

fn parse_dense_row(line: &str, attributes: &[Attribute], source_name: &str, line_no: usize) -> Result<Instance> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .quote(row_quote(line))
        .trim(csv::Trim::All)
        .from_reader(line.as_bytes());

    let record = reader
        .records()
        .next()
        .ok_or_else(|| LoaderError::format(source_name, Some(line_no), "empty data row"))?
        .map_err(|e| LoaderError::format(source_name, Some(line_no), e.to_string()))?;

    if record.len() != attributes.len() {
        return Err(LoaderError::format(
            source_name,
            Some(line_no),
            format!("expected {} values, found {}", attributes.len(), record.len()),
        ));
    }

    let values = record
        .iter()
        .zip(attributes)
        .map(|(raw, attr)| parse_value(raw, attr, source_name, line_no))
        .collect::<Result<Vec<_>>>()?;

    Ok(Instance::new(values))
}

// The csv reader honours one quote character per row: whichever opens the
// first quoted field. Unquoted rows default to single quotes.
fn row_quote(line: &str) -> u8 {
    line.split(',')
        .map(str::trim_start)
        .find_map(|field| match field.as_bytes().first() {
            Some(&q @ (b'\'' | b'"')) => Some(q),
            _ => None,
        })
        .unwrap_or(b'\'')
}

fn parse_sparse_row(line: &str, attributes: &[Attribute], source_name: &str, line_no: usize) -> Result<Instance> {
    let inner = line
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| LoaderError::format(source_name, Some(line_no), "unterminated sparse row"))?;

    let mut values: Vec<Value> = attributes.iter().map(sparse_default).collect();

    for entry in inner.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (index, raw) = entry
            .split_once(char::is_whitespace)
            .ok_or_else(|| LoaderError::format(source_name, Some(line_no), format!("bad sparse entry '{}'", entry)))?;
        let index: usize = index
            .parse()
            .map_err(|_| LoaderError::format(source_name, Some(line_no), format!("bad sparse index '{}'", index)))?;
        let attr = attributes.get(index).ok_or_else(|| {
            LoaderError::format(source_name, Some(line_no), format!("sparse index {} out of range", index))
        })?;
        values[index] = parse_value(raw.trim(), attr, source_name, line_no)?;
    }

    Ok(Instance::new(values))
}

// Omitted sparse entries are zero, i.e. the first declared nominal value.
fn sparse_default(attr: &Attribute) -> Value {
    match &attr.kind {
        AttributeKind::Numeric => Value::Numeric(0.0),
        AttributeKind::Nominal(values) => values.first().cloned().map(Value::Nominal).unwrap_or(Value::Missing),
        AttributeKind::String => Value::Missing,
    }
}

fn parse_value(raw: &str, attr: &Attribute, source_name: &str, line_no: usize) -> Result<Value> {
    let raw = unquote(raw.trim());
    if raw == "?" {
        return Ok(Value::Missing);
    }

    match &attr.kind {
        AttributeKind::Numeric => raw.parse::<f64>().map(Value::Numeric).map_err(|_| {
            LoaderError::format(
                source_name,
                Some(line_no),
                format!("'{}' is not numeric for attribute '{}'", raw, attr.name),
            )
        }),
        AttributeKind::Nominal(declared) => {
            if declared.iter().any(|v| v == raw) {
                Ok(Value::Nominal(raw.to_string()))
            } else {
                Err(LoaderError::format(
                    source_name,
                    Some(line_no),
                    format!("'{}' is not a declared value of '{}'", raw, attr.name),
                ))
            }
        }
        AttributeKind::String => Ok(Value::Text(raw.to_string())),
    }
}

/// Split off the first (possibly quoted) token
fn next_token(s: &str) -> (String, &str) {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, q @ ('\'' | '"'))) => match s[1..].find(q) {
            Some(end) => (s[1..end + 1].to_string(), &s[end + 2..]),
            None => (s[1..].to_string(), ""),
        },
        Some(_) => {
            let end = s.find(|c: char| c.is_whitespace() || c == '{').unwrap_or(s.len());
            (s[..end].to_string(), &s[end..])
        }
        None => (String::new(), ""),
    }
}

fn unquote(s: &str) -> &str {
    for q in ['\'', '"'] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEATHER: &str = r#"
% classic toy relation
@relation weather

@attribute outlook {sunny, overcast, rainy}
@attribute temperature numeric
@attribute 'wind speed' real
@attribute note string
@attribute play {yes, no}

@data
sunny,85,3.5,'hot, dry',no
overcast,83,?,calm,yes
rainy, 70 , 1.0 ,"damp",yes
"#;

    #[test]
    fn test_parse_dense() {
        let set = parse_str(WEATHER, "weather.arff").unwrap();
        assert_eq!(set.relation, "weather");
        assert_eq!(set.num_attributes(), 5);
        assert_eq!(set.num_instances(), 3);
        assert_eq!(set.attributes[2].name, "wind speed");
        assert_eq!(set.class_index(), None);

        assert_eq!(set.rows[0].values[0], Value::Nominal("sunny".to_string()));
        assert_eq!(set.rows[0].values[3], Value::Text("hot, dry".to_string()));
        assert_eq!(set.rows[1].values[2], Value::Missing);
        assert_eq!(set.rows[2].values[1], Value::Numeric(70.0));
        assert_eq!(set.rows[2].values[3], Value::Text("damp".to_string()));
    }

    #[test]
    fn test_double_quoted_value_with_comma() {
        let text = "@relation r\n@attribute note string\n@attribute c {a,b}\n@data\n\"hot, dry\",a\n'cold, wet',b\n";
        let set = parse_str(text, "r.arff").unwrap();
        assert_eq!(
            set.rows[0].values,
            vec![Value::Text("hot, dry".to_string()), Value::Nominal("a".to_string())]
        );
        assert_eq!(
            set.rows[1].values,
            vec![Value::Text("cold, wet".to_string()), Value::Nominal("b".to_string())]
        );
    }

    #[test]
    fn test_nominal_declaration_without_space() {
        let text = "@relation r\n@attribute x numeric\n@attribute class{yes,no}\n@data\n1,yes\n";
        let set = parse_str(text, "r.arff").unwrap();
        assert_eq!(set.attributes[1].name, "class");
        assert_eq!(set.attributes[1].kind, AttributeKind::Nominal(vec!["yes".to_string(), "no".to_string()]));
        assert_eq!(set.rows[0].values[1], Value::Nominal("yes".to_string()));
    }

    #[test]
    fn test_parse_sparse() {
        let text = r#"@relation scene
@attribute f1 numeric
@attribute f2 numeric
@attribute l1 {0,1}
@attribute l2 {0,1}
@data
{0 0.5, 3 1}
{1 2.0, 2 1, 3 1}
"#;
        let set = parse_str(text, "scene.arff").unwrap();
        assert_eq!(set.num_instances(), 2);
        assert_eq!(
            set.rows[0].values,
            vec![
                Value::Numeric(0.5),
                Value::Numeric(0.0),
                Value::Nominal("0".to_string()),
                Value::Nominal("1".to_string()),
            ]
        );
        assert_eq!(set.rows[1].values[2], Value::Nominal("1".to_string()));
    }

    #[test]
    fn test_undeclared_nominal_rejected_with_line() {
        let text = "@relation r\n@attribute c {a,b}\n@data\na\nz\n";
        let err = parse_str(text, "r.arff").unwrap_err();
        match err {
            LoaderError::InputFormat { line, .. } => assert_eq!(line, Some(5)),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_wrong_arity_rejected() {
        let text = "@relation r\n@attribute x numeric\n@attribute y numeric\n@data\n1,2,3\n";
        assert!(matches!(parse_str(text, "r.arff"), Err(LoaderError::InputFormat { .. })));
    }

    #[test]
    fn test_missing_data_section_rejected() {
        let text = "@relation r\n@attribute x numeric\n";
        assert!(matches!(parse_str(text, "r.arff"), Err(LoaderError::InputFormat { .. })));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_file(Path::new("/nonexistent/data.arff")).unwrap_err();
        assert!(matches!(err, LoaderError::Io { .. }));
    }
}
