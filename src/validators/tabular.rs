//! Tabular (CSV) validator
//!
//! Structural checks on comma-separated files: a header row with unique,
//! non-empty labels, and rows of the same width. When a sibling
//! `datapackage.{json,yaml,yml}` declares a resource for the file, the header
//! must match its declared fields; otherwise every label must be a
//! publishable field name.

use super::{ValidationInput, Validator, ValidatorOutcome};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

static FIELD_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]{2,64}$").expect("field pattern compiles"));

const DATAPACKAGE_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

/// Errors reported per file before the rest are elided.
const MAX_REPORTED: usize = 20;

pub struct TabularValidator;

impl Validator for TabularValidator {
    fn name(&self) -> &str {
        "tabular"
    }

    fn description(&self) -> &str {
        "Checks CSV structure and header names"
    }

    fn validate(&self, input: &ValidationInput<'_>) -> ValidatorOutcome {
        let text = match input.text() {
            Ok(text) => text,
            Err(outcome) => return outcome,
        };
        let declared = input
            .path
            .absolute()
            .parent()
            .and_then(|dir| declared_fields(dir, input.path.file_name()));

        let errors = check_table(text, declared.as_deref());
        if errors.is_empty() {
            return ValidatorOutcome::pass();
        }
        let shown: Vec<_> = errors.iter().take(MAX_REPORTED).map(String::as_str).collect();
        let mut fragment = format!("Invalid file: {}:\n\t{}", input.path, shown.join("\n\t"));
        if errors.len() > MAX_REPORTED {
            fragment.push_str(&format!("\n\t... and {} more", errors.len() - MAX_REPORTED));
        }
        ValidatorOutcome::fail(fragment)
    }
}

/// Field names declared for `file_name` by a sibling data package.
fn declared_fields(dir: &Path, file_name: &str) -> Option<Vec<String>> {
    for extension in DATAPACKAGE_EXTENSIONS {
        let candidate = dir.join(format!("datapackage.{extension}"));
        let Ok(content) = fs::read_to_string(&candidate) else {
            continue;
        };
        let package: Value = match serde_yaml::from_str(&content) {
            Ok(package) => package,
            Err(error) => {
                tracing::warn!(package = %candidate.display(), error = %error, "unreadable data package");
                continue;
            }
        };
        let resource = package
            .get("resources")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .find(|resource| resource.get("path").and_then(Value::as_str) == Some(file_name));
        if let Some(resource) = resource {
            tracing::debug!(package = %candidate.display(), file = file_name, "resource metadata found");
            let fields = resource
                .pointer("/schema/fields")
                .and_then(Value::as_array)
                .map(|fields| {
                    fields
                        .iter()
                        .filter_map(|field| field.get("name").and_then(Value::as_str))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            return Some(fields);
        }
    }
    None
}

fn check_table(text: &str, declared: Option<&[String]>) -> Vec<String> {
    let mut errors = Vec::new();
    let records = match parse_records(text.strip_prefix('\u{feff}').unwrap_or(text)) {
        Ok(records) => records,
        Err(error) => return vec![error],
    };
    let mut rows = records.into_iter();
    let Some((_, header)) = rows.next() else {
        return vec!["file has no header row".to_string()];
    };

    let mut seen = HashSet::new();
    for (position, label) in header.iter().enumerate() {
        if label.trim().is_empty() {
            errors.push(format!("Blank label in column {}", position + 1));
        } else if !seen.insert(label.as_str()) {
            errors.push(format!("Duplicate label \"{label}\" in column {}", position + 1));
        }
    }

    match declared {
        Some(fields) if !fields.is_empty() => {
            if header.as_slice() != fields {
                errors.push(format!(
                    "Header {header:?} does not match the declared fields {fields:?}"
                ));
            }
        }
        Some(_) => {}
        None => {
            for label in header.iter().filter(|label| !FIELD_NAME.is_match(label)) {
                errors.push(format!("Invalid field name for publication: {label}"));
            }
        }
    }

    for (line, row) in rows {
        if row.iter().all(|cell| cell.is_empty()) {
            errors.push(format!("Row at line {line} is completely blank"));
        } else if row.len() > header.len() {
            errors.push(format!("Row at line {line} has an extra cell"));
        } else if row.len() < header.len() {
            errors.push(format!("Row at line {line} has a missing cell"));
        }
    }
    errors
}

/// Records of `text`, each tagged with the line it starts on. Rows may
/// differ in width; blank lines are not records.
fn parse_records(text: &str) -> Result<Vec<(u64, Vec<String>)>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    reader
        .records()
        .map(|record| {
            let record = record.map_err(|e| format!("Unreadable CSV: {e}"))?;
            let line = record.position().map_or(0, |position| position.line());
            Ok((line, record.iter().map(str::to_string).collect()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AssetPath;
    use tempfile::TempDir;

    #[test]
    fn parses_quoted_fields() {
        let records = parse_records("a,b\n\"x, y\",\"say \"\"hi\"\"\"\r\n\"multi\nline\",z\n").unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].1, vec!["x, y", "say \"hi\""]);
        assert_eq!(records[2], (3, vec!["multi\nline".to_string(), "z".to_string()]));
    }

    #[test]
    fn blank_lines_are_not_rows() {
        let records = parse_records("code,name\n\n1,2\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].0, 3);
        assert!(check_table("code,name\n\n1,2\n", None).is_empty());
    }

    #[test]
    fn reports_structural_problems() {
        let errors = check_table("code,code,\n1,2,3,4\n1\n,,\n", None);
        assert!(errors.iter().any(|e| e.contains("Duplicate label")));
        assert!(errors.iter().any(|e| e.contains("Blank label")));
        assert!(errors.iter().any(|e| e.contains("extra cell")));
        assert!(errors.iter().any(|e| e.contains("missing cell")));
        assert!(errors.iter().any(|e| e.contains("completely blank")));
    }

    #[test]
    fn field_names_are_checked_without_a_package() {
        let errors = check_table("code,label it\n1,uno\n", None);
        assert_eq!(errors, vec!["Invalid field name for publication: label it"]);
    }

    #[test]
    fn datapackage_supplies_fields() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("datapackage.yaml"),
            "resources:\n  - path: codes.csv\n    schema:\n      fields:\n        - name: code\n        - name: label it\n",
        )
        .unwrap();
        let csv = dir.path().join("codes.csv");
        fs::write(&csv, "code,label it\n1,uno\n").unwrap();

        let asset = AssetPath::new(dir.path(), &csv);
        let content = fs::read(&csv).unwrap();
        let outcome = TabularValidator.validate(&ValidationInput::new(&asset, &content));
        assert!(outcome.valid, "{}", outcome.fragment);

        fs::write(&csv, "code,label\n1,uno\n").unwrap();
        let content = fs::read(&csv).unwrap();
        let outcome = TabularValidator.validate(&ValidationInput::new(&asset, &content));
        assert!(!outcome.valid);
        assert!(outcome.fragment.contains("declared fields"));
    }
}
