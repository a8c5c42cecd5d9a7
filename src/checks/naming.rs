//! File and directory naming checks

use super::{StructureCheck, file_stem};
use crate::error::ConformanceError;
use crate::validators::ValidationInput;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Component, Path};

static NAME_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\.a-z0-9_-]{2,64}$").expect("name pattern compiles"));

/// Extensions whose names and directories are format-checked.
const FORMATTED_EXTENSIONS: &[&str] = &["ttl", "rdf", "csv", "yaml"];

/// Directory levels checked above the file.
const FORMATTED_ANCESTORS: usize = 3;

/// Files that live in a directory without being named after it.
const UNNAMED_FILES: &[&str] = &[
    "index.ttl",
    "datapackage.json",
    "context-short.ld.yaml",
    "rules.shacl",
    "latest",
    "schema.oas3.yaml",
];

const UNNAMED_SUFFIXES: &[&str] = &[
    ".md",
    ".shacl",
    ".frame.yamlld",
    ".ld.yaml",
    ".schema.yaml",
    ".example.yaml",
    ".example.ttl",
    ".png",
    ".html",
    ".xml",
    ".xsd",
];

/// Stems and nearby directory names are lowercase and 2 to 64 characters.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilenameFormatCheck;

impl StructureCheck for FilenameFormatCheck {
    fn name(&self) -> &str {
        "filename-format"
    }

    fn description(&self) -> &str {
        "File and directory names are lowercase and 2 to 64 characters"
    }

    fn check(&self, input: &ValidationInput<'_>) -> Result<(), ConformanceError> {
        let path = input.path.relative();
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !FORMATTED_EXTENSIONS.contains(&extension) {
            return Ok(());
        }

        let mut invalid = Vec::new();
        let ancestors = path
            .parent()
            .into_iter()
            .flat_map(Path::ancestors)
            .filter_map(|dir| dir.file_name().and_then(|n| n.to_str()))
            .take(FORMATTED_ANCESTORS);
        for name in ancestors {
            if !NAME_FORMAT.is_match(name) {
                invalid.push(format!("directory {name:?}"));
            }
        }
        let stem = file_stem(input.path.file_name());
        if !NAME_FORMAT.is_match(stem) {
            invalid.push(format!("file {stem:?}"));
        }

        if invalid.is_empty() {
            return Ok(());
        }
        Err(ConformanceError::Structure(format!(
            "Invalid name format in {}: {}",
            input.path,
            invalid.join(", ")
        )))
    }
}

/// A file's base name matches one of its ancestor directories.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilenameMatchDirectoryCheck;

impl StructureCheck for FilenameMatchDirectoryCheck {
    fn name(&self) -> &str {
        "filename-match-directory"
    }

    fn description(&self) -> &str {
        "File names match one of their parent directories"
    }

    fn check(&self, input: &ValidationInput<'_>) -> Result<(), ConformanceError> {
        let file_name = input.path.file_name();
        if UNNAMED_FILES.contains(&file_name)
            || UNNAMED_SUFFIXES.iter().any(|suffix| file_name.ends_with(suffix))
        {
            return Ok(());
        }

        let base = base_name(file_name);
        let parent = input.path.relative().parent().unwrap_or(Path::new(""));
        let matched = parent.components().any(|component| match component {
            Component::Normal(part) => part == base,
            _ => false,
        });
        if matched {
            return Ok(());
        }
        Err(ConformanceError::Structure(format!(
            "File name {base:?} does not match any parent directory of {}",
            input.path
        )))
    }
}

/// Name without up to two trailing extensions (`person.oas3.yaml` is
/// `person`).
fn base_name(file_name: &str) -> &str {
    let once = file_stem(file_name);
    if once.len() < file_name.len() && once.contains('.') {
        file_stem(once)
    } else {
        once
    }
}
