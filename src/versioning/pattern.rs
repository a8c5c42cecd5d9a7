//! Version directory naming consistency

use super::LATEST;
use crate::catalog::AssetPath;
use crate::error::ConformanceError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

static VERSION_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(latest|v?\d+(\.\d+){0,2})$").expect("version pattern compiles"));
static VERSIONED_DIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(latest|\b(?:\D*\d\D*)+\b)").expect("directory pattern compiles"));
static V_PREFIXED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^v\d").expect("prefix pattern compiles"));

/// True when `dir` has no subdirectories.
pub fn is_leaf_directory(dir: &Path) -> bool {
    match fs::read_dir(dir) {
        Ok(entries) => !entries
            .filter_map(Result::ok)
            .any(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false)),
        Err(_) => false,
    }
}

pub fn is_versioned_directory(name: &str) -> bool {
    VERSIONED_DIR.is_match(name)
}

/// Version siblings of a file's directory must all be `v`-prefixed or all
/// start with a digit, and all match the version pattern.
///
/// Only leaf version directories other than `latest` with at least two
/// version siblings are checked.
#[derive(Debug, Default, Clone, Copy)]
pub struct VersioningPatternCheck;

impl VersioningPatternCheck {
    pub fn check(&self, asset: &AssetPath) -> Result<(), ConformanceError> {
        let Some(dir) = asset.absolute().parent() else {
            return Ok(());
        };
        let name = dir.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if !dir.is_dir() || !is_leaf_directory(dir) || !is_versioned_directory(name) || name == LATEST {
            tracing::debug!(dir = name, "not a leaf version directory");
            return Ok(());
        }
        let Some(family) = dir.parent() else {
            return Ok(());
        };

        let mut versions = sibling_directories(family)?;
        versions.retain(|version| version != LATEST);
        if versions.len() < 2 {
            return Ok(());
        }
        versions.sort();

        let dir_display = asset
            .relative()
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();

        let all_prefixed = versions.iter().all(|v| V_PREFIXED.is_match(v));
        let all_numeric = versions
            .iter()
            .all(|v| v.chars().next().is_some_and(|c| c.is_ascii_digit()));
        if !(all_prefixed || all_numeric) {
            return Err(ConformanceError::Structure(format!(
                "Inconsistent versioning pattern found for {dir_display}: {versions:?}"
            )));
        }
        if !versions.iter().all(|v| VERSION_NAME.is_match(v)) {
            return Err(ConformanceError::Structure(format!(
                "Inconsistent versioning pattern found for {asset}: {versions:?}"
            )));
        }
        Ok(())
    }
}

fn sibling_directories(family: &Path) -> Result<Vec<String>, ConformanceError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(family).map_err(|e| ConformanceError::io(family, e))? {
        let entry = entry.map_err(|e| ConformanceError::io(family, e))?;
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}
