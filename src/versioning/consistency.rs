//! `latest` alias consistency
//!
//! A file under `latest/` must be identical, after line-ending
//! normalization, to the same-named file in the highest version directory.

use super::{LATEST, VersionDirectory, highest};
use crate::catalog::AssetPath;
use crate::error::ConformanceError;
use similar::TextDiff;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone, Copy)]
pub struct VersionConsistencyChecker;

impl VersionConsistencyChecker {
    pub fn new() -> Self {
        Self
    }

    /// Succeeds for files outside a `latest` directory, and when no version
    /// siblings exist.
    pub fn check(&self, asset: &AssetPath) -> Result<(), ConformanceError> {
        let latest_file = asset.absolute();
        let Some(latest_dir) = latest_file.parent() else {
            return Ok(());
        };
        if latest_dir.file_name().and_then(|name| name.to_str()) != Some(LATEST) {
            return Ok(());
        }
        let Some(family) = latest_dir.parent() else {
            return Ok(());
        };

        let Some(version) = highest_sibling(family)? else {
            tracing::debug!(asset = %asset, "no versioned directories");
            return Ok(());
        };
        tracing::debug!(asset = %asset, version = %version, "comparing with highest version");

        let file_name = asset.file_name();
        let versioned = family.join(version.name()).join(file_name);
        let versioned_display = display_sibling(asset, version.name());
        if !versioned.is_file() {
            return Err(ConformanceError::MissingCounterpart {
                latest: asset.relative().to_path_buf(),
                expected: versioned_display,
            });
        }

        let versioned_text = read_text(&versioned, &versioned_display)?;
        let latest_text = read_text(latest_file, asset.relative())?;
        match unified_diff(
            &versioned_text,
            &latest_text,
            &versioned_display.to_string_lossy(),
            &asset.display_relative(),
        ) {
            None => Ok(()),
            Some(diff) => Err(ConformanceError::VersionMismatch {
                versioned: versioned_display,
                latest: asset.relative().to_path_buf(),
                diff,
            }),
        }
    }
}

fn highest_sibling(family: &Path) -> Result<Option<VersionDirectory>, ConformanceError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(family).map_err(|e| ConformanceError::io(family, e))? {
        let entry = entry.map_err(|e| ConformanceError::io(family, e))?;
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(highest(names.iter().map(String::as_str)))
}

fn display_sibling(asset: &AssetPath, version: &str) -> PathBuf {
    let relative = asset.relative();
    match relative.parent().and_then(Path::parent) {
        Some(family) => family.join(version).join(asset.file_name()),
        None => PathBuf::from(version).join(asset.file_name()),
    }
}

fn read_text(path: &Path, display: &Path) -> Result<String, ConformanceError> {
    let bytes = fs::read(path).map_err(|e| ConformanceError::io(display, e))?;
    String::from_utf8(bytes)
        .map(|text| text.replace("\r\n", "\n"))
        .map_err(|e| ConformanceError::NotDecodable {
            path: display.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Line-level unified diff, or `None` when the texts are equal.
pub fn unified_diff(old: &str, new: &str, old_name: &str, new_name: &str) -> Option<String> {
    if old == new {
        return None;
    }
    Some(
        TextDiff::from_lines(old, new)
            .unified_diff()
            .header(old_name, new_name)
            .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &[u8]) -> AssetPath {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        AssetPath::new(root, &path)
    }

    #[test]
    fn identical_files_pass() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "onto/X/v1/X.ttl", b"old\n");
        write(dir.path(), "onto/X/v2/X.ttl", b"a\nb\n");
        let latest = write(dir.path(), "onto/X/latest/X.ttl", b"a\r\nb\r\n");

        assert!(VersionConsistencyChecker.check(&latest).is_ok());
    }

    #[test]
    fn differing_files_carry_a_diff() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "onto/X/v2/X.ttl", b"a\nb\n");
        let latest = write(dir.path(), "onto/X/latest/X.ttl", b"a\nc\n");

        let error = VersionConsistencyChecker.check(&latest).unwrap_err();
        assert!(error.to_string().starts_with("files are different: onto/X/v2/X.ttl onto/X/latest/X.ttl"));
        assert_matches!(error, ConformanceError::VersionMismatch { ref diff, .. } if diff.contains("-b") && diff.contains("+c"));
    }

    #[test]
    fn missing_counterpart() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("onto/X/v2")).unwrap();
        let latest = write(dir.path(), "onto/X/latest/X.ttl", b"a\n");

        assert_matches!(
            VersionConsistencyChecker.check(&latest),
            Err(ConformanceError::MissingCounterpart { ref expected, .. }) if expected == Path::new("onto/X/v2/X.ttl")
        );
    }

    #[test]
    fn undecodable_content() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "onto/X/v1/X.csv", &[0xff, 0xfe, 0x00]);
        let latest = write(dir.path(), "onto/X/latest/X.csv", b"a\n");

        assert_matches!(
            VersionConsistencyChecker.check(&latest),
            Err(ConformanceError::NotDecodable { .. })
        );
    }

    #[test]
    fn outside_latest_and_without_siblings_is_ok() {
        let dir = TempDir::new().unwrap();
        let versioned = write(dir.path(), "onto/X/v1/X.ttl", b"a\n");
        let lonely = write(dir.path(), "onto/Y/latest/Y.ttl", b"a\n");
        write(dir.path(), "onto/Y/v.draft/Y.ttl", b"b\n");

        assert!(VersionConsistencyChecker.check(&versioned).is_ok());
        assert!(VersionConsistencyChecker.check(&lonely).is_ok());
    }

    #[test]
    fn diff_is_none_for_equal_text() {
        assert_eq!(unified_diff("a\n", "a\n", "x", "y"), None);
        assert!(unified_diff("a\n", "b\n", "x", "y").is_some());
    }
}
