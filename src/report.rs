//! Aggregated validation report
//!
//! Errors are plain strings keyed by nothing but their text: two workers
//! reporting the same failure produce one entry. Merging is a set union, so
//! the result does not depend on the order in which workers finish.

use crate::catalog::AssetPath;
use crate::error::ConformanceError;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Deduplicated, append-only set of error messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    errors: BTreeSet<String>,
    files_checked: usize,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.errors.insert(message.into());
    }

    /// Record one file's outcome.
    pub fn record(&mut self, outcome: FileOutcome) {
        self.files_checked += 1;
        self.errors.extend(outcome.errors);
    }

    /// Set union with another report.
    pub fn merge(&mut self, other: ValidationReport) {
        self.files_checked += other.files_checked;
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn files_checked(&self) -> usize {
        self.files_checked
    }

    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(String::as_str)
    }

    /// Process exit status for this report.
    pub fn exit_code(&self) -> i32 {
        if self.is_empty() { 0 } else { 1 }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "All {} files are valid.", self.files_checked);
        }
        for error in &self.errors {
            writeln!(f, "ERROR: {error}")?;
        }
        Ok(())
    }
}

impl FromIterator<FileOutcome> for ValidationReport {
    fn from_iter<I: IntoIterator<Item = FileOutcome>>(iter: I) -> Self {
        let mut report = ValidationReport::new();
        for outcome in iter {
            report.record(outcome);
        }
        report
    }
}

/// Errors collected for a single asset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileOutcome {
    pub relative_path: String,
    pub errors: Vec<String>,
}

impl FileOutcome {
    pub fn new(asset: &AssetPath) -> Self {
        Self {
            relative_path: asset.display_relative(),
            errors: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn push_error(&mut self, error: &ConformanceError) {
        error.track();
        self.errors.push(error.to_string());
    }

    /// Record an error whose message does not name its location.
    pub fn push_error_at(&mut self, at: impl fmt::Display, error: &ConformanceError) {
        error.track();
        self.errors.push(format!("{at}: {error}"));
    }
}
