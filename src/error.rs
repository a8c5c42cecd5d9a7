//! Error taxonomy for the conformance engine
//!
//! This module provides:
//! - A typed error for every failure the engine can attribute to one asset
//! - Stable error kinds with numeric codes and metric categories
//! - Helpers to convert per-file failures into report lines
//!
//! Per-file errors never abort a run; they are rendered into the
//! [`ValidationReport`](crate::report::ValidationReport). Only
//! [`ConformanceError::Config`] is raised before processing starts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// =============================================================================
// ERROR KINDS
// =============================================================================

/// Stable identifiers for each error family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ErrorKind {
    /// Malformed rule file
    RuleLoad = 1001,
    /// Semantic reference could not be resolved
    MissingDependency = 1002,
    /// `latest` alias diverges from the highest version
    VersionMismatch = 1003,
    /// `latest` file has no counterpart in the highest version
    MissingCounterpart = 1004,
    /// File content could not be decoded as UTF-8 text
    NotDecodable = 1005,
    /// No validator route matches the file name
    UnsupportedFile = 1006,
    /// File exceeds the size ceiling
    FileTooLarge = 1007,
    /// A collaborator validator rejected the content
    ValidatorFailure = 1008,
    /// Embedded JSON-LD context could not be normalized
    InvalidContext = 1009,
    /// Remote ontology fetch failed
    Fetch = 1010,
    /// Structure or naming rule violated
    Structure = 1011,
    /// File system error
    Io = 1012,
    /// Configuration error found before processing
    Config = 1013,
}

impl ErrorKind {
    /// Get the integer code
    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// Get the error category for log fields
    pub fn category(&self) -> &'static str {
        match self {
            ErrorKind::RuleLoad | ErrorKind::InvalidContext => "malformed_input",
            ErrorKind::MissingDependency | ErrorKind::Fetch => "dependency",
            ErrorKind::VersionMismatch | ErrorKind::MissingCounterpart => "versioning",
            ErrorKind::NotDecodable | ErrorKind::Io => "io_error",
            ErrorKind::UnsupportedFile | ErrorKind::FileTooLarge => "guard_rail",
            ErrorKind::ValidatorFailure | ErrorKind::Structure => "conformance",
            ErrorKind::Config => "configuration",
        }
    }

    /// Whether the error blocks the whole run rather than a single asset
    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorKind::Config)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

// =============================================================================
// ERROR TYPE
// =============================================================================

/// Main error type for engine operations
#[derive(Debug, thiserror::Error)]
pub enum ConformanceError {
    #[error("cannot load rule file {path}: {reason}")]
    RuleLoad { path: PathBuf, reason: String },

    #[error("missing dependencies for {namespace}: {}", .missing.join(", "))]
    MissingDependency {
        namespace: String,
        missing: Vec<String>,
    },

    #[error("files are different: {versioned} {latest}\n{diff}")]
    VersionMismatch {
        versioned: PathBuf,
        latest: PathBuf,
        diff: String,
    },

    #[error("file referenced by `latest` has no versioned counterpart: {expected}")]
    MissingCounterpart { latest: PathBuf, expected: PathBuf },

    #[error("{path} is not decodable for diff: {reason}")]
    NotDecodable { path: PathBuf, reason: String },

    #[error("unsupported file {path}")]
    UnsupportedFile { path: PathBuf },

    #[error("file too big: {path} is {size} bytes (limit {limit})")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("{validator} rejected {path}: {fragment}")]
    ValidatorFailure {
        validator: String,
        path: PathBuf,
        fragment: String,
    },

    #[error("invalid JSON-LD context: {reason}")]
    InvalidContext { reason: String },

    #[error("cannot fetch <{iri}>: {reason}")]
    Fetch { iri: String, reason: String },

    #[error("{0}")]
    Structure(String),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl ConformanceError {
    /// Get the stable kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConformanceError::RuleLoad { .. } => ErrorKind::RuleLoad,
            ConformanceError::MissingDependency { .. } => ErrorKind::MissingDependency,
            ConformanceError::VersionMismatch { .. } => ErrorKind::VersionMismatch,
            ConformanceError::MissingCounterpart { .. } => ErrorKind::MissingCounterpart,
            ConformanceError::NotDecodable { .. } => ErrorKind::NotDecodable,
            ConformanceError::UnsupportedFile { .. } => ErrorKind::UnsupportedFile,
            ConformanceError::FileTooLarge { .. } => ErrorKind::FileTooLarge,
            ConformanceError::ValidatorFailure { .. } => ErrorKind::ValidatorFailure,
            ConformanceError::InvalidContext { .. } => ErrorKind::InvalidContext,
            ConformanceError::Fetch { .. } => ErrorKind::Fetch,
            ConformanceError::Structure(_) => ErrorKind::Structure,
            ConformanceError::Io { .. } => ErrorKind::Io,
            ConformanceError::Config(_) => ErrorKind::Config,
        }
    }

    /// Shorthand for an I/O error bound to a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConformanceError::Io {
            path: path.into(),
            source,
        }
    }

    /// Record this error as a structured log event
    pub fn track(&self) {
        let kind = self.kind();
        tracing::debug!(
            error_kind = %kind,
            category = kind.category(),
            "error recorded"
        );
    }
}

/// Engine result alias
pub type Result<T, E = ConformanceError> = std::result::Result<T, E>;
