//! Version directory handling
//!
//! Assets are published under sibling directories named after their
//! version (`v1`, `1.2`, `v0.3.1`, ...) plus a `latest` alias that must
//! mirror the highest of them.

pub mod consistency;
pub mod pattern;

use std::cmp::Ordering;
use std::fmt;

pub use consistency::VersionConsistencyChecker;
pub use pattern::{VersioningPatternCheck, is_leaf_directory};

/// Name of the alias directory.
pub const LATEST: &str = "latest";
/// Directories starting with this are drafts and never candidates.
pub const RESERVED_PREFIX: &str = "v.";

/// A version directory name, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionDirectory {
    Latest,
    Reserved(String),
    /// Optional `v` prefix and one to three numeric components.
    Numeric { name: String, components: Vec<u64> },
    /// Anything else; ordered by name, below every numeric version.
    Lexical(String),
}

impl VersionDirectory {
    pub fn parse(name: &str) -> Self {
        if name == LATEST {
            return VersionDirectory::Latest;
        }
        if name.starts_with(RESERVED_PREFIX) {
            return VersionDirectory::Reserved(name.to_string());
        }
        match parse_components(name) {
            Some(components) => VersionDirectory::Numeric {
                name: name.to_string(),
                components,
            },
            None => VersionDirectory::Lexical(name.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            VersionDirectory::Latest => LATEST,
            VersionDirectory::Reserved(name)
            | VersionDirectory::Lexical(name)
            | VersionDirectory::Numeric { name, .. } => name,
        }
    }

    /// Whether the directory can be the target of `latest`.
    pub fn is_candidate(&self) -> bool {
        matches!(self, VersionDirectory::Numeric { .. } | VersionDirectory::Lexical(_))
    }

    fn rank(&self) -> u8 {
        match self {
            VersionDirectory::Latest => 0,
            VersionDirectory::Reserved(_) => 1,
            VersionDirectory::Lexical(_) => 2,
            VersionDirectory::Numeric { .. } => 3,
        }
    }
}

impl Ord for VersionDirectory {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (
                VersionDirectory::Numeric { name: a, components: x },
                VersionDirectory::Numeric { name: b, components: y },
            ) => padded(x).cmp(&padded(y)).then_with(|| a.cmp(b)),
            _ => self
                .rank()
                .cmp(&other.rank())
                .then_with(|| self.name().cmp(other.name())),
        }
    }
}

impl PartialOrd for VersionDirectory {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The highest candidate among `names`, if any.
pub fn highest<'a>(names: impl IntoIterator<Item = &'a str>) -> Option<VersionDirectory> {
    names
        .into_iter()
        .map(VersionDirectory::parse)
        .filter(VersionDirectory::is_candidate)
        .max()
}

fn parse_components(name: &str) -> Option<Vec<u64>> {
    let digits = name.strip_prefix('v').unwrap_or(name);
    let components = digits
        .split('.')
        .map(|part| {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                None
            } else {
                part.parse::<u64>().ok()
            }
        })
        .collect::<Option<Vec<_>>>()?;
    (1..=3).contains(&components.len()).then_some(components)
}

fn padded(components: &[u64]) -> [u64; 3] {
    let mut out = [0; 3];
    for (slot, value) in out.iter_mut().zip(components) {
        *slot = *value;
    }
    out
}
