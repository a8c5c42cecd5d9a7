//! Asset discovery
//!
//! [`AssetCatalog::scan`] walks a base directory and lazily yields the files
//! that are validation or build inputs. Generated artifacts, documentation
//! and images are skipped by suffix.

use serde::Serialize;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Suffixes that never name a validation input.
pub const SKIP_SUFFIXES: &[&str] = &[
    ".md",
    ".png",
    ".xml",
    ".xsd",
    ".html",
    ".gitignore",
    ".git",
    ".example.yaml",
];

/// Generated index files are build outputs, not inputs.
pub const GENERATED_INDEX: &str = "index.ttl";

/// A file path anchored to the repository root.
///
/// `absolute` is lexically normalized (no `.` or `..` components) and is the
/// identity key used by caches. `relative` is repository-rooted when the file
/// lives under the root, otherwise it repeats the absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AssetPath {
    absolute: PathBuf,
    relative: PathBuf,
}

impl AssetPath {
    pub fn new(root: &Path, path: &Path) -> Self {
        let root = absolutize(root);
        let absolute = if path.is_absolute() {
            normalize_lexically(path)
        } else if path.exists() {
            absolutize(path)
        } else {
            normalize_lexically(&root.join(path))
        };
        let relative = absolute
            .strip_prefix(&root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| absolute.clone());
        Self { absolute, relative }
    }

    pub fn absolute(&self) -> &Path {
        &self.absolute
    }

    pub fn relative(&self) -> &Path {
        &self.relative
    }

    pub fn file_name(&self) -> &str {
        self.absolute
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("")
    }

    pub fn display_relative(&self) -> String {
        self.relative.to_string_lossy().replace('\\', "/")
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_relative())
    }
}

/// Substring filters applied to file names during a scan.
#[derive(Debug, Clone, Default)]
pub struct AssetFilter {
    pattern: String,
    exclude: Vec<String>,
}

impl AssetFilter {
    pub fn new(pattern: impl Into<String>, exclude: Vec<String>) -> Self {
        Self {
            pattern: pattern.into(),
            exclude: exclude.into_iter().filter(|e| !e.is_empty()).collect(),
        }
    }

    pub fn matches(&self, file_name: &str) -> bool {
        if !file_name.contains(&self.pattern) {
            return false;
        }
        !self
            .exclude
            .iter()
            .any(|exclude| file_name.contains(exclude.as_str()))
    }
}

/// True when a file name is never a validation input.
pub fn is_skipped(file_name: &str) -> bool {
    file_name == GENERATED_INDEX || SKIP_SUFFIXES.iter().any(|s| file_name.ends_with(s))
}

/// Enumerates candidate assets below a base directory.
#[derive(Debug, Clone)]
pub struct AssetCatalog {
    root: PathBuf,
}

impl AssetCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lazily yield every candidate file under `base`.
    ///
    /// Calling `scan` again restarts the walk. Symlinks are not followed.
    pub fn scan<'a>(
        &'a self,
        base: &Path,
        filter: &'a AssetFilter,
    ) -> impl Iterator<Item = AssetPath> + use<'a> {
        let base = if base.is_absolute() {
            base.to_path_buf()
        } else {
            self.root.join(base)
        };
        WalkDir::new(base)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(error) => {
                    tracing::warn!(error = %error, "skipping unreadable catalog entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(move |entry| {
                let name = entry.file_name().to_string_lossy();
                !is_skipped(&name) && filter.matches(&name)
            })
            .map(move |entry| AssetPath::new(&self.root, entry.path()))
    }
}

fn absolutize(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    normalize_lexically(&absolute)
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
