//! Nearest-ancestor rule set resolution
//!
//! Every asset is governed by at most one `rules.shacl`: the first one found
//! walking upward from the asset's parent directory. The walk examines at
//! most `max_depth` directories and never continues past the repository
//! root. No rule file within the bound is not an error; the asset is then
//! only checked for base syntax.

pub mod cache;
pub mod shacl;

use crate::catalog::AssetPath;
use crate::config::EngineConfig;
use crate::error::ConformanceError;
use oxigraph::store::Store;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use cache::{CacheStats, RuleSetCache};
pub use shacl::{ShapeReport, ShapeValidator, ShapeViolation, parse_turtle};

/// A parsed rule file.
#[derive(Debug)]
pub struct RuleSet {
    pub path: PathBuf,
    pub validator: ShapeValidator,
}

impl RuleSet {
    pub fn load(path: &Path) -> Result<Self, ConformanceError> {
        tracing::debug!(rule_file = %path.display(), "loading rule set");
        let validator = ShapeValidator::from_file(path).map_err(|error| ConformanceError::RuleLoad {
            path: path.to_path_buf(),
            reason: format!("{error:#}"),
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            validator,
        })
    }

    /// Validate a data graph, mapping evaluation failures to the rule file.
    pub fn validate(&self, data: &Store) -> Result<ShapeReport, ConformanceError> {
        self.validator
            .validate_graph(data)
            .map_err(|error| ConformanceError::RuleLoad {
                path: self.path.clone(),
                reason: format!("{error:#}"),
            })
    }
}

/// Terminal state of one upward search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSearch {
    /// Rule file found `depth` directories above the asset's parent.
    Found { path: PathBuf, depth: usize },
    /// Search ended without a rule file after examining `examined` directories.
    Exhausted { examined: usize },
}

pub struct RuleResolver {
    root: PathBuf,
    rule_file_name: String,
    max_depth: usize,
    cache: RuleSetCache,
}

impl RuleResolver {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            root: AssetPath::new(&config.repository_root, &config.repository_root)
                .absolute()
                .to_path_buf(),
            rule_file_name: config.rule_file_name.clone(),
            max_depth: config.max_rule_depth,
            cache: RuleSetCache::new(config.rule_cache_capacity),
        }
    }

    /// Walk ancestor directories looking for the rule file.
    pub fn locate(&self, asset: &AssetPath) -> RuleSearch {
        let Some(mut dir) = asset.absolute().parent() else {
            return RuleSearch::Exhausted { examined: 0 };
        };

        for depth in 0..self.max_depth {
            let candidate = dir.join(&self.rule_file_name);
            if candidate.is_file() {
                return RuleSearch::Found {
                    path: candidate,
                    depth,
                };
            }
            if dir == self.root {
                return RuleSearch::Exhausted {
                    examined: depth + 1,
                };
            }
            match dir.parent() {
                Some(parent) => dir = parent,
                None => {
                    return RuleSearch::Exhausted {
                        examined: depth + 1,
                    };
                }
            }
        }

        RuleSearch::Exhausted {
            examined: self.max_depth,
        }
    }

    /// Resolve the active rule set for an asset.
    pub fn resolve(&self, asset: &AssetPath) -> Result<Option<Arc<RuleSet>>, ConformanceError> {
        match self.locate(asset) {
            RuleSearch::Found { path, depth } => {
                tracing::debug!(asset = %asset, rule_file = %path.display(), depth, "rule file found");
                self.cache
                    .get_or_load(&path, || RuleSet::load(&path))
                    .map(Some)
            }
            RuleSearch::Exhausted { examined } => {
                tracing::debug!(asset = %asset, examined, "no rule file in range");
                Ok(None)
            }
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::fs;
    use tempfile::TempDir;

    const EMPTY_RULES: &str = "@prefix sh: <http://www.w3.org/ns/shacl#> .\n";

    fn resolver(root: &Path) -> RuleResolver {
        RuleResolver::new(&EngineConfig::for_root(root))
    }

    fn asset(root: &Path, relative: &str) -> AssetPath {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "").unwrap();
        AssetPath::new(root, &path)
    }

    #[test]
    fn nearest_rule_file_wins() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("a/rules.shacl"), EMPTY_RULES).unwrap();
        fs::write(root.join("a/b/rules.shacl"), EMPTY_RULES).unwrap();
        let file = asset(root, "a/b/c/data.ttl");

        assert_matches!(
            resolver(root).locate(&file),
            RuleSearch::Found { depth: 1, ref path } if path.ends_with("a/b/rules.shacl")
        );
    }

    #[test]
    fn no_rule_file_is_none() {
        let dir = TempDir::new().unwrap();
        let file = asset(dir.path(), "a/data.ttl");
        assert!(resolver(dir.path()).resolve(&file).unwrap().is_none());
    }

    #[test]
    fn walk_stops_at_repository_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("repo");
        fs::create_dir_all(&root).unwrap();
        // Above the root: must never be found.
        fs::write(dir.path().join("rules.shacl"), EMPTY_RULES).unwrap();
        let file = asset(&root, "x/data.ttl");

        assert_eq!(
            resolver(&root).locate(&file),
            RuleSearch::Exhausted { examined: 2 }
        );
    }

    #[test]
    fn malformed_rules_are_rule_load_errors() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("a/rules.shacl"), "this is not turtle").unwrap();
        let file = asset(dir.path(), "a/data.ttl");

        assert_matches!(
            resolver(dir.path()).resolve(&file),
            Err(ConformanceError::RuleLoad { .. })
        );
    }

    #[test]
    fn rule_sets_are_cached_by_path() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("a/rules.shacl"), EMPTY_RULES).unwrap();
        let first = asset(dir.path(), "a/one.ttl");
        let second = asset(dir.path(), "a/two.ttl");

        let resolver = resolver(dir.path());
        let a = resolver.resolve(&first).unwrap().unwrap();
        let b = resolver.resolve(&second).unwrap().unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(resolver.cache_stats().hits, 1);
    }
}
