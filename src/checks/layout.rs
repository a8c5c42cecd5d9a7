//! Directory layout checks

use super::StructureCheck;
use crate::error::ConformanceError;
use crate::validators::ValidationInput;
use crate::versioning::is_leaf_directory;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Asset trees allowed below the repository root.
pub const ALLOWED_TREES: &[&str] = &[
    "assets/controlled-vocabularies",
    "assets/ontologies",
    "assets/schemas",
];

const SCHEMA_TREE: &str = "schemas";
const SCHEMA_INDEX: &str = "index.ttl";
const OPENAPI_SUFFIX: &str = ".oas3.yaml";

/// The top-level directory holding a file may only contain the allowed
/// asset trees.
#[derive(Debug, Clone)]
pub struct RepoStructureCheck {
    root: PathBuf,
}

impl RepoStructureCheck {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl StructureCheck for RepoStructureCheck {
    fn name(&self) -> &str {
        "repo-structure"
    }

    fn description(&self) -> &str {
        "Top-level asset directories are among the allowed trees"
    }

    fn check(&self, input: &ValidationInput<'_>) -> Result<(), ConformanceError> {
        let relative = input.path.relative();
        if relative.is_absolute() {
            return Ok(());
        }
        let mut components = relative.components();
        let Some(Component::Normal(top)) = components.next() else {
            return Ok(());
        };
        // A file directly under the root has no tree to inspect.
        if components.next().is_none() {
            return Ok(());
        }

        let top = Path::new(top);
        let top_dir = self.root.join(top);
        let entries = fs::read_dir(&top_dir).map_err(|e| ConformanceError::io(&top_dir, e))?;
        let mut unexpected: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .map(|entry| top.join(entry.file_name()).to_string_lossy().replace('\\', "/"))
            .filter(|tree| !ALLOWED_TREES.contains(&tree.as_str()))
            .collect();
        if unexpected.is_empty() {
            return Ok(());
        }
        unexpected.sort();
        Err(ConformanceError::Structure(format!(
            "Unexpected directories: {} (allowed: {})",
            unexpected.join(", "),
            ALLOWED_TREES.join(", ")
        )))
    }
}

/// Leaf directories carry a Turtle file; schema leaves also carry an
/// OpenAPI document and the generated index.
#[derive(Debug, Default, Clone, Copy)]
pub struct MandatoryFilesCheck;

impl StructureCheck for MandatoryFilesCheck {
    fn name(&self) -> &str {
        "mandatory-files-presence"
    }

    fn description(&self) -> &str {
        "Leaf asset directories contain their mandatory files"
    }

    fn check(&self, input: &ValidationInput<'_>) -> Result<(), ConformanceError> {
        let Some(dir) = input.path.absolute().parent() else {
            return Ok(());
        };
        if !is_leaf_directory(dir) {
            return Ok(());
        }

        let names: Vec<String> = fs::read_dir(dir)
            .map_err(|e| ConformanceError::io(dir, e))?
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .collect();

        let mut missing = Vec::new();
        if !names.iter().any(|name| name.ends_with(".ttl")) {
            missing.push("*.ttl");
        }
        let relative_dir = input.path.relative().parent().unwrap_or(Path::new(""));
        let in_schema_tree = relative_dir
            .components()
            .any(|c| c.as_os_str() == SCHEMA_TREE);
        if in_schema_tree {
            if !names.iter().any(|name| name.ends_with(OPENAPI_SUFFIX)) {
                missing.push("*.oas3.yaml");
            }
            if !names.iter().any(|name| name == SCHEMA_INDEX) {
                missing.push(SCHEMA_INDEX);
            }
        }

        if missing.is_empty() {
            return Ok(());
        }
        Err(ConformanceError::Structure(format!(
            "Missing mandatory files in {}: {}",
            relative_dir.display(),
            missing.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AssetPath;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) -> AssetPath {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "").unwrap();
        AssetPath::new(root, &path)
    }

    fn run(check: &dyn StructureCheck, asset: &AssetPath) -> Result<(), ConformanceError> {
        check.check(&ValidationInput::new(asset, b""))
    }

    #[test]
    fn allowed_trees_pass() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "assets/schemas/x/latest/x.oas3.yaml");
        let asset = touch(dir.path(), "assets/ontologies/x/latest/x.ttl");
        assert!(run(&RepoStructureCheck::new(dir.path()), &asset).is_ok());
    }

    #[test]
    fn unexpected_tree_fails() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("assets/misc")).unwrap();
        let asset = touch(dir.path(), "assets/ontologies/x/x.ttl");
        assert_matches!(
            run(&RepoStructureCheck::new(dir.path()), &asset),
            Err(ConformanceError::Structure(message)) if message.contains("assets/misc")
        );
    }

    #[test]
    fn leaf_without_turtle_fails() {
        let dir = TempDir::new().unwrap();
        let asset = touch(dir.path(), "assets/controlled-vocabularies/x/latest/x.csv");
        assert_matches!(
            run(&MandatoryFilesCheck, &asset),
            Err(ConformanceError::Structure(message)) if message.contains("*.ttl")
        );
        touch(dir.path(), "assets/controlled-vocabularies/x/latest/x.ttl");
        assert!(run(&MandatoryFilesCheck, &asset).is_ok());
    }

    #[test]
    fn schema_leaf_needs_openapi_and_index() {
        let dir = TempDir::new().unwrap();
        let asset = touch(dir.path(), "assets/schemas/person/latest/person.ttl");
        let error = run(&MandatoryFilesCheck, &asset).unwrap_err().to_string();
        assert!(error.contains("*.oas3.yaml"));
        assert!(error.contains("index.ttl"));

        touch(dir.path(), "assets/schemas/person/latest/person.oas3.yaml");
        touch(dir.path(), "assets/schemas/person/latest/index.ttl");
        assert!(run(&MandatoryFilesCheck, &asset).is_ok());
    }

    #[test]
    fn non_leaf_directories_are_skipped() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("assets/ontologies/x/sub")).unwrap();
        let asset = touch(dir.path(), "assets/ontologies/x/notes.csv");
        assert!(run(&MandatoryFilesCheck, &asset).is_ok());
    }
}
