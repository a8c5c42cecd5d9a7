//! Repository structure checks
//!
//! Layout and naming rules that do not depend on a file's format:
//! - **repo-structure**: allowed top-level asset trees
//! - **filename-format**: lowercase, bounded-length names
//! - **filename-match-directory**: files are named after an ancestor directory
//! - **filename-match-uri**: a Turtle file is named after its main subject
//! - **mandatory-files-presence**: leaf directories carry their required files
//! - **utf8-file-encoding**: text assets are UTF-8
//!
//! The two version directory checks from [`crate::versioning`] are exposed
//! through the same trait so the dispatcher can treat every check alike.

pub mod encoding;
pub mod layout;
pub mod naming;
pub mod uri;

use crate::error::ConformanceError;
use crate::validators::ValidationInput;
use crate::versioning::{VersionConsistencyChecker, VersioningPatternCheck};

pub use encoding::Utf8EncodingCheck;
pub use layout::{MandatoryFilesCheck, RepoStructureCheck};
pub use naming::{FilenameFormatCheck, FilenameMatchDirectoryCheck};
pub use uri::FilenameMatchUriCheck;

/// A check over one asset and its content.
pub trait StructureCheck: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn check(&self, input: &ValidationInput<'_>) -> Result<(), ConformanceError>;
}

impl StructureCheck for VersionConsistencyChecker {
    fn name(&self) -> &str {
        "versioned-directory"
    }

    fn description(&self) -> &str {
        "Files under latest/ match the highest version directory"
    }

    fn check(&self, input: &ValidationInput<'_>) -> Result<(), ConformanceError> {
        VersionConsistencyChecker::check(self, input.path)
    }
}

impl StructureCheck for VersioningPatternCheck {
    fn name(&self) -> &str {
        "directory-versioning-pattern"
    }

    fn description(&self) -> &str {
        "Sibling version directories share one naming pattern"
    }

    fn check(&self, input: &ValidationInput<'_>) -> Result<(), ConformanceError> {
        VersioningPatternCheck::check(self, input.path)
    }
}

/// File name without its final extension.
pub(crate) fn file_stem(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}
