//! Format validators
//!
//! Every content validator implements one uniform contract: given a file and
//! its bytes, answer `valid` plus a report fragment. The dispatcher only
//! talks to validators through [`Validator`], so any of the defaults can be
//! replaced by registering another implementation.
//!
//! ## Defaults
//! - **framing-context**: JSON-LD shape plus a consistent `_meta.index`
//! - **jsonld**: JSON-LD document shape
//! - **openapi**: OpenAPI 3 structure and local `$ref` resolution
//! - **jsonschema**: JSON Schema Draft 7 meta-validation
//! - **turtle**: Turtle syntax
//! - **tabular**: CSV structure and header names

pub mod framing;
pub mod json_schema;
pub mod jsonld;
pub mod openapi;
pub mod tabular;
pub mod turtle;

use crate::catalog::AssetPath;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

pub use framing::FramingContextValidator;
pub use json_schema::JsonSchemaValidator;
pub use jsonld::JsonLdValidator;
pub use openapi::OpenApiValidator;
pub use tabular::TabularValidator;
pub use turtle::TurtleValidator;

// =============================================================================
// Contract
// =============================================================================

/// Content handed to a validator.
#[derive(Debug, Clone, Copy)]
pub struct ValidationInput<'a> {
    pub path: &'a AssetPath,
    pub content: &'a [u8],
}

impl<'a> ValidationInput<'a> {
    pub fn new(path: &'a AssetPath, content: &'a [u8]) -> Self {
        Self { path, content }
    }

    pub fn text(&self) -> Result<&'a str, ValidatorOutcome> {
        std::str::from_utf8(self.content)
            .map_err(|e| ValidatorOutcome::fail(format!("content is not UTF-8: {e}")))
    }

    /// Parse YAML (or JSON, a YAML subset) into a JSON value.
    pub fn yaml(&self) -> Result<Value, ValidatorOutcome> {
        serde_yaml::from_str(self.text()?)
            .map_err(|e| ValidatorOutcome::fail(format!("cannot parse YAML: {e}")))
    }
}

/// Verdict of one validator run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatorOutcome {
    pub valid: bool,
    /// Report fragment; empty when valid.
    pub fragment: String,
}

impl ValidatorOutcome {
    pub fn pass() -> Self {
        Self {
            valid: true,
            fragment: String::new(),
        }
    }

    pub fn fail(fragment: impl Into<String>) -> Self {
        Self {
            valid: false,
            fragment: fragment.into(),
        }
    }

    /// Fold a result whose error already is a failing outcome.
    pub fn from_result(result: Result<(), ValidatorOutcome>) -> Self {
        result.err().unwrap_or_else(Self::pass)
    }
}

/// A content validator
pub trait Validator: Send + Sync {
    /// Validator identifier used in report lines
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// Validate one file's content
    fn validate(&self, input: &ValidationInput<'_>) -> ValidatorOutcome;
}

// =============================================================================
// Registry
// =============================================================================

/// Validator slots addressed by the route table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum ValidatorKind {
    FramingContext,
    JsonLd,
    OpenApi,
    JsonSchema,
    Turtle,
    Tabular,
}

/// Validators by kind.
#[derive(Clone)]
pub struct ValidatorRegistry {
    validators: HashMap<ValidatorKind, Arc<dyn Validator>>,
}

impl ValidatorRegistry {
    pub fn empty() -> Self {
        Self {
            validators: HashMap::new(),
        }
    }

    /// Registry holding the default implementation of every kind.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(ValidatorKind::FramingContext, Arc::new(FramingContextValidator));
        registry.register(ValidatorKind::JsonLd, Arc::new(JsonLdValidator));
        registry.register(ValidatorKind::OpenApi, Arc::new(OpenApiValidator));
        registry.register(ValidatorKind::JsonSchema, Arc::new(JsonSchemaValidator));
        registry.register(ValidatorKind::Turtle, Arc::new(TurtleValidator));
        registry.register(ValidatorKind::Tabular, Arc::new(TabularValidator));
        registry
    }

    /// Register or replace the validator for `kind`.
    pub fn register(&mut self, kind: ValidatorKind, validator: Arc<dyn Validator>) -> &mut Self {
        self.validators.insert(kind, validator);
        self
    }

    pub fn get(&self, kind: ValidatorKind) -> Option<&Arc<dyn Validator>> {
        self.validators.get(&kind)
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.validators.values().map(|v| v.name().to_string()).collect();
        names.sort();
        f.debug_struct("ValidatorRegistry").field("validators", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use strum::IntoEnumIterator;

    #[test]
    fn defaults_cover_every_kind() {
        let registry = ValidatorRegistry::with_defaults();
        for kind in ValidatorKind::iter() {
            assert!(registry.get(kind).is_some(), "{kind} missing");
        }
    }

    #[test]
    fn register_replaces() {
        struct AlwaysFails;
        impl Validator for AlwaysFails {
            fn name(&self) -> &str {
                "always-fails"
            }
            fn description(&self) -> &str {
                "test double"
            }
            fn validate(&self, _: &ValidationInput<'_>) -> ValidatorOutcome {
                ValidatorOutcome::fail("nope")
            }
        }

        let mut registry = ValidatorRegistry::with_defaults();
        registry.register(ValidatorKind::Turtle, Arc::new(AlwaysFails));
        let asset = AssetPath::new(Path::new("/repo"), Path::new("/repo/a.ttl"));
        let outcome = registry
            .get(ValidatorKind::Turtle)
            .unwrap()
            .validate(&ValidationInput::new(&asset, b""));
        assert!(!outcome.valid);
        assert_eq!(registry.len(), 6);
    }

    #[test]
    fn kind_names_are_kebab_case() {
        assert_eq!(ValidatorKind::FramingContext.to_string(), "framing-context");
        assert_eq!(ValidatorKind::JsonLd.to_string(), "json-ld");
    }
}
