//! Per-file check orchestration
//!
//! [`ValidationDispatcher::dispatch`] runs the enabled checks against one
//! asset and collects every failure into a [`FileOutcome`]. The size guard
//! runs first: an oversized file is reported without being read, so no
//! validator or check ever sees its content.

pub mod routes;

use crate::catalog::AssetPath;
use crate::checks::{
    FilenameFormatCheck, FilenameMatchDirectoryCheck, FilenameMatchUriCheck, MandatoryFilesCheck,
    RepoStructureCheck, StructureCheck, Utf8EncodingCheck,
};
use crate::config::EngineConfig;
use crate::error::ConformanceError;
use crate::logging::asset_span;
use crate::report::FileOutcome;
use crate::rules::{RuleResolver, parse_turtle};
use crate::semantic::{OntologyFetcher, SemanticReferenceResolver, fetcher_for, locate_contexts};
use crate::validators::json_schema::check_schema;
use crate::validators::{ValidationInput, ValidatorKind, ValidatorRegistry};
use crate::versioning::{VersionConsistencyChecker, VersioningPatternCheck};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

pub use routes::{CheckScopes, DEFAULT_ROUTES, RouteTable};

/// Checks selectable on the command line.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    clap::ValueEnum,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum CheckName {
    /// Route the file to its format validator
    Format,
    /// SHACL shapes from the nearest rules.shacl
    Shacl,
    Oas3,
    Jsonschema,
    /// Every semantic term resolves to a known ontology subject
    SemanticReferences,
    /// latest/ mirrors the highest version
    VersionedDirectory,
    Turtle,
    Csv,
    RepoStructure,
    FilenameFormat,
    FilenameMatchUri,
    FilenameMatchDirectory,
    DirectoryVersioningPattern,
    MandatoryFilesPresence,
    #[strum(serialize = "utf8-file-encoding")]
    #[serde(rename = "utf8-file-encoding")]
    #[value(name = "utf8-file-encoding")]
    Utf8FileEncoding,
}

/// Checks run when none are requested.
pub const DEFAULT_CHECKS: &[CheckName] = &[CheckName::Format];

pub struct ValidationDispatcher {
    registry: ValidatorRegistry,
    routes: RouteTable,
    scopes: CheckScopes,
    rules: RuleResolver,
    semantic: SemanticReferenceResolver,
    checks: HashMap<CheckName, Arc<dyn StructureCheck>>,
    max_file_size: u64,
}

impl ValidationDispatcher {
    /// Dispatcher with the default validators, fetching remote terms over
    /// HTTP unless the configuration is offline.
    pub fn new(config: &EngineConfig) -> Result<Self, ConformanceError> {
        Self::with_parts(config, ValidatorRegistry::with_defaults(), fetcher_for(&config.fetch)?)
    }

    pub fn with_parts(
        config: &EngineConfig,
        registry: ValidatorRegistry,
        fetcher: Arc<dyn OntologyFetcher>,
    ) -> Result<Self, ConformanceError> {
        let root = AssetPath::new(&config.repository_root, &config.repository_root)
            .absolute()
            .to_path_buf();

        let mut checks: HashMap<CheckName, Arc<dyn StructureCheck>> = HashMap::new();
        checks.insert(CheckName::VersionedDirectory, Arc::new(VersionConsistencyChecker::new()));
        checks.insert(CheckName::DirectoryVersioningPattern, Arc::new(VersioningPatternCheck));
        checks.insert(CheckName::RepoStructure, Arc::new(RepoStructureCheck::new(root)));
        checks.insert(CheckName::FilenameFormat, Arc::new(FilenameFormatCheck));
        checks.insert(CheckName::FilenameMatchUri, Arc::new(FilenameMatchUriCheck));
        checks.insert(CheckName::FilenameMatchDirectory, Arc::new(FilenameMatchDirectoryCheck));
        checks.insert(CheckName::MandatoryFilesPresence, Arc::new(MandatoryFilesCheck));
        checks.insert(CheckName::Utf8FileEncoding, Arc::new(Utf8EncodingCheck));

        Ok(Self {
            registry,
            routes: RouteTable::with_defaults()?,
            scopes: CheckScopes::with_defaults()?,
            rules: RuleResolver::new(config),
            semantic: SemanticReferenceResolver::new(config, fetcher),
            checks,
            max_file_size: config.max_file_size,
        })
    }

    pub fn rules(&self) -> &RuleResolver {
        &self.rules
    }

    pub fn semantic(&self) -> &SemanticReferenceResolver {
        &self.semantic
    }

    /// Run `checks` (the format check when empty) against one asset.
    pub fn dispatch(&self, asset: &AssetPath, checks: &[CheckName]) -> FileOutcome {
        let span = asset_span(&asset.display_relative());
        let _guard = span.enter();

        let mut outcome = FileOutcome::new(asset);
        let checks: BTreeSet<CheckName> = if checks.is_empty() {
            DEFAULT_CHECKS.iter().copied().collect()
        } else {
            checks.iter().copied().collect()
        };

        let content = match self.read_guarded(asset) {
            Ok(content) => content,
            Err(error) => {
                outcome.push_error(&error);
                return outcome;
            }
        };
        let input = ValidationInput::new(asset, &content);

        for check in checks {
            if !self.scopes.applies(check, asset.file_name()) {
                tracing::trace!(check = %check, "out of scope");
                continue;
            }
            self.run_check(check, &input, &mut outcome);
        }

        if outcome.is_ok() {
            tracing::debug!("asset conforms");
        } else {
            tracing::debug!(errors = outcome.errors.len(), "asset has errors");
        }
        outcome
    }

    /// Read a file unless it exceeds the size ceiling.
    fn read_guarded(&self, asset: &AssetPath) -> Result<Vec<u8>, ConformanceError> {
        let metadata = fs::metadata(asset.absolute())
            .map_err(|e| ConformanceError::io(asset.relative(), e))?;
        if metadata.len() > self.max_file_size {
            return Err(ConformanceError::FileTooLarge {
                path: asset.relative().to_path_buf(),
                size: metadata.len(),
                limit: self.max_file_size,
            });
        }
        fs::read(asset.absolute()).map_err(|e| ConformanceError::io(asset.relative(), e))
    }

    fn run_check(&self, check: CheckName, input: &ValidationInput<'_>, outcome: &mut FileOutcome) {
        let result = match check {
            CheckName::Format => match self.routes.route(input.path.file_name()) {
                Some(kind) => self.run_validator(kind, input),
                None => Err(ConformanceError::UnsupportedFile {
                    path: input.path.relative().to_path_buf(),
                }),
            },
            CheckName::Shacl => self.check_shapes(input),
            CheckName::Oas3 => self.run_validator(ValidatorKind::OpenApi, input),
            CheckName::Jsonschema => {
                if input.path.file_name().ends_with(".oas3.yaml") {
                    return self.check_component_schemas(input, outcome);
                }
                self.run_validator(ValidatorKind::JsonSchema, input)
            }
            CheckName::SemanticReferences => return self.check_semantic_references(input, outcome),
            CheckName::Turtle => self.run_validator(ValidatorKind::Turtle, input),
            CheckName::Csv => self.run_validator(ValidatorKind::Tabular, input),
            other => match self.checks.get(&other) {
                Some(structure) => structure.check(input),
                None => Err(ConformanceError::Config(format!("no check registered for {other}"))),
            },
        };
        if let Err(error) = result {
            outcome.push_error(&error);
        }
    }

    fn run_validator(&self, kind: ValidatorKind, input: &ValidationInput<'_>) -> Result<(), ConformanceError> {
        let validator = self
            .registry
            .get(kind)
            .ok_or_else(|| ConformanceError::Config(format!("no validator registered for {kind}")))?;
        let verdict = validator.validate(input);
        if verdict.valid {
            return Ok(());
        }
        Err(ConformanceError::ValidatorFailure {
            validator: validator.name().to_string(),
            path: input.path.relative().to_path_buf(),
            fragment: verdict.fragment,
        })
    }

    /// Turtle data against the nearest rule set; syntax only without one.
    fn check_shapes(&self, input: &ValidationInput<'_>) -> Result<(), ConformanceError> {
        let failure = |fragment: String| ConformanceError::ValidatorFailure {
            validator: "shacl".to_string(),
            path: input.path.relative().to_path_buf(),
            fragment,
        };
        let text = input.text().map_err(|verdict| failure(verdict.fragment))?;
        let data = parse_turtle(text).map_err(|e| failure(format!("not a valid Turtle file: {e:#}")))?;

        let Some(rules) = self.rules.resolve(input.path)? else {
            return Ok(());
        };
        let report = rules.validate(&data)?;
        if report.conforms() {
            return Ok(());
        }
        Err(failure(format!(
            "{} violation(s) of {}:\n{}",
            report.violation_count(),
            rules.path.display(),
            report.summary()
        )))
    }

    /// Meta-validate every schema of an OpenAPI document.
    fn check_component_schemas(&self, input: &ValidationInput<'_>, outcome: &mut FileOutcome) {
        let document = match input.yaml() {
            Ok(document) => document,
            Err(verdict) => return outcome.push_error(&self.parse_failure("jsonschema", input, verdict.fragment)),
        };
        let Some(schemas) = document.pointer("/components/schemas").and_then(Value::as_object) else {
            return;
        };
        for (name, schema) in schemas {
            if let Err(verdict) = check_schema(schema) {
                outcome.push_error(&ConformanceError::ValidatorFailure {
                    validator: "jsonschema".to_string(),
                    path: PathBuf::from(format!("{}#/components/schemas/{name}", input.path)),
                    fragment: verdict.fragment,
                });
            }
        }
    }

    /// Every embedded context must close over known ontology subjects.
    fn check_semantic_references(&self, input: &ValidationInput<'_>, outcome: &mut FileOutcome) {
        let document = match input.yaml() {
            Ok(document) => document,
            Err(verdict) => {
                return outcome.push_error(&self.parse_failure("semantic-references", input, verdict.fragment));
            }
        };
        for location in locate_contexts(&document) {
            if let Err(error) = self.semantic.resolve_closed(location.fragment) {
                outcome.push_error_at(format_args!("{}{}", input.path, location.schema_pointer()), &error);
            }
        }
    }

    fn parse_failure(&self, validator: &str, input: &ValidationInput<'_>, fragment: String) -> ConformanceError {
        ConformanceError::ValidatorFailure {
            validator: validator.to_string(),
            path: input.path.relative().to_path_buf(),
            fragment,
        }
    }
}
