//! File name routing
//!
//! Routes are globs over the file name, tried in order; the first match
//! wins, so the more specific patterns come first.

use super::CheckName;
use crate::error::ConformanceError;
use crate::validators::ValidatorKind;
use globset::{Glob, GlobMatcher, GlobSet, GlobSetBuilder};
use std::collections::HashMap;

pub const DEFAULT_ROUTES: &[(&str, ValidatorKind)] = &[
    ("context-*.ld.yaml", ValidatorKind::FramingContext),
    ("*.ld.yaml", ValidatorKind::JsonLd),
    ("*.oas3.yaml", ValidatorKind::OpenApi),
    ("*.schema.yaml", ValidatorKind::JsonSchema),
    ("*.shacl", ValidatorKind::Turtle),
    ("*.ttl", ValidatorKind::Turtle),
    ("*.csv", ValidatorKind::Tabular),
];

/// Files each check applies to; checks without an entry apply to every file.
const CHECK_SCOPES: &[(CheckName, &[&str])] = &[
    (CheckName::Shacl, &["*.ttl"]),
    (CheckName::Oas3, &["*.oas3.yaml"]),
    (CheckName::Jsonschema, &["*.schema.yaml", "*.oas3.yaml"]),
    (CheckName::SemanticReferences, &["*.oas3.yaml"]),
    (CheckName::Turtle, &["*.ttl", "*.shacl"]),
    (CheckName::Csv, &["*.csv"]),
    (CheckName::FilenameMatchUri, &["*.ttl"]),
];

fn compile(pattern: &str) -> Result<Glob, ConformanceError> {
    Glob::new(pattern)
        .map_err(|err| ConformanceError::Config(format!("invalid glob pattern {pattern}: {err}")))
}

struct Route {
    pattern: String,
    matcher: GlobMatcher,
    kind: ValidatorKind,
}

/// Ordered, first-match-wins route table.
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new<'a>(
        routes: impl IntoIterator<Item = (&'a str, ValidatorKind)>,
    ) -> Result<Self, ConformanceError> {
        let routes = routes
            .into_iter()
            .map(|(pattern, kind)| {
                Ok(Route {
                    pattern: pattern.to_string(),
                    matcher: compile(pattern)?.compile_matcher(),
                    kind,
                })
            })
            .collect::<Result<_, ConformanceError>>()?;
        Ok(Self { routes })
    }

    pub fn with_defaults() -> Result<Self, ConformanceError> {
        Self::new(DEFAULT_ROUTES.iter().copied())
    }

    /// Validator for a file name, if any route matches.
    pub fn route(&self, file_name: &str) -> Option<ValidatorKind> {
        let route = self.routes.iter().find(|route| route.matcher.is_match(file_name))?;
        tracing::trace!(file = file_name, pattern = %route.pattern, kind = %route.kind, "routed");
        Some(route.kind)
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|route| route.pattern.as_str())
    }
}

/// Which files each check is run on.
pub struct CheckScopes {
    scopes: HashMap<CheckName, GlobSet>,
}

impl CheckScopes {
    pub fn with_defaults() -> Result<Self, ConformanceError> {
        let mut scopes = HashMap::new();
        for (check, patterns) in CHECK_SCOPES {
            let mut builder = GlobSetBuilder::new();
            for pattern in *patterns {
                builder.add(compile(pattern)?);
            }
            let set = builder
                .build()
                .map_err(|err| ConformanceError::Config(format!("invalid scope for {check}: {err}")))?;
            scopes.insert(*check, set);
        }
        Ok(Self { scopes })
    }

    pub fn applies(&self, check: CheckName, file_name: &str) -> bool {
        self.scopes
            .get(&check)
            .is_none_or(|scope| scope.is_match(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framing_context_wins_over_jsonld() {
        let table = RouteTable::with_defaults().unwrap();
        assert_eq!(table.route("context-foo.ld.yaml"), Some(ValidatorKind::FramingContext));
        assert_eq!(table.route("foo.ld.yaml"), Some(ValidatorKind::JsonLd));
    }

    #[test]
    fn every_default_route_resolves() {
        let table = RouteTable::with_defaults().unwrap();
        assert_eq!(table.route("person.oas3.yaml"), Some(ValidatorKind::OpenApi));
        assert_eq!(table.route("person.schema.yaml"), Some(ValidatorKind::JsonSchema));
        assert_eq!(table.route("rules.shacl"), Some(ValidatorKind::Turtle));
        assert_eq!(table.route("cpv.ttl"), Some(ValidatorKind::Turtle));
        assert_eq!(table.route("codes.csv"), Some(ValidatorKind::Tabular));
        assert_eq!(table.patterns().count(), DEFAULT_ROUTES.len());
    }

    #[test]
    fn unmatched_names_have_no_route() {
        let table = RouteTable::with_defaults().unwrap();
        assert_eq!(table.route("datapackage.json"), None);
        assert_eq!(table.route("notes.yaml"), None);
    }

    #[test]
    fn custom_order_is_respected() {
        let table = RouteTable::new([
            ("*.yaml", ValidatorKind::JsonLd),
            ("*.oas3.yaml", ValidatorKind::OpenApi),
        ])
        .unwrap();
        assert_eq!(table.route("x.oas3.yaml"), Some(ValidatorKind::JsonLd));
    }

    #[test]
    fn invalid_glob_is_a_config_error() {
        assert!(RouteTable::new([("a[", ValidatorKind::Turtle)]).is_err());
    }

    #[test]
    fn scopes_limit_checks() {
        let scopes = CheckScopes::with_defaults().unwrap();
        assert!(scopes.applies(CheckName::Shacl, "cpv.ttl"));
        assert!(!scopes.applies(CheckName::Shacl, "codes.csv"));
        assert!(scopes.applies(CheckName::Jsonschema, "person.oas3.yaml"));
        assert!(scopes.applies(CheckName::RepoStructure, "anything.txt"));
    }
}
