//! Semantic coverage of an annotated OpenAPI document

use super::locate::locate_contexts;
use super::resolver::{MISSING, SemanticReferenceResolver, TermSummary};
use crate::error::ConformanceError;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FragmentCoverage {
    pub properties_semantic: usize,
    pub properties_total: usize,
    pub domains: BTreeSet<String>,
    pub ontologies: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetReference {
    #[serde(flatten)]
    pub term: TermSummary,
    /// Schema pointers whose context uses the term.
    pub referrers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SemanticBundle {
    pub title: String,
    /// Number of `components.schemas`.
    pub schema_total: usize,
    /// Number of schemas carrying a context.
    pub schema_covered: usize,
    pub fragments: BTreeMap<String, FragmentCoverage>,
    pub assets: BTreeMap<String, AssetReference>,
}

impl SemanticReferenceResolver {
    /// Summarize how much of each annotated schema is mapped to ontology
    /// terms. Only `object` schemas are supported.
    pub fn semantic_bundle(&self, document: &Value) -> Result<SemanticBundle, ConformanceError> {
        let mut bundle = SemanticBundle {
            title: document
                .pointer("/info/title")
                .and_then(Value::as_str)
                .unwrap_or(MISSING)
                .to_string(),
            schema_total: document
                .pointer("/components/schemas")
                .and_then(Value::as_object)
                .map_or(0, |schemas| schemas.len()),
            schema_covered: 0,
            fragments: BTreeMap::new(),
            assets: BTreeMap::new(),
        };

        for location in locate_contexts(document) {
            let pointer = location.schema_pointer();
            bundle.schema_covered += 1;

            jsonschema::draft7::meta::validate(location.parent).map_err(|error| {
                ConformanceError::ValidatorFailure {
                    validator: "jsonschema".to_string(),
                    path: PathBuf::from(&pointer),
                    fragment: error.to_string(),
                }
            })?;

            let kind = location.parent.get("type").and_then(Value::as_str);
            if kind != Some("object") {
                return Err(ConformanceError::Structure(format!(
                    "{pointer}: coverage of schema type {} is not supported",
                    kind.unwrap_or("<none>")
                )));
            }

            let mut coverage = FragmentCoverage::default();
            if let Some(properties) = location.parent.get("properties").and_then(Value::as_object) {
                for name in properties.keys() {
                    coverage.properties_total += 1;
                    if location.fragment.get(name).is_some_and(is_mapped) {
                        coverage.properties_semantic += 1;
                    }
                }
            }

            let resolved = self.resolve_context(location.fragment)?;
            coverage.domains = resolved.domains;
            coverage.ontologies = resolved.ontologies;

            for (subject, term) in resolved.terms {
                bundle
                    .assets
                    .entry(subject)
                    .or_insert_with(|| AssetReference {
                        term,
                        referrers: Vec::new(),
                    })
                    .referrers
                    .push(pointer.clone());
            }
            bundle.fragments.insert(pointer, coverage);
        }

        Ok(bundle)
    }
}

fn is_mapped(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.is_empty(),
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::semantic::store::OfflineFetcher;
    use assert_matches::assert_matches;
    use serde_json::json;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn resolver(dir: &TempDir) -> SemanticReferenceResolver {
        let onto = dir.path().join("assets/ontologies/CPV");
        fs::create_dir_all(&onto).unwrap();
        fs::write(
            onto.join("CPV.ttl"),
            r#"
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix CPV: <https://w3id.org/italia/onto/CPV/> .
CPV:givenName rdfs:domain CPV:Person ;
    rdfs:isDefinedBy <https://w3id.org/italia/onto/CPV> ;
    owl:versionInfo "1.0" .
"#,
        )
        .unwrap();
        let mut config = EngineConfig::for_root(dir.path());
        config.fetch.offline = true;
        SemanticReferenceResolver::new(&config, Arc::new(OfflineFetcher))
    }

    #[test]
    fn counts_mapped_properties() {
        let dir = TempDir::new().unwrap();
        let document = json!({
            "info": {"title": "People"},
            "components": {"schemas": {
                "Person": {
                    "type": "object",
                    "properties": {"given_name": {"type": "string"}, "age": {"type": "integer"}},
                    "x-jsonld-context": {"given_name": "https://w3id.org/italia/onto/CPV/givenName", "age": null}
                },
                "Plain": {"type": "string"}
            }}
        });

        let bundle = resolver(&dir).semantic_bundle(&document).unwrap();
        assert_eq!(bundle.title, "People");
        assert_eq!(bundle.schema_total, 2);
        assert_eq!(bundle.schema_covered, 1);

        let person = &bundle.fragments["#/components/schemas/Person"];
        assert_eq!((person.properties_semantic, person.properties_total), (1, 2));
        assert!(person.domains.contains("https://w3id.org/italia/onto/CPV/Person"));

        let asset = &bundle.assets["https://w3id.org/italia/onto/CPV/givenName"];
        assert_eq!(asset.term.version_info.as_deref(), Some("1.0"));
        assert_eq!(asset.referrers, vec!["#/components/schemas/Person"]);
    }

    #[test]
    fn non_object_schemas_are_unsupported() {
        let dir = TempDir::new().unwrap();
        let document = json!({
            "components": {"schemas": {"Code": {"type": "string", "x-jsonld-context": {}}}}
        });
        assert_matches!(
            resolver(&dir).semantic_bundle(&document),
            Err(ConformanceError::Structure(_))
        );
    }

    #[test]
    fn invalid_schemas_are_rejected() {
        let dir = TempDir::new().unwrap();
        let document = json!({
            "components": {"schemas": {"Bad": {"type": "objekt", "x-jsonld-context": {}}}}
        });
        assert_matches!(
            resolver(&dir).semantic_bundle(&document),
            Err(ConformanceError::ValidatorFailure { .. })
        );
    }
}
