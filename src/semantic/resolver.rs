//! Dependency resolution for embedded contexts

use super::context::SemanticContext;
use super::locate::locate_contexts;
use super::normalize::ReferenceGraph;
use super::store::{LocalOntologyStore, OntologyFetcher, fetcher_for};
use crate::config::EngineConfig;
use crate::error::ConformanceError;
use crate::log_cache_operation;
use clap::ValueEnum;
use oxigraph::model::{NamedOrBlankNode, Term, Triple};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Placeholder for scalar metadata absent from the schema.
pub const MISSING: &str = "MISSING";
pub const ACCRUAL_PERIODICITY_IRREGULAR: &str =
    "http://publications.europa.eu/resource/authority/frequency/IRREG";
pub const THEME_TECHNOLOGY: &str =
    "http://publications.europa.eu/resource/authority/data-theme/TECHNOLOGY";

const RDFS_DOMAIN: &str = "http://www.w3.org/2000/01/rdf-schema#domain";
const RDFS_IS_DEFINED_BY: &str = "http://www.w3.org/2000/01/rdf-schema#isDefinedBy";
const OWL_VERSION_INFO: &str = "http://www.w3.org/2002/07/owl#versionInfo";

/// How an expected IRI without an exact subject match may still count as
/// resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyMatch {
    /// Only exact subject matches.
    Exact,
    /// Exact match, or a namespace IRI (ending in `#` or `/`) that prefixes
    /// a known subject.
    #[default]
    FragmentAware,
    /// Any known subject containing the IRI.
    Substring,
}

impl DependencyMatch {
    fn satisfied(self, expected: &str, actual: &BTreeSet<String>) -> bool {
        if actual.contains(expected) {
            return true;
        }
        match self {
            DependencyMatch::Exact => false,
            DependencyMatch::FragmentAware => {
                expected.ends_with(['#', '/']) && actual.iter().any(|subject| subject.starts_with(expected))
            }
            DependencyMatch::Substring => actual.iter().any(|subject| subject.contains(expected)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyClosure {
    pub expected: BTreeSet<String>,
    pub actual: BTreeSet<String>,
    pub missing: BTreeSet<String>,
}

impl DependencyClosure {
    pub fn compute(expected: BTreeSet<String>, actual: BTreeSet<String>, policy: DependencyMatch) -> Self {
        let missing = expected
            .iter()
            .filter(|iri| !policy.satisfied(iri, &actual))
            .cloned()
            .collect();
        Self {
            expected,
            actual,
            missing,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Result of resolving one context fragment.
#[derive(Debug, Clone, Default)]
pub struct ResolvedContext {
    pub graph: ReferenceGraph,
    pub closure: DependencyClosure,
    /// Objects of `rdfs:domain` on the resolved terms.
    pub domains: BTreeSet<String>,
    /// Objects of `rdfs:isDefinedBy` on the resolved terms.
    pub ontologies: BTreeSet<String>,
    pub terms: BTreeMap<String, TermSummary>,
}

/// What the ontology data says about one resolved term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermSummary {
    pub subject: String,
    pub domain: Option<String>,
    pub ontology: Option<String>,
    pub version_info: Option<String>,
}

impl TermSummary {
    fn new(subject: &str) -> Self {
        Self {
            subject: subject.to_string(),
            domain: None,
            ontology: None,
            version_info: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RightsHolder {
    #[serde(rename = "@id")]
    pub id: String,
    pub name: String,
}

/// Semantic and descriptive metadata of an annotated schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SemanticReferences {
    pub domains: BTreeSet<String>,
    pub ontologies: BTreeSet<String>,
    pub rights_holder: RightsHolder,
    pub title: String,
    pub description: String,
    pub version: String,
    pub accrual_periodicity: String,
    pub theme: String,
}

pub struct SemanticReferenceResolver {
    allowed_namespace: String,
    resolver_prefix: String,
    resolver_host: String,
    ontology_root: PathBuf,
    policy: DependencyMatch,
    offline: bool,
    fetcher: Arc<dyn OntologyFetcher>,
    local: Mutex<Option<Arc<LocalOntologyStore>>>,
    memo: RwLock<HashMap<String, Arc<Vec<Triple>>>>,
    remote_fetches: AtomicU64,
}

impl SemanticReferenceResolver {
    pub fn new(config: &EngineConfig, fetcher: Arc<dyn OntologyFetcher>) -> Self {
        Self {
            allowed_namespace: config.allowed_namespace.clone(),
            resolver_prefix: config.resolver_prefix.clone(),
            resolver_host: config.resolver_host.clone(),
            ontology_root: config.ontology_root(),
            policy: config.dependency_match,
            offline: config.fetch.offline,
            fetcher,
            local: Mutex::new(None),
            memo: RwLock::new(HashMap::new()),
            remote_fetches: AtomicU64::new(0),
        }
    }

    /// Resolver using HTTP, or no remote source at all when offline.
    pub fn from_config(config: &EngineConfig) -> Result<Self, ConformanceError> {
        Ok(Self::new(config, fetcher_for(&config.fetch)?))
    }

    pub fn remote_fetches(&self) -> u64 {
        self.remote_fetches.load(Ordering::Relaxed)
    }

    /// Remote URL serving `iri`.
    pub fn remote_url(&self, iri: &str) -> String {
        match iri.strip_prefix(&self.resolver_prefix) {
            Some(rest) => format!("{}{rest}", self.resolver_host),
            None => iri.to_string(),
        }
    }

    fn local_store(&self) -> Result<Arc<LocalOntologyStore>, ConformanceError> {
        let mut slot = self.local.lock();
        if let Some(store) = slot.as_ref() {
            return Ok(store.clone());
        }
        let store = Arc::new(LocalOntologyStore::load(&self.ontology_root)?);
        tracing::debug!(
            dir = %self.ontology_root.display(),
            files = store.file_count(),
            "local ontology store ready"
        );
        *slot = Some(store.clone());
        Ok(store)
    }

    /// Ontology data describing `iri`: local subjects first, then one remote
    /// attempt. A failed fetch yields no data, so the term stays unresolved.
    pub fn lookup(&self, iri: &str) -> Result<Arc<Vec<Triple>>, ConformanceError> {
        if let Some(hit) = self.memo.read().get(iri) {
            log_cache_operation!(hit, iri, cache = "terms");
            return Ok(hit.clone());
        }
        log_cache_operation!(miss, iri, cache = "terms");

        let local = self.local_store()?;
        let mut triples = if iri.ends_with(['#', '/']) {
            local.describe_namespace(iri)?
        } else {
            local.describe(iri)?
        };
        if triples.is_empty() && !self.offline {
            let url = self.remote_url(iri);
            self.remote_fetches.fetch_add(1, Ordering::Relaxed);
            match self.fetcher.fetch(&url).and_then(|document| document.triples()) {
                Ok(fetched) => triples = fetched,
                Err(error) => {
                    tracing::warn!(iri = iri, url = %url, error = %error, "term lookup failed");
                }
            }
        }

        let mut memo = self.memo.write();
        Ok(memo
            .entry(iri.to_string())
            .or_insert_with(|| Arc::new(triples))
            .clone())
    }

    /// Normalize one context fragment and resolve every term under the
    /// allowed namespace.
    pub fn resolve_context(&self, fragment: &Value) -> Result<ResolvedContext, ConformanceError> {
        let context = SemanticContext::parse(fragment)?;
        let graph = ReferenceGraph::normalize(&context);
        let expected = graph.predicates_in(&self.allowed_namespace);

        let mut actual = BTreeSet::new();
        let mut domains = BTreeSet::new();
        let mut ontologies = BTreeSet::new();
        let mut terms: BTreeMap<String, TermSummary> = BTreeMap::new();
        for iri in &expected {
            for triple in self.lookup(iri)?.iter() {
                let NamedOrBlankNode::NamedNode(subject) = &triple.subject else {
                    continue;
                };
                actual.insert(subject.as_str().to_string());
                if !expected.contains(subject.as_str()) {
                    continue;
                }
                let Some(value) = term_value(&triple.object) else {
                    continue;
                };
                let summary = terms
                    .entry(subject.as_str().to_string())
                    .or_insert_with(|| TermSummary::new(subject.as_str()));
                match triple.predicate.as_str() {
                    RDFS_DOMAIN => {
                        summary.domain.get_or_insert_with(|| value.clone());
                        domains.insert(value);
                    }
                    RDFS_IS_DEFINED_BY => {
                        summary.ontology.get_or_insert_with(|| value.clone());
                        ontologies.insert(value);
                    }
                    OWL_VERSION_INFO => {
                        summary.version_info.get_or_insert(value);
                    }
                    _ => {}
                }
            }
        }

        let closure = DependencyClosure::compute(expected, actual, self.policy);
        Ok(ResolvedContext {
            graph,
            closure,
            domains,
            ontologies,
            terms,
        })
    }

    /// Resolve a fragment and fail when its closure is not complete.
    pub fn resolve_closed(&self, fragment: &Value) -> Result<ResolvedContext, ConformanceError> {
        let resolved = self.resolve_context(fragment)?;
        if !resolved.closure.is_closed() {
            return Err(ConformanceError::MissingDependency {
                namespace: self.allowed_namespace.clone(),
                missing: resolved.closure.missing.iter().cloned().collect(),
            });
        }
        Ok(resolved)
    }

    /// Domains, ontologies and descriptive metadata of a schema document.
    pub fn extract_references(&self, schema: &Value) -> Result<SemanticReferences, ConformanceError> {
        let mut domains = BTreeSet::new();
        let mut ontologies = BTreeSet::new();
        for location in locate_contexts(schema) {
            let resolved = self.resolve_closed(location.fragment).inspect_err(|error| {
                tracing::debug!(pointer = %location.schema_pointer(), error = %error, "context not resolved");
            })?;
            domains.extend(resolved.domains);
            ontologies.extend(resolved.ontologies);
        }

        let scalar = |pointer: &str| {
            schema
                .pointer(pointer)
                .and_then(scalar_text)
                .unwrap_or_else(|| MISSING.to_string())
        };

        Ok(SemanticReferences {
            domains,
            ontologies,
            rights_holder: RightsHolder {
                id: scalar("/info/contact/url"),
                name: scalar("/info/contact/name"),
            },
            title: scalar("/info/title"),
            description: scalar("/info/description"),
            version: scalar("/info/version"),
            accrual_periodicity: ACCRUAL_PERIODICITY_IRREGULAR.to_string(),
            theme: THEME_TECHNOLOGY.to_string(),
        })
    }
}

fn term_value(term: &Term) -> Option<String> {
    match term {
        Term::NamedNode(node) => Some(node.as_str().to_string()),
        Term::Literal(literal) => Some(literal.value().to_string()),
        _ => None,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
