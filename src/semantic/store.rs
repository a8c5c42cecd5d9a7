//! Ontology data sources
//!
//! Terms are looked up in a local store first, built from the repository's
//! ontology subtree. Terms it does not describe are fetched once from the
//! remote resolver through an [`OntologyFetcher`].

use crate::error::ConformanceError;
use crate::log_slow_operation;
use oxigraph::io::RdfFormat;
use oxigraph::model::{NamedNodeRef, NamedOrBlankNode, Triple};
use oxigraph::store::Store;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use walkdir::WalkDir;

/// Local ontology files whose name contains this are alignments to other
/// vocabularies and are not loaded.
pub const ALIGNMENT_MARKER: &str = "aligns";

const SLOW_FETCH_MS: u64 = 2_000;

/// Remote lookup policy: one attempt, bounded by `timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    pub timeout: Duration,
    /// Never contact the remote resolver.
    pub offline: bool,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(crate::config::DEFAULT_FETCH_TIMEOUT_SECS),
            offline: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedDocument {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchedDocument {
    pub fn turtle(body: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: Some("text/turtle".to_string()),
            body: body.into(),
        }
    }

    /// Parse the body according to its media type. Unknown or missing types
    /// are read as Turtle.
    pub fn triples(&self) -> Result<Vec<Triple>, ConformanceError> {
        let format = self
            .content_type
            .as_deref()
            .and_then(|media_type| media_type.split(';').next())
            .and_then(|essence| RdfFormat::from_media_type(essence.trim()))
            .unwrap_or(RdfFormat::Turtle);

        let store = Store::new().map_err(|e| ConformanceError::Structure(e.to_string()))?;
        store
            .load_from_reader(format, self.body.as_slice())
            .map_err(|e| ConformanceError::InvalidContext {
                reason: format!("cannot parse fetched ontology data: {e}"),
            })?;

        store
            .quads_for_pattern(None, None, None, None)
            .map(|quad| {
                quad.map(|quad| Triple::new(quad.subject, quad.predicate, quad.object))
                    .map_err(|e| ConformanceError::Structure(e.to_string()))
            })
            .collect()
    }
}

/// Remote source of ontology data.
pub trait OntologyFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<FetchedDocument, ConformanceError>;
}

/// Fetches over HTTP(S), asking for Turtle.
///
/// Uses the blocking client: lookups run on blocking worker threads.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(policy: &FetchPolicy) -> Result<Self, ConformanceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(policy.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConformanceError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl OntologyFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedDocument, ConformanceError> {
        let started = Instant::now();
        let fail = |reason: String| ConformanceError::Fetch {
            iri: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/turtle")
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|e| fail(e.to_string()))?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().map_err(|e| fail(e.to_string()))?.to_vec();

        log_slow_operation!(started.elapsed(), SLOW_FETCH_MS, url = url, "remote ontology fetch");
        Ok(FetchedDocument { content_type, body })
    }
}

/// Fetcher that never succeeds, used when running offline.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineFetcher;

impl OntologyFetcher for OfflineFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedDocument, ConformanceError> {
        Err(ConformanceError::Fetch {
            iri: url.to_string(),
            reason: "offline".to_string(),
        })
    }
}

/// HTTP fetcher, or one that never succeeds when `policy` is offline.
pub fn fetcher_for(policy: &FetchPolicy) -> Result<Arc<dyn OntologyFetcher>, ConformanceError> {
    if policy.offline {
        return Ok(Arc::new(OfflineFetcher));
    }
    Ok(Arc::new(HttpFetcher::new(policy)?))
}

/// Every local ontology merged into one in-memory store.
pub struct LocalOntologyStore {
    store: Store,
    files: usize,
}

impl LocalOntologyStore {
    pub fn empty() -> Result<Self, ConformanceError> {
        let store = Store::new().map_err(|e| ConformanceError::Structure(e.to_string()))?;
        Ok(Self { store, files: 0 })
    }

    /// Load every `*.ttl` under `dir`, skipping alignment files.
    ///
    /// A file that does not parse is skipped with a warning; the `turtle`
    /// check reports it on its own. A missing directory yields an empty store.
    pub fn load(dir: &Path) -> Result<Self, ConformanceError> {
        let mut local = Self::empty()?;
        if !dir.is_dir() {
            tracing::debug!(dir = %dir.display(), "no local ontology directory");
            return Ok(local);
        }

        let started = Instant::now();
        for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    tracing::warn!(error = %error, "skipping unreadable ontology entry");
                    continue;
                }
            };
            let name = entry.file_name().to_string_lossy();
            if !entry.file_type().is_file() || !name.ends_with(".ttl") || name.contains(ALIGNMENT_MARKER) {
                continue;
            }

            let content = fs::read(entry.path()).map_err(|e| ConformanceError::io(entry.path(), e))?;
            match local.store.load_from_reader(RdfFormat::Turtle, content.as_slice()) {
                Ok(()) => local.files += 1,
                Err(error) => {
                    tracing::warn!(file = %entry.path().display(), error = %error, "skipping unparsable ontology");
                }
            }
        }

        log_slow_operation!(
            started.elapsed(),
            5_000u64,
            files = local.files,
            "local ontologies loaded"
        );
        Ok(local)
    }

    pub fn file_count(&self) -> usize {
        self.files
    }

    /// Triples whose subject is `iri`, from any graph.
    pub fn describe(&self, iri: &str) -> Result<Vec<Triple>, ConformanceError> {
        let Ok(subject) = NamedNodeRef::new(iri) else {
            return Ok(Vec::new());
        };
        self.store
            .quads_for_pattern(Some(subject.into()), None, None, None)
            .map(|quad| {
                quad.map(|quad| Triple::new(quad.subject, quad.predicate, quad.object))
                    .map_err(|e| ConformanceError::Structure(e.to_string()))
            })
            .collect()
    }

    /// One statement per named subject under `namespace`.
    ///
    /// A namespace is rarely a subject itself; any term the local data
    /// defines under it counts as evidence for it.
    pub fn describe_namespace(&self, namespace: &str) -> Result<Vec<Triple>, ConformanceError> {
        let mut seen = BTreeSet::new();
        let mut triples = Vec::new();
        for quad in self.store.iter() {
            let quad = quad.map_err(|e| ConformanceError::Structure(e.to_string()))?;
            let NamedOrBlankNode::NamedNode(subject) = &quad.subject else {
                continue;
            };
            if subject.as_str().starts_with(namespace) && seen.insert(subject.as_str().to_string()) {
                triples.push(Triple::new(quad.subject, quad.predicate, quad.object));
            }
        }
        Ok(triples)
    }

    /// Load extra Turtle into the default graph.
    pub fn insert_turtle(&mut self, turtle: &str) -> Result<(), ConformanceError> {
        self.store
            .load_from_reader(RdfFormat::Turtle, turtle.as_bytes())
            .map_err(|e| ConformanceError::InvalidContext {
                reason: e.to_string(),
            })?;
        self.files += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PERSON: &str = r#"
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix CPV: <https://w3id.org/italia/onto/CPV/> .
CPV:givenName rdfs:domain CPV:Person ;
    rdfs:isDefinedBy <https://w3id.org/italia/onto/CPV> .
"#;

    #[test]
    fn loads_local_ontologies_skipping_alignments() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("CPV/latest")).unwrap();
        fs::write(dir.path().join("CPV/latest/CPV.ttl"), PERSON).unwrap();
        fs::write(
            dir.path().join("CPV/latest/CPV-aligns.ttl"),
            "<https://w3id.org/italia/onto/CPV/aligned> <http://x/p> <http://x/o> .",
        )
        .unwrap();
        fs::write(dir.path().join("CPV/latest/broken.ttl"), "not turtle").unwrap();

        let local = LocalOntologyStore::load(dir.path()).unwrap();
        assert_eq!(local.file_count(), 1);
        assert_eq!(local.describe("https://w3id.org/italia/onto/CPV/givenName").unwrap().len(), 2);
        assert!(local.describe("https://w3id.org/italia/onto/CPV/aligned").unwrap().is_empty());
    }

    #[test]
    fn namespaces_match_every_subject_under_them() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("CPV/latest")).unwrap();
        fs::write(dir.path().join("CPV/latest/CPV.ttl"), PERSON).unwrap();
        let local = LocalOntologyStore::load(dir.path()).unwrap();

        let described = local.describe_namespace("https://w3id.org/italia/onto/CPV/").unwrap();
        assert_eq!(described.len(), 1);
        assert!(local.describe("https://w3id.org/italia/onto/CPV/").unwrap().is_empty());
        assert!(local.describe_namespace("https://w3id.org/italia/onto/CLV/").unwrap().is_empty());
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let local = LocalOntologyStore::load(&dir.path().join("nope")).unwrap();
        assert_eq!(local.file_count(), 0);
    }

    #[test]
    fn fetched_documents_parse_by_media_type() {
        let doc = FetchedDocument {
            content_type: Some("text/turtle; charset=utf-8".to_string()),
            body: PERSON.as_bytes().to_vec(),
        };
        assert_eq!(doc.triples().unwrap().len(), 2);

        let ntriples = FetchedDocument {
            content_type: Some("application/n-triples".to_string()),
            body: b"<http://a/s> <http://a/p> <http://a/o> .\n".to_vec(),
        };
        assert_eq!(ntriples.triples().unwrap().len(), 1);
    }

    #[test]
    fn offline_fetcher_always_fails() {
        assert!(OfflineFetcher.fetch("https://example.org/").is_err());
    }
}
