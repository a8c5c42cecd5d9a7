#![allow(dead_code)]

use semantic_conformance::semantic::{FetchedDocument, OntologyFetcher};
use semantic_conformance::validators::{ValidationInput, Validator, ValidatorOutcome};
use semantic_conformance::{AssetPath, ConformanceError, EngineConfig};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::{TempDir, tempdir};

pub const EMPTY_RULES: &str = "@prefix sh: <http://www.w3.org/ns/shacl#> .\n";

/// A throwaway asset repository.
pub struct TestRepository {
    _tempdir: TempDir,
    root: PathBuf,
}

impl TestRepository {
    pub fn new() -> Self {
        let tempdir = tempdir().expect("tempdir");
        let root = tempdir.path().to_path_buf();
        Self {
            _tempdir: tempdir,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn write(&self, relative: &str, content: impl AsRef<[u8]>) -> AssetPath {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create dir");
        }
        std::fs::write(&path, content).expect("write file");
        AssetPath::new(&self.root, &path)
    }

    pub fn mkdir(&self, relative: &str) {
        std::fs::create_dir_all(self.path(relative)).expect("create dir");
    }

    /// Offline configuration rooted here.
    pub fn config(&self) -> EngineConfig {
        let mut config = EngineConfig::for_root(&self.root);
        config.fetch.offline = true;
        config
    }
}

/// Validator that counts its calls and always passes.
#[derive(Clone, Default)]
pub struct CountingValidator {
    calls: Arc<AtomicUsize>,
}

impl CountingValidator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Validator for CountingValidator {
    fn name(&self) -> &str {
        "counting"
    }

    fn description(&self) -> &str {
        "counts calls"
    }

    fn validate(&self, _input: &ValidationInput<'_>) -> ValidatorOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ValidatorOutcome::pass()
    }
}

/// Fetcher serving canned Turtle by URL.
#[derive(Default)]
pub struct StubFetcher {
    documents: HashMap<String, String>,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub fn with(mut self, url: &str, turtle: &str) -> Self {
        self.documents.insert(url.to_string(), turtle.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OntologyFetcher for StubFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedDocument, ConformanceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.documents
            .get(url)
            .map(|turtle| FetchedDocument::turtle(turtle.as_bytes().to_vec()))
            .ok_or_else(|| ConformanceError::Fetch {
                iri: url.to_string(),
                reason: "404 Not Found".to_string(),
            })
    }
}
