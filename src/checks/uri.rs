//! Turtle file name vs. main subject IRI

use super::{StructureCheck, file_stem};
use crate::error::ConformanceError;
use crate::rules::parse_turtle;
use crate::validators::ValidationInput;
use oxigraph::model::vocab::rdf;
use oxigraph::model::{NamedNodeRef, NamedOrBlankNode};
use oxigraph::store::Store;
use std::path::{Component, Path};

const OWL_ONTOLOGY: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#Ontology");
const DCATAPIT_DATASET: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://dati.gov.it/onto/dcatapit#Dataset");
const SKOS_CONCEPT_SCHEME: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#ConceptScheme");

/// The main subject of a Turtle asset ends with the file stem.
///
/// Under an ontology tree the main subject is the `owl:Ontology`; elsewhere
/// a `dcatapit:Dataset`, falling back to a `skos:ConceptScheme`. In schema
/// trees the IRI names a sibling file instead, which must exist.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilenameMatchUriCheck;

impl StructureCheck for FilenameMatchUriCheck {
    fn name(&self) -> &str {
        "filename-match-uri"
    }

    fn description(&self) -> &str {
        "Turtle file names match the IRI of their main subject"
    }

    fn check(&self, input: &ValidationInput<'_>) -> Result<(), ConformanceError> {
        let relative = input.path.relative();
        if relative.extension().and_then(|e| e.to_str()) != Some("ttl") {
            return Ok(());
        }
        let text = std::str::from_utf8(input.content).map_err(|e| ConformanceError::NotDecodable {
            path: relative.to_path_buf(),
            reason: e.to_string(),
        })?;
        let store = parse_turtle(text).map_err(|e| {
            ConformanceError::Structure(format!("Cannot parse {}: {e:#}", input.path))
        })?;

        let in_ontology_tree = relative
            .parent()
            .and_then(Path::parent)
            .is_some_and(|dir| dir.to_string_lossy().contains("onto"));
        let classes: &[NamedNodeRef<'static>] = if in_ontology_tree {
            &[OWL_ONTOLOGY]
        } else {
            &[DCATAPIT_DATASET, SKOS_CONCEPT_SCHEME]
        };

        let Some(subject) = main_subject(&store, classes)? else {
            return Err(ConformanceError::Structure(format!(
                "No main subject ({}) found in {}",
                classes.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(" or "),
                input.path
            )));
        };
        let segment = last_segment(&subject);
        tracing::debug!(asset = %input.path, subject = %subject, segment, "main subject");

        if in_schema_tree(relative) {
            let referenced = input
                .path
                .absolute()
                .parent()
                .map(|dir| dir.join(segment));
            if referenced.is_some_and(|path| path.exists()) {
                return Ok(());
            }
            return Err(ConformanceError::Structure(format!(
                "File {segment:?} referenced by <{subject}> not found next to {}",
                input.path
            )));
        }

        let stem = file_stem(input.path.file_name());
        if stem == segment {
            return Ok(());
        }
        Err(ConformanceError::Structure(format!(
            "File name {stem:?} does not match the IRI <{subject}> in {}",
            input.path
        )))
    }
}

/// First IRI, in sorted order, typed with the first class that has one.
fn main_subject(
    store: &Store,
    classes: &[NamedNodeRef<'static>],
) -> Result<Option<String>, ConformanceError> {
    for class in classes {
        let mut subjects = Vec::new();
        for quad in store.quads_for_pattern(None, Some(rdf::TYPE), Some((*class).into()), None) {
            let quad = quad.map_err(|e| ConformanceError::Structure(e.to_string()))?;
            if let NamedOrBlankNode::NamedNode(node) = quad.subject {
                subjects.push(node.into_string());
            }
        }
        subjects.sort();
        if let Some(first) = subjects.into_iter().next() {
            return Ok(Some(first));
        }
    }
    Ok(None)
}

/// Last path segment of an IRI, ignoring a trailing `/` or `#`.
fn last_segment(iri: &str) -> &str {
    let trimmed = iri.trim_end_matches(['/', '#']);
    trimmed.rsplit(['/', '#']).next().unwrap_or(trimmed)
}

/// Second repository path component names a schema tree.
fn in_schema_tree(relative: &Path) -> bool {
    relative
        .components()
        .nth(1)
        .is_some_and(|c| matches!(c, Component::Normal(part) if part.to_string_lossy().contains("schema")))
}
