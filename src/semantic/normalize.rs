//! Canonical normalization of a context into reference triples
//!
//! Each context (and each scoped context nested in a term definition)
//! becomes one subject. The statements about it are expanded, rendered as
//! N-Triples lines and sorted; the subject label is the SHA-256 digest of
//! those lines, so the graph does not depend on key order or on the document
//! the context came from.

use super::context::{ContextEntry, FieldMapping, SemanticContext};
use oxigraph::model::{Literal, NamedNode, Term};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalTriple {
    /// Blank node label, without the `_:` prefix.
    pub subject: String,
    pub predicate: NamedNode,
    pub object: Term,
}

impl CanonicalTriple {
    pub fn to_ntriples(&self) -> String {
        format!("_:{} {} {} .", self.subject, self.predicate, self.object)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceGraph {
    triples: Vec<CanonicalTriple>,
}

impl ReferenceGraph {
    pub fn normalize(context: &SemanticContext) -> Self {
        let mut triples = Vec::new();
        collect(context, context, &mut triples);
        triples.sort_by_cached_key(CanonicalTriple::to_ntriples);
        triples.dedup();
        Self { triples }
    }

    pub fn triples(&self) -> &[CanonicalTriple] {
        &self.triples
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn predicates(&self) -> BTreeSet<String> {
        self.triples
            .iter()
            .map(|triple| triple.predicate.as_str().to_string())
            .collect()
    }

    /// Predicates whose IRI starts with `namespace`.
    pub fn predicates_in(&self, namespace: &str) -> BTreeSet<String> {
        self.triples
            .iter()
            .map(|triple| triple.predicate.as_str())
            .filter(|iri| iri.starts_with(namespace))
            .map(str::to_string)
            .collect()
    }

    /// Sorted N-Triples serialization.
    pub fn to_ntriples(&self) -> String {
        let mut out = String::new();
        for triple in &self.triples {
            out.push_str(&triple.to_ntriples());
            out.push('\n');
        }
        out
    }
}

/// Statements come from `own` entries; IRIs expand against `scope`, which
/// also carries the entries of every enclosing context.
fn collect(own: &SemanticContext, scope: &SemanticContext, triples: &mut Vec<CanonicalTriple>) {
    let mut statements: Vec<(NamedNode, Term)> = Vec::new();

    for (key, entry) in own.entries() {
        match entry {
            ContextEntry::Namespace(iri) => {
                if let Ok(predicate) = NamedNode::new(iri.as_str()) {
                    statements.push((predicate, Literal::new_simple_literal(iri.as_str()).into()));
                }
            }
            ContextEntry::Field(FieldMapping::Term(value)) => {
                if let Some(predicate) = expand(scope, value) {
                    statements.push((predicate, Literal::new_simple_literal(value.as_str()).into()));
                }
            }
            ContextEntry::Field(FieldMapping::Definition { id, context: nested, .. }) => {
                let target = id.as_deref().unwrap_or(key);
                if let Some(predicate) = expand(scope, target) {
                    let object: Term = match id {
                        Some(_) => predicate.clone().into(),
                        None => Literal::new_simple_literal(key).into(),
                    };
                    statements.push((predicate, object));
                }
                if let Some(nested) = nested {
                    collect(nested, &scope.scoped(nested), triples);
                }
            }
            ContextEntry::Field(FieldMapping::Null) => {}
        }
    }

    if statements.is_empty() {
        return;
    }

    let mut lines: Vec<String> = statements
        .iter()
        .map(|(predicate, object)| format!("{predicate} {object} ."))
        .collect();
    lines.sort();
    lines.dedup();

    let mut hasher = Sha256::new();
    hasher.update(lines.join("\n").as_bytes());
    let subject = format!("c14n{:x}", hasher.finalize());

    triples.extend(statements.into_iter().map(|(predicate, object)| CanonicalTriple {
        subject: subject.clone(),
        predicate,
        object,
    }));
}

fn expand(context: &SemanticContext, value: &str) -> Option<NamedNode> {
    context
        .expand_iri(value)
        .and_then(|iri| NamedNode::new(iri).ok())
}
