//! JSON-LD context model
//!
//! Entries are classified once, at parse time: string values ending in `#`
//! or `/` declare a namespace, everything else maps a field. Keywords
//! (`@vocab`, `@base`, `@language`, ...) are kept apart from both.

use crate::error::ConformanceError;
use oxigraph::model::NamedNode;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Key under which schemas embed a JSON-LD context.
pub const CONTEXT_KEY: &str = "x-jsonld-context";

#[derive(Debug, Clone, PartialEq)]
pub enum ContextEntry {
    Namespace(String),
    Field(FieldMapping),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldMapping {
    /// Plain term, CURIE or IRI.
    Term(String),
    /// Expanded term definition.
    Definition {
        id: Option<String>,
        kind: Option<String>,
        context: Option<Box<SemanticContext>>,
    },
    /// Explicitly unmapped (`null`).
    Null,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SemanticContext {
    entries: BTreeMap<String, ContextEntry>,
    keywords: BTreeMap<String, Value>,
}

impl SemanticContext {
    /// Parse a context fragment. Arrays of context objects are merged in
    /// order, later entries overriding earlier ones.
    pub fn parse(value: &Value) -> Result<Self, ConformanceError> {
        let mut context = SemanticContext::default();
        match value {
            Value::Object(map) => context.merge_object(map)?,
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::Object(map) => context.merge_object(map)?,
                        Value::Null => context = SemanticContext::default(),
                        other => return Err(invalid(format!("unsupported context item {other}"))),
                    }
                }
            }
            Value::String(url) => {
                return Err(invalid(format!("remote context {url} is not supported")));
            }
            other => return Err(invalid(format!("context must be an object, got {other}"))),
        }
        Ok(context)
    }

    fn merge_object(&mut self, map: &Map<String, Value>) -> Result<(), ConformanceError> {
        for (key, value) in map {
            if key.starts_with('@') {
                self.keywords.insert(key.clone(), value.clone());
                continue;
            }
            let entry = match value {
                Value::String(iri) if iri.ends_with(['#', '/']) => ContextEntry::Namespace(iri.clone()),
                Value::String(term) => ContextEntry::Field(FieldMapping::Term(term.clone())),
                Value::Null => ContextEntry::Field(FieldMapping::Null),
                Value::Object(definition) => ContextEntry::Field(parse_definition(key, definition)?),
                other => {
                    return Err(invalid(format!("term {key:?} has unsupported definition {other}")));
                }
            };
            self.entries.insert(key.clone(), entry);
        }
        Ok(())
    }

    /// Context in effect inside a scoped definition: this context with the
    /// nested entries layered on top.
    pub fn scoped(&self, nested: &SemanticContext) -> SemanticContext {
        let mut merged = self.clone();
        merged
            .entries
            .extend(nested.entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
            .keywords
            .extend(nested.keywords.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &ContextEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, key: &str) -> Option<&ContextEntry> {
        self.entries.get(key)
    }

    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.keywords.get(name)
    }

    pub fn vocab(&self) -> Option<&str> {
        self.keywords.get("@vocab").and_then(Value::as_str)
    }

    pub fn namespaces(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|(k, v)| match v {
            ContextEntry::Namespace(iri) => Some((k.as_str(), iri.as_str())),
            ContextEntry::Field(_) => None,
        })
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldMapping)> {
        self.entries.iter().filter_map(|(k, v)| match v {
            ContextEntry::Field(field) => Some((k.as_str(), field)),
            ContextEntry::Namespace(_) => None,
        })
    }

    /// Expand a term, CURIE or IRI to an absolute IRI.
    ///
    /// Returns `None` for keywords, blank node identifiers, and values that
    /// cannot be expanded or do not form a valid IRI.
    pub fn expand_iri(&self, value: &str) -> Option<String> {
        if value.is_empty() || value.starts_with('@') {
            return None;
        }

        let expanded = match value.split_once(':') {
            Some(("_", _)) => return None,
            Some((_, suffix)) if suffix.starts_with("//") => value.to_string(),
            Some((prefix, suffix)) => match self.entries.get(prefix) {
                Some(ContextEntry::Namespace(namespace)) => format!("{namespace}{suffix}"),
                Some(ContextEntry::Field(FieldMapping::Term(iri))) if iri.contains("://") => {
                    format!("{iri}{suffix}")
                }
                _ => value.to_string(),
            },
            None => format!("{}{value}", self.vocab()?),
        };

        NamedNode::new(expanded.as_str()).ok().map(|_| expanded)
    }
}

fn parse_definition(key: &str, definition: &Map<String, Value>) -> Result<FieldMapping, ConformanceError> {
    let id = match definition.get("@id") {
        Some(Value::String(id)) => Some(id.clone()),
        Some(Value::Null) => return Ok(FieldMapping::Null),
        None => None,
        Some(other) => return Err(invalid(format!("@id of {key:?} must be a string, got {other}"))),
    };
    let kind = definition
        .get("@type")
        .and_then(Value::as_str)
        .map(str::to_string);
    let context = match definition.get("@context") {
        Some(nested) => Some(Box::new(SemanticContext::parse(nested)?)),
        None => None,
    };
    Ok(FieldMapping::Definition { id, kind, context })
}

fn invalid(reason: String) -> ConformanceError {
    ConformanceError::InvalidContext { reason }
}

/// A framing document split into its parts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FramingComponents {
    pub namespaces: BTreeMap<String, String>,
    pub fields: BTreeMap<String, Value>,
    /// Field used as the row key, from `_meta.index`.
    pub index: Option<String>,
    /// Context for dataset metadata, from `_meta._context`.
    pub metadata_context: Option<Value>,
}

impl FramingComponents {
    /// Split the top-level `@context` of a frame. Nested contexts are not
    /// split. An index that names no field is dropped with the metadata
    /// context.
    pub fn from_frame(frame: &Value) -> Result<Self, ConformanceError> {
        let context = frame
            .get("@context")
            .and_then(Value::as_object)
            .ok_or_else(|| invalid("frame has no @context object".to_string()))?;

        let mut components = FramingComponents::default();
        for (key, value) in context {
            match value {
                Value::String(iri) if iri.ends_with(['#', '/']) => {
                    components.namespaces.insert(key.clone(), iri.clone());
                }
                other => {
                    components.fields.insert(key.clone(), other.clone());
                }
            }
        }

        let meta = frame.get("_meta");
        let index = meta
            .and_then(|meta| meta.get("index"))
            .and_then(Value::as_str)
            .filter(|index| components.fields.contains_key(*index));
        if let Some(index) = index {
            components.index = Some(index.to_string());
            components.metadata_context = meta.and_then(|meta| meta.get("_context")).cloned();
        }

        Ok(components)
    }
}
