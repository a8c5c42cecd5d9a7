//! Structural discovery of embedded contexts

use super::context::CONTEXT_KEY;
use serde_json::Value;
use std::fmt;

/// Documents nested deeper than this are not searched further.
pub const MAX_WALK_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // RFC 6901 escaping
            PathSegment::Key(key) => write!(f, "{}", key.replace('~', "~0").replace('/', "~1")),
            PathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

/// One `x-jsonld-context` occurrence.
#[derive(Debug, Clone)]
pub struct ContextLocation<'a> {
    /// Path to the enclosing schema object.
    pub path: Vec<PathSegment>,
    pub fragment: &'a Value,
    /// Object that carries the context key.
    pub parent: &'a Value,
}

impl ContextLocation<'_> {
    /// URI fragment pointing at the enclosing schema, e.g.
    /// `#/components/schemas/Person`.
    pub fn schema_pointer(&self) -> String {
        let mut pointer = String::from("#");
        for segment in &self.path {
            pointer.push('/');
            pointer.push_str(&segment.to_string());
        }
        pointer
    }

    /// JSON pointer of the context fragment itself.
    pub fn pointer(&self) -> String {
        format!("{}/{}", &self.schema_pointer()[1..], CONTEXT_KEY)
    }
}

/// Every context fragment in `document`, in document key order.
///
/// Context fragments themselves are not searched for nested occurrences.
pub fn locate_contexts(document: &Value) -> Vec<ContextLocation<'_>> {
    let mut found = Vec::new();
    let mut path = Vec::new();
    walk(document, &mut path, &mut found);
    found
}

fn walk<'a>(value: &'a Value, path: &mut Vec<PathSegment>, found: &mut Vec<ContextLocation<'a>>) {
    if path.len() >= MAX_WALK_DEPTH {
        tracing::warn!(depth = path.len(), "context search depth exceeded");
        return;
    }
    match value {
        Value::Object(map) => {
            if let Some(fragment) = map.get(CONTEXT_KEY) {
                found.push(ContextLocation {
                    path: path.clone(),
                    fragment,
                    parent: value,
                });
            }
            for (key, child) in map {
                if key == CONTEXT_KEY {
                    continue;
                }
                path.push(PathSegment::Key(key.clone()));
                walk(child, path, found);
                path.pop();
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                path.push(PathSegment::Index(index));
                walk(child, path, found);
                path.pop();
            }
        }
        _ => {}
    }
}
