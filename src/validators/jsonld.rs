//! JSON-LD document shape validator
//!
//! Checks what a JSON-LD processor would reject before expansion: the
//! document is a node object or an array of them, every `@context` is a
//! usable local context, and the core keywords carry values of the right
//! type. Remote contexts are not dereferenced.

use super::{ValidationInput, Validator, ValidatorOutcome};
use crate::semantic::SemanticContext;
use serde_json::Value;

pub struct JsonLdValidator;

impl Validator for JsonLdValidator {
    fn name(&self) -> &str {
        "jsonld"
    }

    fn description(&self) -> &str {
        "Checks YAML-encoded JSON-LD document structure"
    }

    fn validate(&self, input: &ValidationInput<'_>) -> ValidatorOutcome {
        ValidatorOutcome::from_result(input.yaml().and_then(|document| check_document(&document)))
    }
}

pub(crate) fn check_document(document: &Value) -> Result<(), ValidatorOutcome> {
    match document {
        Value::Object(_) => check_node(document, "$"),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .try_for_each(|(index, item)| check_node(item, &format!("$[{index}]"))),
        other => Err(ValidatorOutcome::fail(format!(
            "JSON-LD document must be an object or an array, got {}",
            type_name(other)
        ))),
    }
}

fn check_node(node: &Value, at: &str) -> Result<(), ValidatorOutcome> {
    let Value::Object(map) = node else {
        // Values and literals are fine anywhere below the top level.
        return Ok(());
    };

    if let Some(context) = map.get("@context") {
        if !context.is_string() {
            SemanticContext::parse(context)
                .map_err(|e| ValidatorOutcome::fail(format!("{at}.@context: {e}")))?;
        }
    }
    if let Some(id) = map.get("@id") {
        if !id.is_string() {
            return Err(ValidatorOutcome::fail(format!("{at}.@id must be a string")));
        }
    }
    if let Some(kind) = map.get("@type") {
        let ok = match kind {
            Value::String(_) => true,
            Value::Array(items) => items.iter().all(Value::is_string),
            _ => false,
        };
        if !ok {
            return Err(ValidatorOutcome::fail(format!(
                "{at}.@type must be a string or an array of strings"
            )));
        }
    }
    if let Some(graph) = map.get("@graph") {
        if !graph.is_array() && !graph.is_object() {
            return Err(ValidatorOutcome::fail(format!("{at}.@graph must be an array or an object")));
        }
    }

    for (key, value) in map {
        if key == "@context" {
            continue;
        }
        match value {
            Value::Object(_) => check_node(value, &format!("{at}.{key}"))?,
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    check_node(item, &format!("{at}.{key}[{index}]"))?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AssetPath;
    use std::path::Path;

    fn run(content: &str) -> ValidatorOutcome {
        let asset = AssetPath::new(Path::new("/repo"), Path::new("/repo/a.ld.yaml"));
        JsonLdValidator.validate(&ValidationInput::new(&asset, content.as_bytes()))
    }

    #[test]
    fn accepts_a_context_document() {
        let outcome = run(r#"
"@context":
  "@vocab": "https://w3id.org/italia/onto/CPV/"
  name: givenName
"@id": https://example.org/p/1
name: Mario
"#);
        assert!(outcome.valid, "{}", outcome.fragment);
    }

    #[test]
    fn rejects_scalars_and_bad_keywords() {
        assert!(!run("42").valid);
        assert!(!run("\"@id\": 3\n").valid);
        assert!(!run("\"@type\": {a: b}\n").valid);
        assert!(!run("\"@context\": {name: 3}\n").valid);
    }

    #[test]
    fn rejects_broken_yaml() {
        let outcome = run("a: [b\n");
        assert!(!outcome.valid);
        assert!(outcome.fragment.contains("cannot parse YAML"));
    }
}
