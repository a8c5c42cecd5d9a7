//! OpenAPI 3 structure validator

use super::{ValidationInput, Validator, ValidatorOutcome};
use serde_json::Value;

pub struct OpenApiValidator;

impl Validator for OpenApiValidator {
    fn name(&self) -> &str {
        "openapi"
    }

    fn description(&self) -> &str {
        "Checks OpenAPI 3 document structure and local references"
    }

    fn validate(&self, input: &ValidationInput<'_>) -> ValidatorOutcome {
        ValidatorOutcome::from_result(input.yaml().and_then(|document| check_document(&document)))
    }
}

fn check_document(document: &Value) -> Result<(), ValidatorOutcome> {
    let fail = |message: String| Err(ValidatorOutcome::fail(message));

    let Some(root) = document.as_object() else {
        return fail("OpenAPI document must be a mapping".to_string());
    };

    // `openapi: 3.1` is a YAML float
    let version = root.get("openapi").and_then(|value| match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    });
    match version {
        Some(version) if version.starts_with("3.") => {}
        Some(version) => return fail(format!("unsupported OpenAPI version {version:?}")),
        None => return fail("missing field `openapi`".to_string()),
    }

    let Some(info) = root.get("info").and_then(Value::as_object) else {
        return fail("missing object field `info`".to_string());
    };
    for field in ["title", "version"] {
        if !info.get(field).is_some_and(Value::is_string) {
            return fail(format!("missing string field `info.{field}`"));
        }
    }

    let has_paths = root.get("paths").is_some_and(Value::is_object);
    let has_components = root.get("components").is_some_and(Value::is_object);
    let has_webhooks = root.get("webhooks").is_some_and(Value::is_object);
    if !(has_paths || has_components || has_webhooks) {
        return fail("document needs one of `paths`, `components` or `webhooks`".to_string());
    }

    if let Some(schemas) = document.pointer("/components/schemas").and_then(Value::as_object) {
        for (name, schema) in schemas {
            if !schema.is_object() && !schema.is_boolean() {
                return fail(format!("components.schemas.{name} must be a schema object"));
            }
        }
    }

    let mut dangling = Vec::new();
    collect_dangling_refs(document, document, &mut dangling);
    if !dangling.is_empty() {
        dangling.sort();
        dangling.dedup();
        return fail(format!("unresolved references: {}", dangling.join(", ")));
    }
    Ok(())
}

/// Local `$ref`s (starting with `#`) that do not resolve inside the document.
fn collect_dangling_refs(root: &Value, value: &Value, dangling: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get("$ref") {
                if let Some(pointer) = reference.strip_prefix('#') {
                    if !pointer.is_empty() && root.pointer(pointer).is_none() {
                        dangling.push(reference.clone());
                    }
                }
            }
            for child in map.values() {
                collect_dangling_refs(root, child, dangling);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_dangling_refs(root, item, dangling);
            }
        }
        _ => {}
    }
}
