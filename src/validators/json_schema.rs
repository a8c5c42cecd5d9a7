//! JSON Schema validator
//!
//! Meta-validates `*.schema.yaml` documents against Draft 7, the draft the
//! repository's schemas are written for.

use super::{ValidationInput, Validator, ValidatorOutcome};
use serde_json::Value;

pub struct JsonSchemaValidator;

impl Validator for JsonSchemaValidator {
    fn name(&self) -> &str {
        "jsonschema"
    }

    fn description(&self) -> &str {
        "Checks a JSON Schema against the Draft 7 meta-schema"
    }

    fn validate(&self, input: &ValidationInput<'_>) -> ValidatorOutcome {
        ValidatorOutcome::from_result(input.yaml().and_then(|schema| check_schema(&schema)))
    }
}

pub fn check_schema(schema: &Value) -> Result<(), ValidatorOutcome> {
    jsonschema::draft7::meta::validate(schema).map_err(|error| {
        ValidatorOutcome::fail(format!(
            "JSON Schema error at {}: {error}",
            display_pointer(&error.instance_path.to_string())
        ))
    })
}

fn display_pointer(pointer: &str) -> &str {
    if pointer.is_empty() { "/" } else { pointer }
}
