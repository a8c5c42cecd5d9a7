//! Framing context validator
//!
//! A framing context (`context-*.ld.yaml`) is a JSON-LD document whose
//! `@context` maps CSV columns to terms. When it has a `_meta` section, the
//! declared `index` must name one of the mapped fields.

use super::jsonld::check_document;
use super::{ValidationInput, Validator, ValidatorOutcome};
use crate::semantic::FramingComponents;
use serde_json::Value;

pub struct FramingContextValidator;

impl Validator for FramingContextValidator {
    fn name(&self) -> &str {
        "framing-context"
    }

    fn description(&self) -> &str {
        "Checks JSON-LD framing contexts and their index field"
    }

    fn validate(&self, input: &ValidationInput<'_>) -> ValidatorOutcome {
        ValidatorOutcome::from_result(input.yaml().and_then(|frame| check_frame(&frame)))
    }
}

fn check_frame(frame: &Value) -> Result<(), ValidatorOutcome> {
    check_document(frame)?;

    let Some(meta) = frame.get("_meta") else {
        return Ok(());
    };
    let index = meta
        .get("index")
        .and_then(Value::as_str)
        .ok_or_else(|| ValidatorOutcome::fail("_meta.index must be a string"))?;

    let components =
        FramingComponents::from_frame(frame).map_err(|e| ValidatorOutcome::fail(e.to_string()))?;
    if components.index.is_none() {
        return Err(ValidatorOutcome::fail(format!(
            "_meta.index {index:?} is not a field of @context"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AssetPath;
    use std::path::Path;

    fn run(content: &str) -> ValidatorOutcome {
        let asset = AssetPath::new(Path::new("/repo"), Path::new("/repo/context-x.ld.yaml"));
        FramingContextValidator.validate(&ValidationInput::new(&asset, content.as_bytes()))
    }

    #[test]
    fn indexed_frame_passes() {
        let outcome = run(r#"
"@context":
  skos: http://www.w3.org/2004/02/skos/core#
  code: skos:notation
_meta:
  index: code
"#);
        assert!(outcome.valid, "{}", outcome.fragment);
    }

    #[test]
    fn frame_without_meta_passes() {
        assert!(run("\"@context\": {code: \"skos:notation\"}\n").valid);
    }

    #[test]
    fn dangling_index_fails() {
        let outcome = run(r#"
"@context": {code: "skos:notation"}
_meta: {index: label}
"#);
        assert!(!outcome.valid);
        assert!(outcome.fragment.contains("label"));
    }

    #[test]
    fn non_string_index_fails() {
        assert!(!run("\"@context\": {code: x}\n_meta: {index: 3}\n").valid);
    }
}
