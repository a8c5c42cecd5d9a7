//! Turtle syntax validator

use super::{ValidationInput, Validator, ValidatorOutcome};
use crate::rules::shacl::parse_turtle;

pub struct TurtleValidator;

impl Validator for TurtleValidator {
    fn name(&self) -> &str {
        "turtle"
    }

    fn description(&self) -> &str {
        "Parses the file as RDF Turtle"
    }

    fn validate(&self, input: &ValidationInput<'_>) -> ValidatorOutcome {
        let text = match input.text() {
            Ok(text) => text,
            Err(outcome) => return outcome,
        };
        match parse_turtle(text) {
            Ok(store) => {
                tracing::trace!(asset = %input.path, quads = store.len().unwrap_or(0), "turtle parsed");
                ValidatorOutcome::pass()
            }
            Err(error) => ValidatorOutcome::fail(format!("not a valid Turtle file: {error:#}")),
        }
    }
}
