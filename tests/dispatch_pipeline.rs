mod support;

use semantic_conformance::validators::{ValidatorKind, ValidatorRegistry};
use semantic_conformance::{
    AssetFilter, CheckName, DispatcherFactory, EngineConfig, ValidationDispatcher, discover,
    validate, validate_with,
};
use std::path::Path;
use std::sync::Arc;
use support::{CountingValidator, StubFetcher, TestRepository};

const VALID_TURTLE: &str = "<https://example.org/a> <https://example.org/b> \"c\" .\n";

fn counting_dispatcher(config: &EngineConfig, kind: ValidatorKind, counter: &CountingValidator) -> ValidationDispatcher {
    let mut registry = ValidatorRegistry::with_defaults();
    registry.register(kind, Arc::new(counter.clone()));
    ValidationDispatcher::with_parts(config, registry, Arc::new(StubFetcher::default())).unwrap()
}

#[test]
fn framing_contexts_take_precedence_over_plain_jsonld() {
    let repo = TestRepository::new();
    let context = repo.write("assets/schemas/person/latest/context-person.ld.yaml", "\"@context\": {}\n");
    let plain = repo.write("assets/schemas/person/latest/person.ld.yaml", "\"@context\": {}\n");
    let counter = CountingValidator::default();
    let dispatcher = counting_dispatcher(&repo.config(), ValidatorKind::FramingContext, &counter);

    assert!(dispatcher.dispatch(&context, &[CheckName::Format]).is_ok());
    assert_eq!(counter.calls(), 1);

    dispatcher.dispatch(&plain, &[CheckName::Format]);
    assert_eq!(counter.calls(), 1);
}

#[test]
fn requested_checks_run_once_each() {
    let repo = TestRepository::new();
    let asset = repo.write("assets/ontologies/cpv/latest/cpv.ttl", VALID_TURTLE);
    let counter = CountingValidator::default();
    let dispatcher = counting_dispatcher(&repo.config(), ValidatorKind::Turtle, &counter);

    dispatcher.dispatch(&asset, &[CheckName::Format, CheckName::Format]);
    assert_eq!(counter.calls(), 1);
}

#[test]
fn oversized_files_are_never_read() {
    let repo = TestRepository::new();
    let asset = repo.write("assets/ontologies/big/latest/big.ttl", vec![b'#'; 5 << 20]);
    let counter = CountingValidator::default();
    let dispatcher = counting_dispatcher(&repo.config(), ValidatorKind::Turtle, &counter);

    let outcome = dispatcher.dispatch(&asset, &[CheckName::Format, CheckName::Turtle]);

    assert_eq!(counter.calls(), 0);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].starts_with("file too big"), "{:?}", outcome.errors);
}

#[test]
fn files_without_a_route_are_unsupported() {
    let repo = TestRepository::new();
    let asset = repo.write("assets/notes.txt", "hello");
    let dispatcher = ValidationDispatcher::new(&repo.config()).unwrap();

    let outcome = dispatcher.dispatch(&asset, &[]);
    assert_eq!(outcome.errors, vec![format!("unsupported file {}", Path::new("assets/notes.txt").display())]);
}

#[test]
fn unresolved_semantic_terms_name_their_schema() {
    let repo = TestRepository::new();
    let asset = repo.write(
        "assets/schemas/person/latest/person.oas3.yaml",
        r#"
openapi: 3.0.3
info: {title: People, version: 1.0.0}
paths: {}
components:
  schemas:
    Person:
      type: object
      x-jsonld-context:
        nick: https://w3id.org/italia/onto/CPV/nickName
"#,
    );
    let dispatcher = ValidationDispatcher::new(&repo.config()).unwrap();

    let outcome = dispatcher.dispatch(&asset, &[CheckName::SemanticReferences]);

    assert_eq!(outcome.errors.len(), 1);
    let error = &outcome.errors[0];
    assert!(error.contains("#/components/schemas/Person"), "{error}");
    assert!(error.contains("https://w3id.org/italia/onto/CPV/nickName"), "{error}");
}

#[tokio::test]
async fn one_failing_file_fails_the_run() {
    let repo = TestRepository::new();
    let assets = vec![
        repo.write("assets/ontologies/a/latest/a.ttl", VALID_TURTLE),
        repo.write("assets/ontologies/b/latest/b.ttl", "this is not turtle"),
        repo.write("assets/ontologies/c/latest/c.ttl", VALID_TURTLE),
    ];

    let report = validate(&repo.config(), assets, &[CheckName::Format]).await.unwrap();

    assert_eq!(report.files_checked(), 3);
    assert_eq!(report.len(), 1);
    assert_eq!(report.exit_code(), 1);
    assert!(report.errors().next().unwrap().contains("b.ttl"));
}

#[tokio::test]
async fn every_asset_is_validated_exactly_once() {
    let repo = TestRepository::new();
    let assets: Vec<_> = (0..10)
        .map(|i| repo.write(&format!("assets/ontologies/o{i}/latest/o{i}.ttl"), VALID_TURTLE))
        .collect();
    let mut config = repo.config();
    config.workers = 3;

    let counter = CountingValidator::default();
    let factory: DispatcherFactory = {
        let config = config.clone();
        let counter = counter.clone();
        Arc::new(move || {
            let mut registry = ValidatorRegistry::with_defaults();
            registry.register(ValidatorKind::Turtle, Arc::new(counter.clone()));
            ValidationDispatcher::with_parts(&config, registry, Arc::new(StubFetcher::default()))
        })
    };

    let report = validate_with(&config, assets, &[], factory).await.unwrap();

    assert!(report.is_empty());
    assert_eq!(report.files_checked(), 10);
    assert_eq!(counter.calls(), 10);
}

#[test]
fn discovery_skips_generated_and_documentation_files() {
    let repo = TestRepository::new();
    repo.write("assets/ontologies/cpv/latest/cpv.ttl", VALID_TURTLE);
    repo.write("assets/ontologies/cpv/latest/index.ttl", VALID_TURTLE);
    repo.write("assets/ontologies/cpv/latest/README.md", "# CPV");
    repo.write("assets/schemas/person/latest/person.oas3.yaml", "openapi: 3.0.3");

    let config = repo.config();
    let everything = discover(&config, Path::new("assets"), &AssetFilter::default()).unwrap();
    let names: Vec<_> = everything.iter().map(|asset| asset.file_name().to_string()).collect();
    assert_eq!(names, vec!["cpv.ttl", "person.oas3.yaml"]);

    let turtle_only = discover(&config, Path::new("assets"), &AssetFilter::new(".ttl", Vec::new())).unwrap();
    assert_eq!(turtle_only.len(), 1);

    assert!(discover(&config, Path::new("missing"), &AssetFilter::default()).is_err());
}
