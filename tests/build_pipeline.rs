mod support;

use semantic_conformance::{BuildRequest, build};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use support::TestRepository;

const ONTOLOGY: &str = r#"@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
<https://w3id.org/italia/onto/CPV> a owl:Ontology ;
    rdfs:label "CPV"@en .
"#;

const SCHEMA: &str = "openapi: 3.0.3\ninfo:\n  title: People\n  version: 1.0.0\npaths: {}\n";

fn backdate(path: &Path) {
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - Duration::from_secs(3600))
        .unwrap();
}

fn sample(repo: &TestRepository) {
    repo.write("assets/ontologies/cpv/latest/cpv.ttl", ONTOLOGY);
    repo.write("assets/schemas/person/latest/person.oas3.yaml", SCHEMA);
    repo.write(
        "assets/schemas/person/latest/context-person.ld.yaml",
        "\"@context\":\n  name: https://w3id.org/italia/onto/CPV/givenName\n",
    );
    for file in [
        "assets/ontologies/cpv/latest/cpv.ttl",
        "assets/schemas/person/latest/person.oas3.yaml",
        "assets/schemas/person/latest/context-person.ld.yaml",
    ] {
        backdate(&repo.path(file));
    }
}

#[tokio::test]
async fn builds_both_artifact_families_by_default() {
    let repo = TestRepository::new();
    sample(&repo);

    let report = build(&repo.config(), &BuildRequest::default()).await.unwrap();

    assert!(report.is_success(), "{report}");
    let mut built = report.built.clone();
    built.sort();
    assert_eq!(
        built,
        [
            "_build/assets/ontologies/cpv/latest/cpv.nt",
            "_build/assets/schemas/person/latest/context-person.jsonld",
            "_build/assets/schemas/person/latest/context-person.ld.yaml",
            "_build/assets/schemas/person/latest/person.oas3.json",
            "_build/assets/schemas/person/latest/person.oas3.yaml",
        ]
        .map(PathBuf::from)
    );

    let json: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(repo.path("_build/assets/schemas/person/latest/person.oas3.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(json["info"]["title"], "People");

    let ntriples = fs::read_to_string(repo.path("_build/assets/ontologies/cpv/latest/cpv.nt")).unwrap();
    assert_eq!(ntriples.lines().count(), 2);
    assert!(ntriples.contains("\"CPV\"@en"));
}

#[tokio::test]
async fn artifact_families_can_be_selected() {
    let repo = TestRepository::new();
    sample(&repo);
    let request = BuildRequest {
        semantic: true,
        ..BuildRequest::default()
    };

    let report = build(&repo.config(), &request).await.unwrap();

    assert_eq!(
        report.built,
        vec![PathBuf::from("_build/assets/ontologies/cpv/latest/cpv.nt")]
    );
    assert!(!repo.path("_build/assets/schemas").exists());
}

#[tokio::test]
async fn fresh_artifacts_are_not_rebuilt() {
    let repo = TestRepository::new();
    sample(&repo);
    let config = repo.config();

    let first = build(&config, &BuildRequest::default()).await.unwrap();
    let second = build(&config, &BuildRequest::default()).await.unwrap();

    assert_eq!(first.built.len(), 5);
    assert!(second.built.is_empty());
    assert_eq!(second.up_to_date, 5);
}

#[tokio::test]
async fn failed_validation_builds_nothing() {
    let repo = TestRepository::new();
    sample(&repo);
    repo.write("assets/ontologies/broken/latest/broken.ttl", "not turtle");
    let request = BuildRequest {
        validate: true,
        ..BuildRequest::default()
    };

    let report = build(&repo.config(), &request).await.unwrap();

    assert!(!report.is_success());
    assert_eq!(report.exit_code(), 1);
    assert!(report.built.is_empty());
    assert!(!repo.path("_build").exists());
}

#[tokio::test]
async fn unconvertible_assets_are_reported_and_the_rest_built() {
    let repo = TestRepository::new();
    sample(&repo);
    repo.write("assets/ontologies/broken/latest/broken.ttl", "not turtle");

    let report = build(&repo.config(), &BuildRequest::default()).await.unwrap();

    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].contains("broken.ttl"), "{:?}", report.failures);
    assert_eq!(report.built.len(), 5);
}
