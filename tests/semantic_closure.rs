mod support;

use assert_matches::assert_matches;
use semantic_conformance::semantic::SemanticReferenceResolver;
use semantic_conformance::{ConformanceError, EngineConfig};
use serde_json::json;
use std::sync::Arc;
use support::{StubFetcher, TestRepository};

const CPV: &str = r#"
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix CPV: <https://w3id.org/italia/onto/CPV/> .
CPV:givenName rdfs:domain CPV:Person ;
    rdfs:isDefinedBy <https://w3id.org/italia/onto/CPV> ;
    owl:versionInfo "1.0" .
"#;

const CLV_HAS_CITY: &str = r#"
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix CLV: <https://w3id.org/italia/onto/CLV/> .
CLV:hasCity rdfs:domain CLV:Address ;
    rdfs:isDefinedBy <https://w3id.org/italia/onto/CLV> .
"#;

const HAS_CITY_URL: &str = "https://ontopia-lodview.agid.gov.it/onto/CLV/hasCity";

fn online(repo: &TestRepository) -> EngineConfig {
    EngineConfig::for_root(repo.root())
}

#[test]
fn local_ontologies_close_the_context_without_fetching() {
    let repo = TestRepository::new();
    repo.write("assets/ontologies/CPV/latest/CPV.ttl", CPV);
    let stub = Arc::new(StubFetcher::default());
    let resolver = SemanticReferenceResolver::new(&online(&repo), stub.clone());

    let resolved = resolver
        .resolve_closed(&json!({"given_name": "https://w3id.org/italia/onto/CPV/givenName"}))
        .unwrap();

    assert!(resolved.closure.is_closed());
    assert!(resolved.domains.contains("https://w3id.org/italia/onto/CPV/Person"));
    let term = &resolved.terms["https://w3id.org/italia/onto/CPV/givenName"];
    assert_eq!(term.version_info.as_deref(), Some("1.0"));
    assert_eq!(stub.calls(), 0);
}

#[test]
fn declared_prefixes_resolve_against_local_ontologies() {
    let repo = TestRepository::new();
    repo.write("assets/ontologies/CPV/latest/CPV.ttl", CPV);
    repo.write("assets/ontologies/CLV/latest/CLV.ttl", CLV_HAS_CITY);
    let fragment = json!({
        "CPV": "https://w3id.org/italia/onto/CPV/",
        "CLV": "https://w3id.org/italia/onto/CLV/",
        "given_name": "CPV:givenName"
    });

    let stub = Arc::new(StubFetcher::default());
    let resolver = SemanticReferenceResolver::new(&online(&repo), stub.clone());
    let resolved = resolver.resolve_closed(&fragment).unwrap();
    assert!(resolved.closure.expected.contains("https://w3id.org/italia/onto/CLV/"));
    assert_eq!(stub.calls(), 0);

    let offline = SemanticReferenceResolver::new(&repo.config(), Arc::new(StubFetcher::default()));
    assert!(offline.resolve_closed(&fragment).is_ok());
}

#[test]
fn prefix_without_local_terms_is_missing() {
    let repo = TestRepository::new();
    repo.write("assets/ontologies/CPV/latest/CPV.ttl", CPV);
    let resolver = SemanticReferenceResolver::new(&repo.config(), Arc::new(StubFetcher::default()));

    assert_matches!(
        resolver.resolve_closed(&json!({
            "CPV": "https://w3id.org/italia/onto/CPV/",
            "CLV": "https://w3id.org/italia/onto/CLV/",
            "given_name": "CPV:givenName"
        })),
        Err(ConformanceError::MissingDependency { ref missing, .. })
            if missing == &vec!["https://w3id.org/italia/onto/CLV/".to_string()]
    );
}

#[test]
fn remote_lookup_fills_terms_missing_locally() {
    let repo = TestRepository::new();
    let stub = Arc::new(StubFetcher::default().with(HAS_CITY_URL, CLV_HAS_CITY));
    let resolver = SemanticReferenceResolver::new(&online(&repo), stub.clone());

    let resolved = resolver
        .resolve_closed(&json!({"city": "https://w3id.org/italia/onto/CLV/hasCity"}))
        .unwrap();

    assert!(resolved.domains.contains("https://w3id.org/italia/onto/CLV/Address"));
    assert!(resolved.ontologies.contains("https://w3id.org/italia/onto/CLV"));
    assert_eq!(stub.calls(), 1);
}

#[test]
fn unresolved_terms_are_reported_as_missing() {
    let repo = TestRepository::new();
    repo.write("assets/ontologies/CPV/latest/CPV.ttl", CPV);
    let resolver = SemanticReferenceResolver::new(&online(&repo), Arc::new(StubFetcher::default()));

    let error = resolver
        .resolve_closed(&json!({
            "given_name": "https://w3id.org/italia/onto/CPV/givenName",
            "nick": "https://w3id.org/italia/onto/CPV/nickName"
        }))
        .unwrap_err();

    assert_matches!(
        error,
        ConformanceError::MissingDependency { ref namespace, ref missing }
            if namespace == "https://w3id.org/italia/"
                && missing == &vec!["https://w3id.org/italia/onto/CPV/nickName".to_string()]
    );
}

#[test]
fn each_term_is_fetched_at_most_once() {
    let repo = TestRepository::new();
    let stub = Arc::new(StubFetcher::default());
    let resolver = SemanticReferenceResolver::new(&online(&repo), stub.clone());
    let fragment = json!({"nick": "https://w3id.org/italia/onto/CPV/nickName"});

    assert!(resolver.resolve_closed(&fragment).is_err());
    assert!(resolver.resolve_closed(&fragment).is_err());

    assert_eq!(stub.calls(), 1);
    assert_eq!(resolver.remote_fetches(), 1);
}

#[test]
fn alignment_files_do_not_define_terms() {
    let repo = TestRepository::new();
    repo.write("assets/ontologies/CPV/latest/CPV-aligns.ttl", CPV);
    let resolver = SemanticReferenceResolver::new(&repo.config(), Arc::new(StubFetcher::default()));

    assert_matches!(
        resolver.resolve_closed(&json!({"given_name": "https://w3id.org/italia/onto/CPV/givenName"})),
        Err(ConformanceError::MissingDependency { .. })
    );
}

#[test]
fn offline_resolution_never_fetches() {
    let repo = TestRepository::new();
    let stub = Arc::new(StubFetcher::default().with(HAS_CITY_URL, CLV_HAS_CITY));
    let resolver = SemanticReferenceResolver::new(&repo.config(), stub.clone());

    assert!(
        resolver
            .resolve_closed(&json!({"city": "https://w3id.org/italia/onto/CLV/hasCity"}))
            .is_err()
    );
    assert_eq!(stub.calls(), 0);
}

#[test]
fn references_combine_every_context_of_a_schema() {
    let repo = TestRepository::new();
    repo.write("assets/ontologies/CPV/latest/CPV.ttl", CPV);
    let stub = Arc::new(StubFetcher::default().with(HAS_CITY_URL, CLV_HAS_CITY));
    let resolver = SemanticReferenceResolver::new(&online(&repo), stub);

    let references = resolver
        .extract_references(&json!({
            "info": {"title": "Registry", "version": "1.0.0"},
            "components": {"schemas": {
                "Person": {"x-jsonld-context": {"given_name": "https://w3id.org/italia/onto/CPV/givenName"}},
                "Address": {"x-jsonld-context": {"city": "https://w3id.org/italia/onto/CLV/hasCity"}}
            }}
        }))
        .unwrap();

    assert_eq!(references.title, "Registry");
    assert_eq!(references.version, "1.0.0");
    assert_eq!(references.domains.len(), 2);
    assert_eq!(references.ontologies.len(), 2);
}
