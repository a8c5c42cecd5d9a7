//! Semantic reference resolution
//!
//! OpenAPI schemas embed JSON-LD contexts under `x-jsonld-context`. This
//! module finds them, normalizes each one into a canonical reference graph,
//! and checks that every term under the allowed namespace is described by
//! some ontology, local or remote.

pub mod context;
pub mod coverage;
pub mod locate;
pub mod normalize;
pub mod resolver;
pub mod store;

pub use context::{CONTEXT_KEY, ContextEntry, FieldMapping, FramingComponents, SemanticContext};
pub use coverage::{FragmentCoverage, SemanticBundle};
pub use locate::{ContextLocation, PathSegment, locate_contexts};
pub use normalize::{CanonicalTriple, ReferenceGraph};
pub use resolver::{
    DependencyClosure, DependencyMatch, ResolvedContext, RightsHolder, SemanticReferenceResolver,
    SemanticReferences, TermSummary,
};
pub use store::{
    FetchPolicy, FetchedDocument, HttpFetcher, LocalOntologyStore, OfflineFetcher, OntologyFetcher,
    fetcher_for,
};
