//! SHACL (Shapes Constraint Language) validation
//!
//! Shapes are read from a `rules.shacl` Turtle graph once, when the rule set
//! is loaded; validating a data graph then only walks the data.
//!
//! # Components
//!
//! - **ShapeValidator**: parsed node shapes plus the validation entry point
//! - **ConstraintChecker**: checks property constraints against one focus node
//! - **ShapeReport**: structured validation results
//!
//! Supported targets: `sh:targetNode`, `sh:targetClass`,
//! `sh:targetSubjectsOf`, `sh:targetObjectsOf`. Property shapes support
//! simple predicate paths with cardinality, datatype, class, node kind,
//! pattern, length, `sh:in` and `sh:hasValue` constraints.

use anyhow::{Context, Result, anyhow};
use oxigraph::io::RdfFormat;
use oxigraph::model::{
    GraphNameRef, NamedNode, NamedNodeRef, NamedOrBlankNode, NamedOrBlankNodeRef, QuadRef, Term,
    TermRef,
};
use oxigraph::store::Store;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::Path;

// =============================================================================
// Namespace Constants
// =============================================================================

const SH_NS: &str = "http://www.w3.org/ns/shacl#";
const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
const RDF_FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";
const RDF_REST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#rest";
const RDF_NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";

fn sh(local: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("{SH_NS}{local}"))
}

// =============================================================================
// Severity Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Violation,
}

impl Severity {
    pub fn from_iri(iri: NamedNodeRef<'_>) -> Self {
        match iri.as_str() {
            "http://www.w3.org/ns/shacl#Info" => Severity::Info,
            "http://www.w3.org/ns/shacl#Warning" => Severity::Warning,
            _ => Severity::Violation,
        }
    }

    pub fn to_iri(&self) -> NamedNode {
        match self {
            Severity::Info => sh("Info"),
            Severity::Warning => sh("Warning"),
            Severity::Violation => sh("Violation"),
        }
    }
}

// =============================================================================
// Validation Results
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeViolation {
    /// The node that caused the violation
    focus_node: String,
    /// The property path (if applicable)
    result_path: Option<String>,
    /// The value that violated the constraint
    value: Option<String>,
    message: String,
    severity: Severity,
    source_shape: String,
    /// The specific constraint component, e.g. `sh:minCount`
    source_constraint: Option<String>,
}

impl ShapeViolation {
    pub fn new(focus_node: String, message: String, severity: Severity, source_shape: String) -> Self {
        Self {
            focus_node,
            result_path: None,
            value: None,
            message,
            severity,
            source_shape,
            source_constraint: None,
        }
    }

    pub fn with_path(mut self, path: String) -> Self {
        self.result_path = Some(path);
        self
    }

    pub fn with_value(mut self, value: String) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_constraint(mut self, constraint: &str) -> Self {
        self.source_constraint = Some(constraint.to_string());
        self
    }

    pub fn focus_node(&self) -> &str {
        &self.focus_node
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn source_constraint(&self) -> Option<&str> {
        self.source_constraint.as_deref()
    }
}

impl fmt::Display for ShapeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} on {}", self.severity, self.focus_node)?;
        if let Some(path) = &self.result_path {
            write!(f, " path {path}")?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(value) = &self.value {
            write!(f, " (value {value})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeReport {
    results: Vec<ShapeViolation>,
    conforms: bool,
}

impl ShapeReport {
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
            conforms: true,
        }
    }

    pub fn add_result(&mut self, result: ShapeViolation) {
        if result.severity == Severity::Violation {
            self.conforms = false;
        }
        self.results.push(result);
    }

    pub fn conforms(&self) -> bool {
        self.conforms
    }

    pub fn results(&self) -> &[ShapeViolation] {
        &self.results
    }

    pub fn violations(&self) -> impl Iterator<Item = &ShapeViolation> {
        self.results
            .iter()
            .filter(|r| r.severity == Severity::Violation)
    }

    pub fn violation_count(&self) -> usize {
        self.violations().count()
    }

    /// One line per violation, sorted for stable report text.
    pub fn summary(&self) -> String {
        let lines: BTreeSet<String> = self.violations().map(|v| v.to_string()).collect();
        lines.into_iter().collect::<Vec<_>>().join("\n")
    }
}

impl Default for ShapeReport {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Shapes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Iri,
    Literal,
    BlankNode,
    BlankNodeOrIri,
    IriOrLiteral,
    BlankNodeOrLiteral,
}

impl NodeKind {
    fn from_iri(iri: &str) -> Option<Self> {
        let local = iri.strip_prefix(SH_NS)?;
        Some(match local {
            "IRI" => NodeKind::Iri,
            "Literal" => NodeKind::Literal,
            "BlankNode" => NodeKind::BlankNode,
            "BlankNodeOrIRI" => NodeKind::BlankNodeOrIri,
            "IRIOrLiteral" => NodeKind::IriOrLiteral,
            "BlankNodeOrLiteral" => NodeKind::BlankNodeOrLiteral,
            _ => return None,
        })
    }

    fn accepts(&self, term: &Term) -> bool {
        let (iri, blank, literal) = match term {
            Term::NamedNode(_) => (true, false, false),
            Term::BlankNode(_) => (false, true, false),
            Term::Literal(_) => (false, false, true),
            #[allow(unreachable_patterns)]
            _ => (false, false, false),
        };
        match self {
            NodeKind::Iri => iri,
            NodeKind::Literal => literal,
            NodeKind::BlankNode => blank,
            NodeKind::BlankNodeOrIri => blank || iri,
            NodeKind::IriOrLiteral => iri || literal,
            NodeKind::BlankNodeOrLiteral => blank || literal,
        }
    }
}

#[derive(Debug, Clone)]
struct PropertyShape {
    path: NamedNode,
    datatype: Option<NamedNode>,
    class: Option<NamedNode>,
    node_kind: Option<NodeKind>,
    min_count: Option<usize>,
    max_count: Option<usize>,
    pattern: Option<Regex>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    in_values: Vec<Term>,
    has_value: Option<Term>,
    message: Option<String>,
}

impl PropertyShape {
    fn new(path: NamedNode) -> Self {
        Self {
            path,
            datatype: None,
            class: None,
            node_kind: None,
            min_count: None,
            max_count: None,
            pattern: None,
            min_length: None,
            max_length: None,
            in_values: Vec::new(),
            has_value: None,
            message: None,
        }
    }

    fn message_or(&self, default: String) -> String {
        self.message.clone().unwrap_or(default)
    }
}

#[derive(Debug, Clone)]
struct NodeShape {
    id: NamedOrBlankNode,
    target_classes: Vec<NamedNode>,
    target_nodes: Vec<Term>,
    target_subjects_of: Vec<NamedNode>,
    target_objects_of: Vec<NamedNode>,
    properties: Vec<PropertyShape>,
    severity: Severity,
}

// =============================================================================
// Shape Loading
// =============================================================================

struct ShapeLoader<'a> {
    shapes_store: &'a Store,
}

impl<'a> ShapeLoader<'a> {
    fn load_all_node_shapes(&self) -> Result<Vec<NodeShape>> {
        let rdf_type = NamedNode::new_unchecked(RDF_TYPE);
        let node_shape = sh("NodeShape");
        let mut ids = HashSet::new();

        for quad in self.shapes_store.quads_for_pattern(
            None,
            Some(rdf_type.as_ref()),
            Some(node_shape.as_ref().into()),
            None,
        ) {
            ids.insert(quad?.subject);
        }

        let mut shapes = Vec::new();
        for id in ids {
            if self.is_deactivated(id.as_ref())? {
                tracing::debug!(shape = %id, "skipping deactivated shape");
                continue;
            }
            shapes.push(self.load_node_shape(id)?);
        }
        Ok(shapes)
    }

    fn is_deactivated(&self, subject: NamedOrBlankNodeRef<'_>) -> Result<bool> {
        Ok(matches!(
            self.get_literal_value(subject, "deactivated")?.as_deref(),
            Some("true") | Some("1")
        ))
    }

    fn load_node_shape(&self, id: NamedOrBlankNode) -> Result<NodeShape> {
        let subject = id.as_ref();
        let severity = self
            .get_named_node_value(subject, "severity")?
            .map(|iri| Severity::from_iri(iri.as_ref()))
            .unwrap_or(Severity::Violation);

        let target_nodes = self.get_objects(subject, &sh("targetNode"))?;
        let target_classes = self.get_named_node_values(subject, "targetClass")?;
        let target_subjects_of = self.get_named_node_values(subject, "targetSubjectsOf")?;
        let target_objects_of = self.get_named_node_values(subject, "targetObjectsOf")?;

        let mut properties = Vec::new();
        for object in self.get_objects(subject, &sh("property"))? {
            if let Some(property_id) = as_resource(object)
                && let Some(property) = self.load_property_shape(property_id.as_ref())?
            {
                properties.push(property);
            }
        }

        Ok(NodeShape {
            id,
            target_classes,
            target_nodes,
            target_subjects_of,
            target_objects_of,
            properties,
            severity,
        })
    }

    fn load_property_shape(
        &self,
        property_id: NamedOrBlankNodeRef<'_>,
    ) -> Result<Option<PropertyShape>> {
        let path = match self.get_object(property_id, &sh("path"))? {
            Some(Term::NamedNode(path)) => path,
            Some(other) => {
                tracing::debug!(path = %other, "complex property paths are not evaluated");
                return Ok(None);
            }
            None => {
                return Err(anyhow!("property shape {property_id} has no sh:path"));
            }
        };

        let mut property = PropertyShape::new(path);
        property.datatype = self.get_named_node_value(property_id, "datatype")?;
        property.class = self.get_named_node_value(property_id, "class")?;
        property.node_kind = match self.get_named_node_value(property_id, "nodeKind")? {
            Some(kind) => Some(
                NodeKind::from_iri(kind.as_str())
                    .ok_or_else(|| anyhow!("unknown sh:nodeKind {kind}"))?,
            ),
            None => None,
        };
        property.min_count = self.get_count_value(property_id, "minCount")?;
        property.max_count = self.get_count_value(property_id, "maxCount")?;
        property.min_length = self.get_count_value(property_id, "minLength")?;
        property.max_length = self.get_count_value(property_id, "maxLength")?;
        property.message = self.get_literal_value(property_id, "message")?;
        property.has_value = self.get_object(property_id, &sh("hasValue"))?;

        if let Some(pattern) = self.get_literal_value(property_id, "pattern")? {
            let flags = self.get_literal_value(property_id, "flags")?.unwrap_or_default();
            let regex = RegexBuilder::new(&pattern)
                .case_insensitive(flags.contains('i'))
                .multi_line(flags.contains('m'))
                .dot_matches_new_line(flags.contains('s'))
                .build()
                .with_context(|| format!("invalid sh:pattern {pattern:?}"))?;
            property.pattern = Some(regex);
        }

        if let Some(list_head) = self.get_object(property_id, &sh("in"))? {
            property.in_values = self.parse_rdf_list(list_head)?;
        }

        Ok(Some(property))
    }

    fn get_objects(&self, subject: NamedOrBlankNodeRef<'_>, predicate: &NamedNode) -> Result<Vec<Term>> {
        let mut objects = Vec::new();
        for quad in
            self.shapes_store
                .quads_for_pattern(Some(subject), Some(predicate.as_ref()), None, None)
        {
            objects.push(quad?.object);
        }
        Ok(objects)
    }

    fn get_object(&self, subject: NamedOrBlankNodeRef<'_>, predicate: &NamedNode) -> Result<Option<Term>> {
        Ok(self.get_objects(subject, predicate)?.into_iter().next())
    }

    fn get_literal_value(&self, subject: NamedOrBlankNodeRef<'_>, local: &str) -> Result<Option<String>> {
        match self.get_object(subject, &sh(local))? {
            Some(Term::Literal(literal)) => Ok(Some(literal.value().to_string())),
            Some(other) => Err(anyhow!("sh:{local} of {subject} must be a literal, got {other}")),
            None => Ok(None),
        }
    }

    fn get_count_value(&self, subject: NamedOrBlankNodeRef<'_>, local: &str) -> Result<Option<usize>> {
        match self.get_literal_value(subject, local)? {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .map(Some)
                .with_context(|| format!("sh:{local} of {subject} is not a non-negative integer")),
            None => Ok(None),
        }
    }

    fn get_named_node_value(&self, subject: NamedOrBlankNodeRef<'_>, local: &str) -> Result<Option<NamedNode>> {
        match self.get_object(subject, &sh(local))? {
            Some(Term::NamedNode(node)) => Ok(Some(node)),
            Some(other) => Err(anyhow!("sh:{local} of {subject} must be an IRI, got {other}")),
            None => Ok(None),
        }
    }

    fn get_named_node_values(&self, subject: NamedOrBlankNodeRef<'_>, local: &str) -> Result<Vec<NamedNode>> {
        Ok(self
            .get_objects(subject, &sh(local))?
            .into_iter()
            .filter_map(|term| match term {
                Term::NamedNode(node) => Some(node),
                _ => None,
            })
            .collect())
    }

    fn parse_rdf_list(&self, head: Term) -> Result<Vec<Term>> {
        let first = NamedNode::new_unchecked(RDF_FIRST);
        let rest = NamedNode::new_unchecked(RDF_REST);
        let mut values = Vec::new();
        let mut current = head;

        // Bounded so that a cyclic list cannot loop forever.
        for _ in 0..10_000 {
            let node = match &current {
                Term::NamedNode(node) if node.as_str() == RDF_NIL => return Ok(values),
                other => match as_resource(other.clone()) {
                    Some(node) => node,
                    None => return Err(anyhow!("malformed RDF list at {other}")),
                },
            };
            if let Some(value) = self.get_object(node.as_ref(), &first)? {
                values.push(value);
            }
            match self.get_object(node.as_ref(), &rest)? {
                Some(next) => current = next,
                None => return Ok(values),
            }
        }
        Err(anyhow!("RDF list is too long or cyclic"))
    }
}

fn as_resource(term: Term) -> Option<NamedOrBlankNode> {
    match term {
        Term::NamedNode(node) => Some(NamedOrBlankNode::NamedNode(node)),
        Term::BlankNode(node) => Some(NamedOrBlankNode::BlankNode(node)),
        _ => None,
    }
}

// =============================================================================
// Constraint Checker
// =============================================================================

pub struct ConstraintChecker<'a> {
    data_store: &'a Store,
}

impl<'a> ConstraintChecker<'a> {
    pub fn new(data_store: &'a Store) -> Self {
        Self { data_store }
    }

    fn check_property(
        &self,
        focus_node: NamedOrBlankNodeRef<'_>,
        property: &PropertyShape,
        shape_id: &str,
    ) -> Result<Vec<ShapeViolation>> {
        let mut results = Vec::new();
        let values = self.get_property_values(focus_node, &property.path)?;
        let violation = |message: String, constraint: &str| {
            ShapeViolation::new(
                focus_node.to_string(),
                message,
                Severity::Violation,
                shape_id.to_string(),
            )
            .with_path(property.path.to_string())
            .with_constraint(constraint)
        };

        if let Some(min_count) = property.min_count
            && values.len() < min_count
        {
            results.push(violation(
                property.message_or(format!(
                    "Property {} must have at least {} value(s)",
                    property.path, min_count
                )),
                "sh:minCount",
            ));
        }

        if let Some(max_count) = property.max_count
            && values.len() > max_count
        {
            results.push(violation(
                property.message_or(format!(
                    "Property {} must have at most {} value(s)",
                    property.path, max_count
                )),
                "sh:maxCount",
            ));
        }

        if let Some(expected) = &property.has_value
            && !values.contains(expected)
        {
            results.push(violation(
                property.message_or(format!("Property {} must have value {}", property.path, expected)),
                "sh:hasValue",
            ));
        }

        for value in &values {
            for (message, constraint) in self.check_value_constraints(value, property)? {
                results.push(violation(message, constraint).with_value(value.to_string()));
            }
        }

        Ok(results)
    }

    fn check_value_constraints(
        &self,
        value: &Term,
        property: &PropertyShape,
    ) -> Result<Vec<(String, &'static str)>> {
        let mut failures = Vec::new();

        if let Some(expected) = &property.datatype {
            let matches = matches!(value, Term::Literal(lit) if lit.datatype() == expected.as_ref());
            if !matches {
                failures.push((
                    property.message_or(format!("Value must have datatype {expected}")),
                    "sh:datatype",
                ));
            }
        }

        if let Some(expected) = &property.class {
            let is_instance = match as_resource(value.clone()) {
                Some(node) => self.has_type(node.as_ref(), expected)?,
                None => false,
            };
            if !is_instance {
                failures.push((
                    property.message_or(format!("Value must be an instance of {expected}")),
                    "sh:class",
                ));
            }
        }

        if let Some(kind) = property.node_kind
            && !kind.accepts(value)
        {
            failures.push((
                property.message_or(format!("Value must have node kind {kind:?}")),
                "sh:nodeKind",
            ));
        }

        if !property.in_values.is_empty() && !property.in_values.contains(value) {
            failures.push((
                property.message_or("Value is not one of the allowed values".to_string()),
                "sh:in",
            ));
        }

        let lexical = match value {
            Term::Literal(lit) => Some(lit.value().to_string()),
            Term::NamedNode(node) => Some(node.as_str().to_string()),
            _ => None,
        };

        if let Some(lexical) = lexical {
            if let Some(pattern) = &property.pattern
                && !pattern.is_match(&lexical)
            {
                failures.push((
                    property.message_or(format!("Value must match pattern: {}", pattern.as_str())),
                    "sh:pattern",
                ));
            }

            let length = lexical.chars().count();
            if let Some(min_length) = property.min_length
                && length < min_length
            {
                failures.push((
                    property.message_or(format!("Value must have at least {min_length} characters")),
                    "sh:minLength",
                ));
            }
            if let Some(max_length) = property.max_length
                && length > max_length
            {
                failures.push((
                    property.message_or(format!("Value must have at most {max_length} characters")),
                    "sh:maxLength",
                ));
            }
        }

        Ok(failures)
    }

    fn get_property_values(&self, subject: NamedOrBlankNodeRef<'_>, property: &NamedNode) -> Result<Vec<Term>> {
        let mut values = Vec::new();
        for quad in self
            .data_store
            .quads_for_pattern(Some(subject), Some(property.as_ref()), None, None)
        {
            values.push(quad?.object);
        }
        Ok(values)
    }

    fn has_type(&self, node: NamedOrBlankNodeRef<'_>, class: &NamedNode) -> Result<bool> {
        let rdf_type = NamedNode::new_unchecked(RDF_TYPE);
        let quad = QuadRef::new(node, rdf_type.as_ref(), class.as_ref(), GraphNameRef::DefaultGraph);
        Ok(self.data_store.contains(quad)?)
    }
}

// =============================================================================
// Shape Validator
// =============================================================================

pub struct ShapeValidator {
    shapes: Vec<NodeShape>,
}

impl fmt::Debug for ShapeValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeValidator")
            .field("shapes", &self.shapes.len())
            .finish()
    }
}

impl ShapeValidator {
    /// Create a new validator from a shapes file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read shapes file")?;
        Self::from_turtle(&content)
    }

    /// Create a validator from a Turtle string
    pub fn from_turtle(turtle: &str) -> Result<Self> {
        let shapes_store = parse_turtle(turtle).context("Failed to parse shapes")?;
        let shapes = ShapeLoader {
            shapes_store: &shapes_store,
        }
        .load_all_node_shapes()?;
        Ok(Self { shapes })
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Validate a data graph against all applicable shapes
    pub fn validate_graph(&self, data_store: &Store) -> Result<ShapeReport> {
        let mut report = ShapeReport::new();
        let checker = ConstraintChecker::new(data_store);

        for shape in &self.shapes {
            let shape_id = shape.id.to_string();
            for focus_node in self.focus_nodes(shape, data_store)? {
                for property in &shape.properties {
                    for mut result in checker.check_property(focus_node.as_ref(), property, &shape_id)? {
                        if shape.severity != Severity::Violation {
                            result.severity = shape.severity;
                        }
                        report.add_result(result);
                    }
                }
            }
        }

        Ok(report)
    }

    fn focus_nodes(&self, shape: &NodeShape, data_store: &Store) -> Result<HashSet<NamedOrBlankNode>> {
        let mut nodes: HashSet<NamedOrBlankNode> = shape
            .target_nodes
            .iter()
            .cloned()
            .filter_map(as_resource)
            .collect();

        let rdf_type = NamedNode::new_unchecked(RDF_TYPE);
        for class in &shape.target_classes {
            for quad in data_store.quads_for_pattern(
                None,
                Some(rdf_type.as_ref()),
                Some(TermRef::from(class.as_ref())),
                None,
            ) {
                nodes.insert(quad?.subject);
            }
        }

        for predicate in &shape.target_subjects_of {
            for quad in data_store.quads_for_pattern(None, Some(predicate.as_ref()), None, None) {
                nodes.insert(quad?.subject);
            }
        }

        for predicate in &shape.target_objects_of {
            for quad in data_store.quads_for_pattern(None, Some(predicate.as_ref()), None, None) {
                if let Some(node) = as_resource(quad?.object) {
                    nodes.insert(node);
                }
            }
        }

        Ok(nodes)
    }
}

/// Parse Turtle into a fresh in-memory store.
pub fn parse_turtle(turtle: &str) -> Result<Store> {
    let store = Store::new()?;
    store.load_from_reader(RdfFormat::Turtle, turtle.as_bytes())?;
    Ok(store)
}
