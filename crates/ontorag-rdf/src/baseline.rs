//! OWL/RDFS baseline import (boundary adapter).
//!
//! Parses a baseline ontology in Turtle syntax and emits the classes and
//! properties it declares as a `DocumentProposalV1` with every entry's
//! `origin` set to the catalog key. Routing baselines through the same
//! merge path as LLM proposals means one algebra governs both: evidence
//! union, case-insensitive keys, origin immutability.
//!
//! The input is untrusted; anything that does not fit the extraction rules
//! is skipped with a warning rather than failing the import.

use anyhow::{anyhow, Result};
use ontorag_schema::ttl::is_identifier_name;
use ontorag_schema::{
    DocumentProposalV1, ProposedAdditionsV1, ProposedClassV1, ProposedDatatypePropertyV1,
    ProposedObjectPropertyV1,
};
use sophia::api::prelude::*;
use std::collections::BTreeMap;

const RDF_TYPE_IRI: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
const OWL_CLASS_IRI: &str = "http://www.w3.org/2002/07/owl#Class";
const RDFS_CLASS_IRI: &str = "http://www.w3.org/2000/01/rdf-schema#Class";
const OWL_OBJECT_PROPERTY_IRI: &str = "http://www.w3.org/2002/07/owl#ObjectProperty";
const OWL_DATATYPE_PROPERTY_IRI: &str = "http://www.w3.org/2002/07/owl#DatatypeProperty";
const RDFS_LABEL_IRI: &str = "http://www.w3.org/2000/01/rdf-schema#label";
const RDFS_COMMENT_IRI: &str = "http://www.w3.org/2000/01/rdf-schema#comment";
const RDFS_DOMAIN_IRI: &str = "http://www.w3.org/2000/01/rdf-schema#domain";
const RDFS_RANGE_IRI: &str = "http://www.w3.org/2000/01/rdf-schema#range";

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct TurtleSinkError {
    message: String,
}

impl From<anyhow::Error> for TurtleSinkError {
    fn from(value: anyhow::Error) -> Self {
        Self {
            message: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RdfNode {
    Iri(String),
    BlankNode(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RdfObject {
    Node(RdfNode),
    Literal(String),
}

#[derive(Debug, Clone)]
struct RdfStatement {
    subject: RdfNode,
    predicate_iri: String,
    object: RdfObject,
}

fn unescape_rdf_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Parse one term in its N-Triples-ish display form.
fn parse_term_display(term: &str) -> Result<RdfObject> {
    let s = term.trim();

    if let Some(rest) = s.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
        return Ok(RdfObject::Node(RdfNode::Iri(rest.to_string())));
    }
    if let Some(rest) = s.strip_prefix("_:") {
        return Ok(RdfObject::Node(RdfNode::BlankNode(rest.to_string())));
    }
    if s.starts_with('"') {
        let mut end_quote = None;
        let mut prev_was_escape = false;
        for (i, ch) in s.char_indices().skip(1) {
            if ch == '"' && !prev_was_escape {
                end_quote = Some(i);
                break;
            }
            prev_was_escape = ch == '\\' && !prev_was_escape;
        }
        let Some(end) = end_quote else {
            return Err(anyhow!("invalid literal term (missing closing quote): {s}"));
        };
        return Ok(RdfObject::Literal(unescape_rdf_string(&s[1..end])));
    }

    Err(anyhow!("unsupported RDF term form: {s}"))
}

fn parse_node_term_display(term: &str) -> Result<RdfNode> {
    match parse_term_display(term)? {
        RdfObject::Node(node) => Ok(node),
        RdfObject::Literal(_) => Err(anyhow!("expected IRI/blank node, got literal: {term}")),
    }
}

fn parse_turtle_statements(ttl: &str) -> Result<Vec<RdfStatement>> {
    let cursor = std::io::Cursor::new(ttl.as_bytes());
    let reader = std::io::BufReader::new(cursor);

    let mut out: Vec<RdfStatement> = Vec::new();
    let mut parser = sophia::turtle::parser::turtle::parse_bufread(reader);
    parser
        .try_for_each_triple(|t| -> std::result::Result<(), TurtleSinkError> {
            let subject =
                parse_node_term_display(&t.s().to_string()).map_err(TurtleSinkError::from)?;
            let predicate =
                parse_node_term_display(&t.p().to_string()).map_err(TurtleSinkError::from)?;
            let RdfNode::Iri(predicate_iri) = predicate else {
                return Ok(());
            };
            let object = parse_term_display(&t.o().to_string()).map_err(TurtleSinkError::from)?;
            out.push(RdfStatement {
                subject,
                predicate_iri,
                object,
            });
            Ok(())
        })
        .map_err(|e| anyhow!("failed to parse Turtle: {e}"))?;
    Ok(out)
}

/// IRI fragment after `#`, or the last `/` segment.
fn local_name(iri: &str) -> String {
    iri.rsplit(['#', '/']).next().unwrap_or(iri).to_string()
}

/// IRI prefix up to and including the last `#` or `/`.
fn iri_prefix(iri: &str) -> String {
    match iri.rfind(['#', '/']) {
        Some(pos) => iri[..=pos].to_string(),
        None => iri.to_string(),
    }
}

#[derive(Debug, Default)]
struct SubjectInfo {
    types: Vec<String>,
    label: Option<String>,
    comment: Option<String>,
    domain: Option<String>,
    range: Option<String>,
}

/// Result of parsing one baseline TTL.
#[derive(Debug, Clone)]
pub struct BaselineImport {
    /// Extracted classes/properties, each tagged with the catalog origin.
    pub proposal: DocumentProposalV1,
    /// Most common IRI prefix among declared terms, when any were found.
    pub namespace: Option<String>,
}

/// Extract Schema Card entries from OWL/RDFS Turtle.
pub fn import_baseline_ttl(ttl: &str, origin: &str) -> Result<BaselineImport> {
    let statements = parse_turtle_statements(ttl)?;

    let mut subjects: BTreeMap<String, SubjectInfo> = BTreeMap::new();
    for stmt in &statements {
        // Blank-node subjects (axioms, restrictions) are out of scope.
        let RdfNode::Iri(subject_iri) = &stmt.subject else {
            continue;
        };
        let info = subjects.entry(subject_iri.clone()).or_default();

        match (stmt.predicate_iri.as_str(), &stmt.object) {
            (RDF_TYPE_IRI, RdfObject::Node(RdfNode::Iri(ty))) => info.types.push(ty.clone()),
            (RDFS_LABEL_IRI, RdfObject::Literal(text)) => {
                info.label.get_or_insert_with(|| text.clone());
            }
            (RDFS_COMMENT_IRI, RdfObject::Literal(text)) => {
                info.comment.get_or_insert_with(|| text.clone());
            }
            (RDFS_DOMAIN_IRI, RdfObject::Node(RdfNode::Iri(iri))) => {
                info.domain.get_or_insert_with(|| local_name(iri));
            }
            (RDFS_RANGE_IRI, RdfObject::Node(RdfNode::Iri(iri))) => {
                info.range.get_or_insert_with(|| local_name(iri));
            }
            _ => {}
        }
    }

    let origin = origin.trim().to_string();
    let mut additions = ProposedAdditionsV1::default();
    let mut warnings: Vec<String> = Vec::new();
    let mut prefix_counts: BTreeMap<String, usize> = BTreeMap::new();

    for (iri, info) in &subjects {
        let is_class = info
            .types
            .iter()
            .any(|t| t == OWL_CLASS_IRI || t == RDFS_CLASS_IRI);
        let is_object_property = info.types.iter().any(|t| t == OWL_OBJECT_PROPERTY_IRI);
        let is_datatype_property = info.types.iter().any(|t| t == OWL_DATATYPE_PROPERTY_IRI);
        if !is_class && !is_object_property && !is_datatype_property {
            continue;
        }

        let name = local_name(iri);
        if !is_identifier_name(&name) {
            warnings.push(format!(
                "skipped <{iri}>: local name \"{name}\" is not an identifier"
            ));
            continue;
        }
        *prefix_counts.entry(iri_prefix(iri)).or_insert(0) += 1;

        // Comment preferred over label so descriptions survive a
        // round-trip through the emitter (which writes the name as label).
        let description = info
            .comment
            .clone()
            .or_else(|| info.label.clone())
            .unwrap_or_default();

        if is_class {
            additions.classes.push(ProposedClassV1 {
                name: name.clone(),
                description: description.clone(),
                origin: origin.clone(),
                evidence: Vec::new(),
            });
        }
        if is_object_property {
            additions.object_properties.push(ProposedObjectPropertyV1 {
                name: name.clone(),
                domain: info.domain.clone().unwrap_or_default(),
                range: info.range.clone().unwrap_or_default(),
                description: description.clone(),
                origin: origin.clone(),
                evidence: Vec::new(),
            });
        }
        if is_datatype_property {
            let range = match &info.range {
                Some(range) => range.clone(),
                None => {
                    warnings.push(format!(
                        "datatype property {name} has no rdfs:range, defaulting to string"
                    ));
                    "string".to_string()
                }
            };
            additions
                .datatype_properties
                .push(ProposedDatatypePropertyV1 {
                    name: name.clone(),
                    domain: info.domain.clone().unwrap_or_default(),
                    range,
                    description,
                    origin: origin.clone(),
                    evidence: Vec::new(),
                });
        }
    }

    let namespace = prefix_counts
        .into_iter()
        .max_by(|(a_prefix, a_count), (b_prefix, b_count)| {
            // Highest count wins; ties go to the lexicographically smallest
            // prefix so detection is deterministic.
            Ord::cmp(a_count, b_count).then(b_prefix.cmp(a_prefix))
        })
        .map(|(prefix, _)| prefix);

    Ok(BaselineImport {
        proposal: DocumentProposalV1 {
            proposed_additions: additions,
            warnings,
            ..Default::default()
        },
        namespace,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOAF_SNIPPET: &str = r#"
@prefix foaf: <http://xmlns.com/foaf/0.1/> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .

foaf:Person a owl:Class ;
    rdfs:label "Person" ;
    rdfs:comment "A person." .

foaf:Organization a owl:Class ;
    rdfs:label "Organization" .

foaf:knows a owl:ObjectProperty ;
    rdfs:domain foaf:Person ;
    rdfs:range foaf:Person .

foaf:name a owl:DatatypeProperty ;
    rdfs:domain foaf:Person ;
    rdfs:range xsd:string .
"#;

    #[test]
    fn extracts_classes_and_properties_with_origin() {
        let import = import_baseline_ttl(FOAF_SNIPPET, "foaf").expect("import");
        let add = &import.proposal.proposed_additions;

        let class_names: Vec<&str> = add.classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(class_names, vec!["Organization", "Person"]);
        assert!(add.classes.iter().all(|c| c.origin == "foaf"));

        let person = add.classes.iter().find(|c| c.name == "Person").unwrap();
        assert_eq!(person.description, "A person.");

        let knows = &add.object_properties[0];
        assert_eq!(knows.name, "knows");
        assert_eq!(knows.domain, "Person");
        assert_eq!(knows.range, "Person");

        let name = &add.datatype_properties[0];
        assert_eq!(name.name, "name");
        assert_eq!(name.range, "string");
    }

    #[test]
    fn detects_most_common_namespace() {
        let import = import_baseline_ttl(FOAF_SNIPPET, "foaf").expect("import");
        assert_eq!(import.namespace.as_deref(), Some("http://xmlns.com/foaf/0.1/"));
    }

    #[test]
    fn non_identifier_local_names_are_skipped_with_warning() {
        let ttl = r#"
@prefix ex: <http://example.org/> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
<http://example.org/Strange%20Name> a owl:Class .
ex:Fine a owl:Class .
"#;
        let import = import_baseline_ttl(ttl, "ex").expect("import");
        let add = &import.proposal.proposed_additions;
        assert_eq!(add.classes.len(), 1);
        assert_eq!(add.classes[0].name, "Fine");
        assert!(import
            .proposal
            .warnings
            .iter()
            .any(|w| w.contains("not an identifier")));
    }

    #[test]
    fn blank_node_subjects_are_ignored() {
        let ttl = r#"
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix ex: <http://example.org/> .
_:axiom a owl:Class .
ex:Real a owl:Class .
"#;
        let import = import_baseline_ttl(ttl, "ex").expect("import");
        assert_eq!(import.proposal.proposed_additions.classes.len(), 1);
        assert_eq!(import.proposal.proposed_additions.classes[0].name, "Real");
    }

    #[test]
    fn invalid_turtle_is_a_hard_error() {
        assert!(import_baseline_ttl("this is not turtle @@", "x").is_err());
    }
}
