//! OWL/RDFS Turtle rendering of a Schema Card.
//!
//! Canonical output: prefixes once at the top, subjects in card order
//! (already sorted by the case-insensitive key), predicates in a fixed
//! declaration order. Identifier-safe names render as prefixed names
//! (`ns:Person`); anything else falls back to a full IRI, which the
//! baseline importer then skips — the two sides stay symmetric.

use crate::card::{DatatypeRange, SchemaCard};
use std::fmt::Write;

pub const OWL_NS: &str = "http://www.w3.org/2002/07/owl#";
pub const RDFS_NS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";

/// True when `name` can appear as the local part of a prefixed name
/// without escaping: `[A-Za-z0-9_][A-Za-z0-9_-]*`.
pub fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphanumeric() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Render a term in the card namespace: prefixed when identifier-safe,
/// full IRI otherwise.
pub fn term_token(namespace: &str, name: &str) -> String {
    let name = name.trim();
    if is_identifier_name(name) {
        format!("ns:{name}")
    } else {
        format!("<{}{}>", namespace, iri_escape(name))
    }
}

/// Percent-encode the characters Turtle forbids inside `<…>`.
pub fn iri_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            ' ' | '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\' => {
                let mut buf = [0u8; 4];
                for b in c.encode_utf8(&mut buf).bytes() {
                    let _ = write!(out, "%{b:02X}");
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Escape a Turtle string literal body.
pub fn escape_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

/// One `subject p o ; p o .` block.
pub fn write_subject_block(out: &mut String, subject: &str, predicate_lines: &[String]) {
    if predicate_lines.is_empty() {
        return;
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{} {} .", subject, predicate_lines.join(" ;\n    "));
}

fn xsd_token(range: DatatypeRange) -> String {
    format!("xsd:{}", range.as_str())
}

/// Emit the card's classes and properties as OWL/RDFS Turtle.
///
/// Importing the output through the baseline importer reproduces the same
/// class/property names and ranges.
pub fn schema_card_to_ttl(card: &SchemaCard) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "@prefix ns: <{}> .", card.namespace);
    let _ = writeln!(out, "@prefix owl: <{OWL_NS}> .");
    let _ = writeln!(out, "@prefix rdfs: <{RDFS_NS}> .");
    let _ = writeln!(out, "@prefix xsd: <{XSD_NS}> .");

    for class in &card.classes {
        if class.name.trim().is_empty() {
            continue;
        }
        let mut lines = vec![
            "a owl:Class".to_string(),
            format!("rdfs:label \"{}\"", escape_literal(class.name.trim())),
        ];
        if !class.description.trim().is_empty() {
            lines.push(format!(
                "rdfs:comment \"{}\"",
                escape_literal(class.description.trim())
            ));
        }
        write_subject_block(&mut out, &term_token(&card.namespace, &class.name), &lines);
    }

    for prop in &card.datatype_properties {
        if prop.name.trim().is_empty() {
            continue;
        }
        let mut lines = vec![
            "a owl:DatatypeProperty".to_string(),
            format!("rdfs:label \"{}\"", escape_literal(prop.name.trim())),
        ];
        if !prop.description.trim().is_empty() {
            lines.push(format!(
                "rdfs:comment \"{}\"",
                escape_literal(prop.description.trim())
            ));
        }
        if !prop.domain.trim().is_empty() {
            lines.push(format!(
                "rdfs:domain {}",
                term_token(&card.namespace, &prop.domain)
            ));
        }
        lines.push(format!("rdfs:range {}", xsd_token(prop.range)));
        write_subject_block(&mut out, &term_token(&card.namespace, &prop.name), &lines);
    }

    for prop in &card.object_properties {
        if prop.name.trim().is_empty() {
            continue;
        }
        let mut lines = vec![
            "a owl:ObjectProperty".to_string(),
            format!("rdfs:label \"{}\"", escape_literal(prop.name.trim())),
        ];
        if !prop.description.trim().is_empty() {
            lines.push(format!(
                "rdfs:comment \"{}\"",
                escape_literal(prop.description.trim())
            ));
        }
        if !prop.domain.trim().is_empty() {
            lines.push(format!(
                "rdfs:domain {}",
                term_token(&card.namespace, &prop.domain)
            ));
        }
        if !prop.range.trim().is_empty() {
            lines.push(format!(
                "rdfs:range {}",
                term_token(&card.namespace, &prop.range)
            ));
        }
        write_subject_block(&mut out, &term_token(&card.namespace, &prop.name), &lines);
    }

    out
}
