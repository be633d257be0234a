//! Instance materialization: LLM instance proposals → Turtle with PROV
//! mention nodes.
//!
//! Every fact stays traceable: each instance's evidence records become
//! blank mention nodes typed `prov:Entity`, pointing back to the chunk IRI
//! via `prov:wasDerivedFrom` and carrying the verbatim quote in
//! `prov:value`. Mention nodes only point at chunks, never the other way —
//! the provenance subgraph stays a forest.
//!
//! Output is canonical Turtle: prefixes once, IRI subjects sorted, mention
//! blank nodes numbered in emission order after them, triples within a
//! subject sorted by predicate then object.

use chrono::NaiveDate;
use ontorag_schema::ttl::{escape_literal, is_identifier_name, iri_escape, write_subject_block, XSD_NS};
use ontorag_schema::{DatatypeRange, InstanceProposalV1, SchemaCard};
use std::collections::BTreeMap;

pub const PROV_NS: &str = "http://www.w3.org/ns/prov#";
pub const ONTO_NS: &str = "http://ontorag.local/onto#";

/// Emission counters (reported to the operator, not persisted).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MaterializeSummary {
    pub instances_total: usize,
    pub instances_emitted: usize,
    pub instances_skipped: usize,
    pub triples_emitted: usize,
    pub mentions_emitted: usize,
}

#[derive(Debug, Clone)]
pub struct MaterializedInstances {
    pub ttl: String,
    pub warnings: Vec<String>,
    pub summary: MaterializeSummary,
}

/// Convert instance proposals into an RDF graph governed by `card`.
///
/// Instances of unknown classes are skipped; unknown properties and
/// uncoercible literals degrade to `xsd:string`; unresolved object targets
/// drop only the offending triple. Every anomaly lands in `warnings`.
pub fn materialize_instances(
    card: &SchemaCard,
    proposals: &[InstanceProposalV1],
) -> MaterializedInstances {
    let mut warnings: Vec<String> = Vec::new();
    let mut summary = MaterializeSummary {
        instances_total: proposals.len(),
        ..Default::default()
    };

    // -----------------------------------------------------------------
    // Pass 1: mint subject IRIs for every instance of a known class, so
    // object facts can resolve forward references.
    // -----------------------------------------------------------------
    let mut subjects: BTreeMap<String, (&InstanceProposalV1, String)> = BTreeMap::new();
    let mut iri_by_local_id: BTreeMap<String, String> = BTreeMap::new();

    for instance in proposals {
        let local_id = instance.local_id.trim();
        if local_id.is_empty() {
            warnings.push("instance proposal with empty local_id skipped".to_string());
            summary.instances_skipped += 1;
            continue;
        }
        let Some(class) = card.find_class(&instance.class) else {
            warnings.push(format!(
                "instance {} references unknown class {}",
                local_id, instance.class
            ));
            summary.instances_skipped += 1;
            continue;
        };
        let class_name = class.name.trim().to_string();
        let subject_iri = format!(
            "{}{}/{}",
            card.namespace,
            iri_escape(&class_name),
            iri_escape(local_id)
        );
        if iri_by_local_id.contains_key(local_id) {
            warnings.push(format!("duplicate instance local_id {local_id}, keeping first"));
            summary.instances_skipped += 1;
            continue;
        }
        iri_by_local_id.insert(local_id.to_string(), subject_iri.clone());
        subjects.insert(subject_iri, (instance, class_name));
    }

    // -----------------------------------------------------------------
    // Pass 2: emit triples per subject, in sorted subject order so mention
    // numbering is deterministic.
    // -----------------------------------------------------------------
    let mut blocks: Vec<(String, Vec<String>)> = Vec::new();
    let mut mention_blocks: Vec<(String, Vec<String>)> = Vec::new();
    let mut mention_counter = 0usize;

    for (subject_iri, (instance, class_name)) in &subjects {
        let local_id = instance.local_id.trim();
        let mut lines: Vec<String> = vec![format!("a {}", class_token(&card.namespace, class_name))];

        for (prop_name, literal) in &instance.datatype_values {
            let (token, range) = match card.find_datatype_property(prop_name) {
                Some(entry) => (
                    predicate_token(&card.namespace, entry.name.trim()),
                    entry.range,
                ),
                None => {
                    warnings.push(format!(
                        "instance {local_id}: unknown datatype property {prop_name}, emitted as string"
                    ));
                    (
                        predicate_token(&card.namespace, prop_name.trim()),
                        DatatypeRange::String,
                    )
                }
            };
            let lexical = literal.lexical();
            let (object, coercion_failed) = typed_literal(&lexical, range);
            if coercion_failed {
                warnings.push(format!(
                    "instance {local_id}: value \"{lexical}\" is not a valid {}, stored as string",
                    range.as_str()
                ));
            }
            lines.push(format!("{token} {object}"));
        }

        for (prop_name, target_local_id) in &instance.object_values {
            let Some(target_iri) = iri_by_local_id.get(target_local_id.trim()) else {
                warnings.push(format!(
                    "instance {local_id}: object property {prop_name} target \"{target_local_id}\" is unresolved, triple skipped"
                ));
                continue;
            };
            let token = match card.find_object_property(prop_name) {
                Some(entry) => predicate_token(&card.namespace, entry.name.trim()),
                None => {
                    warnings.push(format!(
                        "instance {local_id}: unknown object property {prop_name}"
                    ));
                    predicate_token(&card.namespace, prop_name.trim())
                }
            };
            lines.push(format!("{token} <{target_iri}>"));
        }

        for evidence in &instance.evidence {
            let mention = format!("_:m{mention_counter}");
            mention_counter += 1;
            lines.push(format!("onto:hasMention {mention}"));

            let mut mention_lines = vec![
                "a prov:Entity".to_string(),
                format!("prov:value \"{}\"", escape_literal(&evidence.quote)),
                format!("prov:wasDerivedFrom <chunk:{}>", iri_escape(&evidence.chunk_id)),
            ];
            mention_lines.sort();
            mention_blocks.push((mention, mention_lines));
            summary.mentions_emitted += 1;
        }

        // Canonical ordering inside the subject: predicate, then object.
        let (head, rest) = lines.split_at(1);
        let mut rest = rest.to_vec();
        rest.sort();
        let mut ordered = head.to_vec();
        ordered.extend(rest);

        summary.triples_emitted += ordered.len();
        summary.instances_emitted += 1;
        blocks.push((format!("<{subject_iri}>"), ordered));
    }

    // -----------------------------------------------------------------
    // Render.
    // -----------------------------------------------------------------
    let mut ttl = String::new();
    ttl.push_str(&format!("@prefix ns: <{}> .\n", card.namespace));
    ttl.push_str(&format!("@prefix onto: <{ONTO_NS}> .\n"));
    ttl.push_str(&format!("@prefix prov: <{PROV_NS}> .\n"));
    ttl.push_str(&format!("@prefix xsd: <{XSD_NS}> .\n"));

    for (subject, lines) in &blocks {
        write_subject_block(&mut ttl, subject, lines);
    }
    for (subject, lines) in &mention_blocks {
        write_subject_block(&mut ttl, subject, lines);
        summary.triples_emitted += lines.len();
    }

    MaterializedInstances {
        ttl,
        warnings,
        summary,
    }
}

fn class_token(namespace: &str, name: &str) -> String {
    if is_identifier_name(name) {
        format!("ns:{name}")
    } else {
        format!("<{}{}>", namespace, iri_escape(name))
    }
}

fn predicate_token(namespace: &str, name: &str) -> String {
    class_token(namespace, name)
}

/// Cast a lexical value to the declared range. Returns the Turtle object
/// token plus a flag set when the value failed coercion and fell back to
/// `xsd:string`.
fn typed_literal(lexical: &str, range: DatatypeRange) -> (String, bool) {
    let fallback = |lexical: &str| (format!("\"{}\"^^xsd:string", escape_literal(lexical)), true);

    match range {
        DatatypeRange::String => (
            format!("\"{}\"^^xsd:string", escape_literal(lexical)),
            false,
        ),
        DatatypeRange::Integer => match lexical.trim().parse::<i64>() {
            Ok(n) => (format!("\"{n}\"^^xsd:integer"), false),
            Err(_) => fallback(lexical),
        },
        DatatypeRange::Decimal => {
            let trimmed = lexical.trim();
            match trimmed.parse::<f64>() {
                Ok(v) if v.is_finite() => (
                    format!("\"{}\"^^xsd:decimal", escape_literal(trimmed)),
                    false,
                ),
                _ => fallback(lexical),
            }
        }
        DatatypeRange::Boolean => {
            let trimmed = lexical.trim();
            if trimmed.eq_ignore_ascii_case("true") {
                ("\"true\"^^xsd:boolean".to_string(), false)
            } else if trimmed.eq_ignore_ascii_case("false") {
                ("\"false\"^^xsd:boolean".to_string(), false)
            } else {
                fallback(lexical)
            }
        }
        DatatypeRange::Date => {
            let trimmed = lexical.trim();
            match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
                Ok(_) => (format!("\"{trimmed}\"^^xsd:date"), false),
                Err(_) => fallback(lexical),
            }
        }
        DatatypeRange::DateTime => {
            let trimmed = lexical.trim();
            let valid = chrono::DateTime::parse_from_rfc3339(trimmed).is_ok()
                || chrono::NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S").is_ok();
            if valid {
                (
                    format!("\"{}\"^^xsd:dateTime", escape_literal(trimmed)),
                    false,
                )
            } else {
                fallback(lexical)
            }
        }
        DatatypeRange::AnyUri => (
            format!("\"{}\"^^xsd:anyURI", escape_literal(lexical.trim())),
            false,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontorag_schema::{
        ClassEntry, DatatypePropertyEntry, EvidenceRef, LiteralValue, ObjectPropertyEntry,
    };

    fn card() -> SchemaCard {
        SchemaCard {
            classes: vec![ClassEntry {
                name: "Person".to_string(),
                ..Default::default()
            }],
            datatype_properties: vec![
                DatatypePropertyEntry {
                    name: "email".to_string(),
                    domain: "Person".to_string(),
                    range: DatatypeRange::String,
                    ..Default::default()
                },
                DatatypePropertyEntry {
                    name: "age".to_string(),
                    domain: "Person".to_string(),
                    range: DatatypeRange::Integer,
                    ..Default::default()
                },
            ],
            object_properties: vec![ObjectPropertyEntry {
                name: "knows".to_string(),
                domain: "Person".to_string(),
                range: "Person".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn person(local_id: &str) -> InstanceProposalV1 {
        InstanceProposalV1 {
            local_id: local_id.to_string(),
            class: "Person".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn emits_typed_facts_and_mention_nodes() {
        let mut p1 = person("p1");
        p1.datatype_values.insert(
            "email".to_string(),
            LiteralValue::Text("a@b.c".to_string()),
        );
        p1.evidence.push(EvidenceRef {
            chunk_id: "c1".to_string(),
            quote: "Alice's email is a@b.c".to_string(),
        });

        let result = materialize_instances(&card(), &[p1]);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        assert!(result
            .ttl
            .contains("<http://ontorag.local/ns/Person/p1> a ns:Person ;"));
        assert!(result.ttl.contains("ns:email \"a@b.c\"^^xsd:string"));
        assert!(result.ttl.contains("onto:hasMention _:m0"));
        assert!(result.ttl.contains("_:m0 a prov:Entity ;"));
        assert!(result
            .ttl
            .contains("prov:value \"Alice's email is a@b.c\""));
        assert!(result.ttl.contains("prov:wasDerivedFrom <chunk:c1>"));
        assert_eq!(result.summary.instances_emitted, 1);
        assert_eq!(result.summary.mentions_emitted, 1);
    }

    #[test]
    fn unknown_class_skips_whole_instance() {
        let mut alien = person("a1");
        alien.class = "Alien".to_string();
        let result = materialize_instances(&card(), &[alien]);
        assert!(!result.ttl.contains("a1"));
        assert!(result
            .warnings
            .contains(&"instance a1 references unknown class Alien".to_string()));
        assert_eq!(result.summary.instances_skipped, 1);
        assert_eq!(result.summary.instances_emitted, 0);
    }

    #[test]
    fn object_facts_resolve_across_the_batch() {
        let mut p1 = person("p1");
        p1.object_values
            .insert("knows".to_string(), "p2".to_string());
        let p2 = person("p2");

        let result = materialize_instances(&card(), &[p1, p2]);
        assert!(result
            .ttl
            .contains("ns:knows <http://ontorag.local/ns/Person/p2>"));
    }

    #[test]
    fn unresolved_object_target_skips_only_that_triple() {
        let mut p1 = person("p1");
        p1.object_values
            .insert("knows".to_string(), "ghost".to_string());
        p1.datatype_values.insert(
            "email".to_string(),
            LiteralValue::Text("a@b.c".to_string()),
        );

        let result = materialize_instances(&card(), &[p1]);
        assert!(!result.ttl.contains("ns:knows"));
        assert!(result.ttl.contains("ns:email"));
        assert!(result.warnings.iter().any(|w| w.contains("unresolved")));
    }

    #[test]
    fn literal_coercion_and_fallback() {
        let mut p1 = person("p1");
        p1.datatype_values
            .insert("age".to_string(), LiteralValue::Number(42.into()));
        let mut p2 = person("p2");
        p2.datatype_values.insert(
            "age".to_string(),
            LiteralValue::Text("not a number".to_string()),
        );

        let result = materialize_instances(&card(), &[p1, p2]);
        assert!(result.ttl.contains("ns:age \"42\"^^xsd:integer"));
        assert!(result.ttl.contains("ns:age \"not a number\"^^xsd:string"));
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("not a valid integer")));
    }

    #[test]
    fn unknown_datatype_property_degrades_to_string() {
        let mut p1 = person("p1");
        p1.datatype_values.insert(
            "shoe_size".to_string(),
            LiteralValue::Text("44".to_string()),
        );
        let result = materialize_instances(&card(), &[p1]);
        assert!(result.ttl.contains("ns:shoe_size \"44\"^^xsd:string"));
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("unknown datatype property shoe_size")));
    }

    #[test]
    fn output_is_deterministic() {
        let mut p1 = person("p1");
        p1.datatype_values.insert(
            "email".to_string(),
            LiteralValue::Text("a@b.c".to_string()),
        );
        p1.evidence.push(EvidenceRef {
            chunk_id: "c1".to_string(),
            quote: "q".to_string(),
        });
        let p2 = person("p2");

        let a = materialize_instances(&card(), &[p1.clone(), p2.clone()]);
        let b = materialize_instances(&card(), &[p1, p2]);
        assert_eq!(a.ttl, b.ttl);
    }
}
