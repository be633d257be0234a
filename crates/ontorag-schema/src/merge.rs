//! Deterministic Schema Card merge.
//!
//! `merge_card_at(prior, proposal, now)` is a pure function: the same
//! `(prior, proposal, timestamp)` triple produces byte-identical canonical
//! JSON. The wall-clock wrapper [`merge_card`] confines non-determinism to
//! the `version` field.
//!
//! Governance rules enforced here:
//! - uniqueness under the case-insensitive name key, first-seen casing kept
//! - origin immutability: the first non-empty origin wins, forever
//! - evidence accumulates, deduplicated by `(chunk_id, quote)`, never lost
//! - descriptions upgrade only when strictly longer (ties: prior wins)
//! - free-form ranges normalize into the closed datatype set
//! - unresolved domain/range references warn but never drop the property
//! - reuse hints become alias suggestions; nothing is auto-renamed

use crate::aggregate::{merge_evidence, union_ordered, upgrade_description, WarningList};
use crate::card::{
    name_key, AliasEntry, ClassEntry, DatatypePropertyEntry, DatatypeRange, EventEntry,
    ObjectPropertyEntry, SchemaCard, ORIGIN_INDUCED,
};
use crate::proposal::DocumentProposalV1;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Merge with the current wall-clock timestamp.
pub fn merge_card(prior: &SchemaCard, proposal: &DocumentProposalV1) -> SchemaCard {
    merge_card_at(prior, proposal, Utc::now())
}

/// Merge with an injected timestamp. Pure; use this in tests and anywhere
/// reproducibility matters.
pub fn merge_card_at(
    prior: &SchemaCard,
    proposal: &DocumentProposalV1,
    now: DateTime<Utc>,
) -> SchemaCard {
    let mut warnings = WarningList::default();
    warnings.extend(prior.warnings.iter().cloned());
    warnings.extend(proposal.warnings.iter().cloned());

    let add = &proposal.proposed_additions;

    // -----------------------------------------------------------------
    // Classes.
    // -----------------------------------------------------------------
    let mut classes: BTreeMap<String, ClassEntry> = prior
        .classes
        .iter()
        .map(|c| (name_key(&c.name), c.clone()))
        .collect();

    for class in &add.classes {
        let key = name_key(&class.name);
        if key.is_empty() {
            warnings.push("class proposal with empty name skipped");
            continue;
        }
        match classes.get_mut(&key) {
            None => {
                classes.insert(
                    key,
                    ClassEntry {
                        name: class.name.trim().to_string(),
                        description: class.description.clone(),
                        origin: origin_for_insert(&class.origin),
                        evidence: class.evidence.clone(),
                    },
                );
            }
            Some(existing) => {
                upgrade_description(&mut existing.description, &class.description);
                merge_evidence(&mut existing.evidence, &class.evidence);
                fill_origin(&mut existing.origin, &class.origin);
            }
        }
    }

    // -----------------------------------------------------------------
    // Datatype properties (ranges normalized into the closed set).
    // -----------------------------------------------------------------
    let mut dprops: BTreeMap<String, DatatypePropertyEntry> = prior
        .datatype_properties
        .iter()
        .map(|p| (name_key(&p.name), p.clone()))
        .collect();

    for prop in &add.datatype_properties {
        let key = name_key(&prop.name);
        if key.is_empty() {
            warnings.push("datatype property proposal with empty name skipped");
            continue;
        }
        let (range, coerced) = DatatypeRange::normalize(&prop.range);
        if coerced {
            warnings.push(format!(
                "datatype property {}: unknown range \"{}\" stored as string",
                prop.name.trim(),
                prop.range
            ));
        }
        match dprops.get_mut(&key) {
            None => {
                dprops.insert(
                    key,
                    DatatypePropertyEntry {
                        name: prop.name.trim().to_string(),
                        domain: prop.domain.clone(),
                        range,
                        description: prop.description.clone(),
                        origin: origin_for_insert(&prop.origin),
                        evidence: prop.evidence.clone(),
                    },
                );
            }
            Some(existing) => {
                if name_key(&existing.domain) != name_key(&prop.domain) {
                    warnings.push(format!(
                        "datatype property {}: conflicting domain, kept \"{}\", saw \"{}\"",
                        existing.name, existing.domain, prop.domain
                    ));
                }
                if existing.range != range {
                    warnings.push(format!(
                        "datatype property {}: conflicting range, kept \"{}\", saw \"{}\"",
                        existing.name,
                        existing.range.as_str(),
                        range.as_str()
                    ));
                }
                upgrade_description(&mut existing.description, &prop.description);
                merge_evidence(&mut existing.evidence, &prop.evidence);
                fill_origin(&mut existing.origin, &prop.origin);
            }
        }
    }

    // -----------------------------------------------------------------
    // Object properties.
    // -----------------------------------------------------------------
    let mut oprops: BTreeMap<String, ObjectPropertyEntry> = prior
        .object_properties
        .iter()
        .map(|p| (name_key(&p.name), p.clone()))
        .collect();

    for prop in &add.object_properties {
        let key = name_key(&prop.name);
        if key.is_empty() {
            warnings.push("object property proposal with empty name skipped");
            continue;
        }
        match oprops.get_mut(&key) {
            None => {
                oprops.insert(
                    key,
                    ObjectPropertyEntry {
                        name: prop.name.trim().to_string(),
                        domain: prop.domain.clone(),
                        range: prop.range.clone(),
                        description: prop.description.clone(),
                        origin: origin_for_insert(&prop.origin),
                        evidence: prop.evidence.clone(),
                    },
                );
            }
            Some(existing) => {
                if name_key(&existing.domain) != name_key(&prop.domain) {
                    warnings.push(format!(
                        "object property {}: conflicting domain, kept \"{}\", saw \"{}\"",
                        existing.name, existing.domain, prop.domain
                    ));
                }
                if name_key(&existing.range) != name_key(&prop.range) {
                    warnings.push(format!(
                        "object property {}: conflicting range, kept \"{}\", saw \"{}\"",
                        existing.name, existing.range, prop.range
                    ));
                }
                upgrade_description(&mut existing.description, &prop.description);
                merge_evidence(&mut existing.evidence, &prop.evidence);
                fill_origin(&mut existing.origin, &prop.origin);
            }
        }
    }

    // -----------------------------------------------------------------
    // Events: actors and effects union as ordered sets.
    // -----------------------------------------------------------------
    let mut events: BTreeMap<String, EventEntry> = prior
        .events
        .iter()
        .map(|e| (name_key(&e.name), e.clone()))
        .collect();

    for event in &add.events {
        let key = name_key(&event.name);
        if key.is_empty() {
            warnings.push("event proposal with empty name skipped");
            continue;
        }
        match events.get_mut(&key) {
            None => {
                events.insert(
                    key,
                    EventEntry {
                        name: event.name.trim().to_string(),
                        actors: dedup_ordered(&event.actors),
                        effects: dedup_ordered(&event.effects),
                        origin: origin_for_insert(&event.origin),
                        evidence: event.evidence.clone(),
                    },
                );
            }
            Some(existing) => {
                union_ordered(&mut existing.actors, &event.actors);
                union_ordered(&mut existing.effects, &event.effects);
                merge_evidence(&mut existing.evidence, &event.evidence);
                fill_origin(&mut existing.origin, &event.origin);
            }
        }
    }

    // -----------------------------------------------------------------
    // Referential checks over the merged class set (card-wide; the
    // warning dedup absorbs re-checks of prior entries).
    // -----------------------------------------------------------------
    let class_keys: BTreeSet<String> = classes.keys().cloned().collect();

    for prop in dprops.values() {
        let domain_key = name_key(&prop.domain);
        if !domain_key.is_empty() && !class_keys.contains(&domain_key) {
            warnings.push(format!(
                "datatype property {} references unknown class {}",
                prop.name, prop.domain
            ));
        }
    }
    for prop in oprops.values() {
        for (label, reference) in [("domain", &prop.domain), ("range", &prop.range)] {
            let ref_key = name_key(reference);
            if ref_key.is_empty() {
                warnings.push(format!("object property {} has empty {}", prop.name, label));
            } else if !class_keys.contains(&ref_key) {
                warnings.push(format!(
                    "object property {} references unknown class {}",
                    prop.name, reference
                ));
            }
        }
    }

    // -----------------------------------------------------------------
    // Aliases: proposal suggestions plus reuse hints, deduplicated by the
    // sorted tuple of names, order preserved. Hints are never auto-applied.
    // -----------------------------------------------------------------
    let mut aliases: Vec<AliasEntry> = Vec::new();
    let mut alias_keys: HashSet<Vec<String>> = HashSet::new();

    for alias in &prior.aliases {
        if alias_keys.insert(alias.key()) {
            aliases.push(alias.clone());
        }
    }
    for suggestion in &proposal.alias_or_merge_suggestions {
        let alias = AliasEntry {
            names: suggestion.names.clone(),
            rationale: suggestion.rationale.clone(),
        };
        if alias_keys.insert(alias.key()) {
            aliases.push(alias);
        }
    }
    for hint in &proposal.reuse_instead_of_create {
        let rationale = if hint.rationale.trim().is_empty() {
            format!("reuse {} instead of creating {}", hint.reuse, hint.proposed)
        } else {
            hint.rationale.clone()
        };
        let alias = AliasEntry {
            names: vec![hint.proposed.clone(), hint.reuse.clone()],
            rationale,
        };
        if alias_keys.insert(alias.key()) {
            aliases.push(alias);
        }
    }

    let mut card = SchemaCard {
        version: next_version(&prior.version, now),
        namespace: prior.namespace.clone(),
        classes: classes.into_values().collect(),
        datatype_properties: dprops.into_values().collect(),
        object_properties: oprops.into_values().collect(),
        events: events.into_values().collect(),
        aliases,
        warnings: warnings.into_vec(),
    };
    sort_card_evidence(&mut card);
    card
}

/// Origin for a newly inserted element: the proposal's tag when present
/// (baseline imports), `induced` otherwise.
fn origin_for_insert(proposed: &str) -> String {
    if proposed.trim().is_empty() {
        ORIGIN_INDUCED.to_string()
    } else {
        proposed.trim().to_string()
    }
}

/// First non-empty origin wins; a set origin is immutable.
fn fill_origin(existing: &mut String, proposed: &str) {
    if existing.is_empty() && !proposed.trim().is_empty() {
        *existing = proposed.trim().to_string();
    }
}

fn dedup_ordered(items: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    union_ordered(&mut out, items);
    out
}

fn sort_card_evidence(card: &mut SchemaCard) {
    for c in &mut card.classes {
        c.evidence.sort();
        c.evidence.dedup();
    }
    for p in &mut card.datatype_properties {
        p.evidence.sort();
        p.evidence.dedup();
    }
    for p in &mut card.object_properties {
        p.evidence.sort();
        p.evidence.dedup();
    }
    for e in &mut card.events {
        e.evidence.sort();
        e.evidence.dedup();
    }
}

/// ISO-8601 UTC version stamp, strictly after `prior`. When the clock has
/// not advanced past the prior version, bump by one microsecond instead of
/// going backwards.
fn next_version(prior: &str, now: DateTime<Utc>) -> String {
    let candidate = match DateTime::parse_from_rfc3339(prior) {
        Ok(prev) => {
            let prev = prev.with_timezone(&Utc);
            if now > prev {
                now
            } else {
                prev + chrono::Duration::microseconds(1)
            }
        }
        Err(_) => now,
    };
    candidate.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::{
        DocumentProposalV1, EvidenceRef, ProposedAdditionsV1, ProposedClassV1,
        ProposedDatatypePropertyV1, ProposedObjectPropertyV1, ReuseHintV1,
    };
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap()
    }

    fn proposal_with_classes(classes: Vec<ProposedClassV1>) -> DocumentProposalV1 {
        DocumentProposalV1 {
            proposed_additions: ProposedAdditionsV1 {
                classes,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn empty_merge_inserts_induced_class() {
        let prior = SchemaCard::default();
        let proposal = proposal_with_classes(vec![ProposedClassV1 {
            name: "Person".to_string(),
            description: "A human".to_string(),
            evidence: vec![EvidenceRef {
                chunk_id: "c1".to_string(),
                quote: "Alice is a person".to_string(),
            }],
            ..Default::default()
        }]);

        let card = merge_card_at(&prior, &proposal, ts());
        assert_eq!(card.classes.len(), 1);
        let class = &card.classes[0];
        assert_eq!(class.name, "Person");
        assert_eq!(class.description, "A human");
        assert_eq!(class.origin, "induced");
        assert_eq!(
            class.evidence,
            vec![EvidenceRef {
                chunk_id: "c1".to_string(),
                quote: "Alice is a person".to_string(),
            }]
        );
    }

    #[test]
    fn case_insensitive_dedup_preserves_origin_and_casing() {
        let prior = SchemaCard {
            classes: vec![ClassEntry {
                name: "Person".to_string(),
                description: "A human".to_string(),
                origin: "foaf".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let proposal = proposal_with_classes(vec![ProposedClassV1 {
            name: "person".to_string(),
            description: "Longer description text here".to_string(),
            ..Default::default()
        }]);

        let card = merge_card_at(&prior, &proposal, ts());
        assert_eq!(card.classes.len(), 1);
        let class = &card.classes[0];
        assert_eq!(class.name, "Person");
        assert_eq!(class.origin, "foaf");
        assert_eq!(class.description, "Longer description text here");
    }

    #[test]
    fn description_tie_keeps_prior() {
        let prior = SchemaCard {
            classes: vec![ClassEntry {
                name: "Person".to_string(),
                description: "first".to_string(),
                origin: "foaf".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let proposal = proposal_with_classes(vec![ProposedClassV1 {
            name: "Person".to_string(),
            description: "other".to_string(),
            ..Default::default()
        }]);
        let card = merge_card_at(&prior, &proposal, ts());
        assert_eq!(card.classes[0].description, "first");
    }

    #[test]
    fn unknown_object_property_reference_warns_but_retains() {
        let proposal = DocumentProposalV1 {
            proposed_additions: ProposedAdditionsV1 {
                classes: vec![ProposedClassV1 {
                    name: "Person".to_string(),
                    ..Default::default()
                }],
                object_properties: vec![ProposedObjectPropertyV1 {
                    name: "knows".to_string(),
                    domain: "Ghost".to_string(),
                    range: "Person".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            },
            ..Default::default()
        };

        let card = merge_card_at(&SchemaCard::default(), &proposal, ts());
        assert_eq!(card.object_properties.len(), 1);
        assert!(card
            .warnings
            .contains(&"object property knows references unknown class Ghost".to_string()));
    }

    #[test]
    fn range_normalization_and_unknown_range_warning() {
        let mk = |name: &str, range: &str| ProposedDatatypePropertyV1 {
            name: name.to_string(),
            domain: "Person".to_string(),
            range: range.to_string(),
            ..Default::default()
        };
        let proposal = DocumentProposalV1 {
            proposed_additions: ProposedAdditionsV1 {
                classes: vec![ProposedClassV1 {
                    name: "Person".to_string(),
                    ..Default::default()
                }],
                datatype_properties: vec![mk("age", "int"), mk("nickname", "xyz")],
                ..Default::default()
            },
            ..Default::default()
        };

        let card = merge_card_at(&SchemaCard::default(), &proposal, ts());
        assert_eq!(
            card.find_datatype_property("age").unwrap().range,
            DatatypeRange::Integer
        );
        assert_eq!(
            card.find_datatype_property("nickname").unwrap().range,
            DatatypeRange::String
        );
        assert!(!card.warnings.iter().any(|w| w.contains("range") && w.contains("age")));
        assert!(card
            .warnings
            .contains(&"datatype property nickname: unknown range \"xyz\" stored as string".to_string()));
    }

    #[test]
    fn reuse_hints_become_alias_suggestions() {
        let proposal = DocumentProposalV1 {
            reuse_instead_of_create: vec![ReuseHintV1 {
                proposed: "Employee".to_string(),
                reuse: "Person".to_string(),
                rationale: String::new(),
            }],
            ..Default::default()
        };
        let card = merge_card_at(&SchemaCard::default(), &proposal, ts());
        assert_eq!(card.aliases.len(), 1);
        assert_eq!(card.aliases[0].names, vec!["Employee", "Person"]);
        assert!(card.aliases[0].rationale.contains("reuse Person"));
        // No rename happened.
        assert!(card.classes.is_empty());
    }

    #[test]
    fn version_advances_even_when_clock_stalls() {
        let prior = SchemaCard::default();
        let first = merge_card_at(&prior, &DocumentProposalV1::default(), ts());
        let second = merge_card_at(&first, &DocumentProposalV1::default(), ts());
        assert!(second.version > first.version);
    }

    #[test]
    fn merge_is_deterministic_excluding_version() {
        let proposal = proposal_with_classes(vec![ProposedClassV1 {
            name: "Person".to_string(),
            description: "A human".to_string(),
            ..Default::default()
        }]);
        let a = merge_card_at(&SchemaCard::default(), &proposal, ts());
        let b = merge_card_at(&SchemaCard::default(), &proposal, ts());
        assert_eq!(
            a.to_canonical_json().unwrap(),
            b.to_canonical_json().unwrap()
        );
    }
}
