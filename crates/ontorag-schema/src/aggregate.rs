//! Fold per-chunk proposals into one document-level proposal.
//!
//! Keyed by the lowercased trimmed name within each collection: first sight
//! inserts the entry verbatim (first-seen casing kept), repeats union
//! evidence and upgrade the description only when a later one is strictly
//! longer. Diverging `domain`/`range`/`actors` keep the first-seen values
//! and flag a conflict warning — governance is human, nothing is
//! auto-repaired here.
//!
//! Output ordering is deterministic: entries sorted by key, evidence sorted
//! by `(chunk_id, quote)`, so aggregation commutes across chunk orderings.

use crate::card::name_key;
use crate::proposal::{
    AliasSuggestionV1, ChunkProposalV1, DocumentProposalV1, EvidenceRef, ProposedAdditionsV1,
    ReuseHintV1,
};
use std::collections::{BTreeMap, HashSet};

/// Insertion-ordered warning list with deduplication.
#[derive(Debug, Default)]
pub(crate) struct WarningList {
    seen: HashSet<String>,
    items: Vec<String>,
}

impl WarningList {
    pub(crate) fn push(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        if self.seen.insert(warning.clone()) {
            self.items.push(warning);
        }
    }

    pub(crate) fn extend<I: IntoIterator<Item = String>>(&mut self, warnings: I) {
        for w in warnings {
            self.push(w);
        }
    }

    pub(crate) fn into_vec(self) -> Vec<String> {
        self.items
    }
}

/// Union `new` into `existing`, deduplicating by `(chunk_id, quote)`.
pub(crate) fn merge_evidence(existing: &mut Vec<EvidenceRef>, new: &[EvidenceRef]) {
    let mut seen: HashSet<(String, String)> = existing
        .iter()
        .map(|e| (e.chunk_id.clone(), e.quote.clone()))
        .collect();
    for e in new {
        if seen.insert((e.chunk_id.clone(), e.quote.clone())) {
            existing.push(e.clone());
        }
    }
}

/// Keep the first description unless `candidate` is strictly longer.
pub(crate) fn upgrade_description(current: &mut String, candidate: &str) {
    if candidate.chars().count() > current.chars().count() {
        *current = candidate.to_string();
    }
}

/// Union `extra` into `base` preserving first-seen order.
pub(crate) fn union_ordered(base: &mut Vec<String>, extra: &[String]) {
    let mut seen: HashSet<String> = base.iter().cloned().collect();
    for item in extra {
        if seen.insert(item.clone()) {
            base.push(item.clone());
        }
    }
}

pub fn aggregate_chunk_proposals(proposals: &[ChunkProposalV1]) -> DocumentProposalV1 {
    let mut classes = BTreeMap::new();
    let mut dprops = BTreeMap::new();
    let mut oprops = BTreeMap::new();
    let mut events = BTreeMap::new();

    let mut aliases: Vec<AliasSuggestionV1> = Vec::new();
    let mut alias_keys: HashSet<Vec<String>> = HashSet::new();
    let mut reuse_hints: Vec<ReuseHintV1> = Vec::new();
    let mut reuse_keys: HashSet<(String, String)> = HashSet::new();
    let mut warnings = WarningList::default();

    for proposal in proposals {
        warnings.extend(proposal.warnings.iter().cloned());

        for suggestion in &proposal.alias_or_merge_suggestions {
            let mut key: Vec<String> = suggestion.names.iter().map(|n| name_key(n)).collect();
            key.sort();
            if alias_keys.insert(key) {
                aliases.push(suggestion.clone());
            }
        }

        for hint in &proposal.reuse_instead_of_create {
            let key = (name_key(&hint.proposed), name_key(&hint.reuse));
            if reuse_keys.insert(key) {
                reuse_hints.push(hint.clone());
            }
        }

        let add = &proposal.proposed_additions;

        for class in &add.classes {
            let key = name_key(&class.name);
            if key.is_empty() {
                warnings.push("class proposal with empty name skipped");
                continue;
            }
            match classes.get_mut(&key) {
                None => {
                    classes.insert(key, class.clone());
                }
                Some(existing) => {
                    upgrade_description(&mut existing.description, &class.description);
                    merge_evidence(&mut existing.evidence, &class.evidence);
                }
            }
        }

        for prop in &add.datatype_properties {
            let key = name_key(&prop.name);
            if key.is_empty() {
                warnings.push("datatype property proposal with empty name skipped");
                continue;
            }
            match dprops.get_mut(&key) {
                None => {
                    dprops.insert(key, prop.clone());
                }
                Some(existing) => {
                    if name_key(&existing.domain) != name_key(&prop.domain) {
                        warnings.push(format!(
                            "datatype property {}: conflicting domain, kept \"{}\", saw \"{}\"",
                            existing.name, existing.domain, prop.domain
                        ));
                    }
                    if name_key(&existing.range) != name_key(&prop.range) {
                        warnings.push(format!(
                            "datatype property {}: conflicting range, kept \"{}\", saw \"{}\"",
                            existing.name, existing.range, prop.range
                        ));
                    }
                    upgrade_description(&mut existing.description, &prop.description);
                    merge_evidence(&mut existing.evidence, &prop.evidence);
                }
            }
        }

        for prop in &add.object_properties {
            let key = name_key(&prop.name);
            if key.is_empty() {
                warnings.push("object property proposal with empty name skipped");
                continue;
            }
            match oprops.get_mut(&key) {
                None => {
                    oprops.insert(key, prop.clone());
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
                }
            }
        }

        for event in &add.events {
            let key = name_key(&event.name);
            if key.is_empty() {
                warnings.push("event proposal with empty name skipped");
                continue;
            }
            match events.get_mut(&key) {
                None => {
                    events.insert(key, event.clone());
                }
                Some(existing) => {
                    if existing.actors != event.actors {
                        warnings.push(format!(
                            "event {}: conflicting actors, kept first-seen list",
                            existing.name
                        ));
                    }
                    union_ordered(&mut existing.effects, &event.effects);
                    merge_evidence(&mut existing.evidence, &event.evidence);
                }
            }
        }
    }

    let mut additions = ProposedAdditionsV1 {
        classes: classes.into_values().collect(),
        datatype_properties: dprops.into_values().collect(),
        object_properties: oprops.into_values().collect(),
        events: events.into_values().collect(),
    };
    sort_evidence(&mut additions);

    DocumentProposalV1 {
        proposed_additions: additions,
        reuse_instead_of_create: reuse_hints,
        alias_or_merge_suggestions: aliases,
        warnings: warnings.into_vec(),
        chunks_aggregated: proposals.len(),
    }
}

fn sort_evidence(additions: &mut ProposedAdditionsV1) {
    for c in &mut additions.classes {
        c.evidence.sort();
        c.evidence.dedup();
    }
    for p in &mut additions.datatype_properties {
        p.evidence.sort();
        p.evidence.dedup();
    }
    for p in &mut additions.object_properties {
        p.evidence.sort();
        p.evidence.dedup();
    }
    for e in &mut additions.events {
        e.evidence.sort();
        e.evidence.dedup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::{ProposedClassV1, ProposedObjectPropertyV1};

    fn class(name: &str, description: &str, evidence: &[(&str, &str)]) -> ProposedClassV1 {
        ProposedClassV1 {
            name: name.to_string(),
            description: description.to_string(),
            evidence: evidence
                .iter()
                .map(|(c, q)| EvidenceRef {
                    chunk_id: c.to_string(),
                    quote: q.to_string(),
                })
                .collect(),
            ..Default::default()
        }
    }

    fn chunk_with_class(chunk_id: &str, class_entry: ProposedClassV1) -> ChunkProposalV1 {
        ChunkProposalV1 {
            chunk_id: chunk_id.to_string(),
            proposed_additions: ProposedAdditionsV1 {
                classes: vec![class_entry],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn repeated_class_unions_evidence_and_keeps_first_casing() {
        let a = chunk_with_class("c1", class("Person", "A human", &[("c1", "Alice is a person")]));
        let b = chunk_with_class("c2", class("person", "hum", &[("c2", "Bob is a person")]));

        let doc = aggregate_chunk_proposals(&[a, b]);
        assert_eq!(doc.proposed_additions.classes.len(), 1);
        let merged = &doc.proposed_additions.classes[0];
        assert_eq!(merged.name, "Person");
        assert_eq!(merged.description, "A human");
        assert_eq!(merged.evidence.len(), 2);
        assert_eq!(doc.chunks_aggregated, 2);
    }

    #[test]
    fn strictly_longer_description_wins() {
        let a = chunk_with_class("c1", class("Person", "short", &[]));
        let b = chunk_with_class("c2", class("person", "a longer description", &[]));
        let doc = aggregate_chunk_proposals(&[a, b]);
        assert_eq!(
            doc.proposed_additions.classes[0].description,
            "a longer description"
        );
    }

    #[test]
    fn diverging_domain_flags_a_conflict_warning() {
        let mk = |domain: &str| ChunkProposalV1 {
            proposed_additions: ProposedAdditionsV1 {
                object_properties: vec![ProposedObjectPropertyV1 {
                    name: "knows".to_string(),
                    domain: domain.to_string(),
                    range: "Person".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            },
            ..Default::default()
        };
        let doc = aggregate_chunk_proposals(&[mk("Person"), mk("Agent")]);
        assert_eq!(doc.proposed_additions.object_properties[0].domain, "Person");
        assert!(doc
            .warnings
            .iter()
            .any(|w| w.contains("conflicting domain") && w.contains("knows")));
    }

    #[test]
    fn aggregation_commutes_across_chunk_order() {
        let a = chunk_with_class("c1", class("Person", "A human", &[("c1", "q1")]));
        let b = chunk_with_class("c2", class("Person", "A human", &[("c2", "q2")]));

        let ab = aggregate_chunk_proposals(&[a.clone(), b.clone()]);
        let ba = aggregate_chunk_proposals(&[b, a]);
        assert_eq!(ab, ba);
    }

    #[test]
    fn warnings_are_deduplicated_in_order() {
        let mk = |w: &str| ChunkProposalV1 {
            warnings: vec![w.to_string()],
            ..Default::default()
        };
        let doc = aggregate_chunk_proposals(&[mk("first"), mk("second"), mk("first")]);
        assert_eq!(doc.warnings, vec!["first".to_string(), "second".to_string()]);
    }
}
