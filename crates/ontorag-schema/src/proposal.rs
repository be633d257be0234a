//! Wire types for LLM proposal output (versioned).
//!
//! The model returns free-form JSON; these records are the only place that
//! JSON is interpreted. Conversion happens once at the boundary
//! ([`ChunkProposalV1::from_json_value`]) — downstream code never sees
//! untyped maps. Missing keys default to empty collections, unknown keys
//! are tolerated and ignored.

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A pointer to the chunk text that supports a proposal.
///
/// `quote` is a verbatim substring of the chunk (the prompt bounds it to
/// 25 words); together with `chunk_id` it is the dedup key for evidence.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct EvidenceRef {
    pub chunk_id: String,
    pub quote: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProposedClassV1 {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Baseline tag when routed through the importer; empty for LLM output.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub origin: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<EvidenceRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProposedDatatypePropertyV1 {
    pub name: String,
    #[serde(default)]
    pub domain: String,
    /// Free-form range; normalized to a [`crate::DatatypeRange`] at merge.
    #[serde(default)]
    pub range: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub origin: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<EvidenceRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProposedObjectPropertyV1 {
    pub name: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub range: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub origin: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<EvidenceRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProposedEventV1 {
    pub name: String,
    #[serde(default)]
    pub actors: Vec<String>,
    #[serde(default)]
    pub effects: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub origin: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<EvidenceRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProposedAdditionsV1 {
    #[serde(default)]
    pub classes: Vec<ProposedClassV1>,
    #[serde(default)]
    pub datatype_properties: Vec<ProposedDatatypePropertyV1>,
    #[serde(default)]
    pub object_properties: Vec<ProposedObjectPropertyV1>,
    #[serde(default)]
    pub events: Vec<ProposedEventV1>,
}

impl ProposedAdditionsV1 {
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
            && self.datatype_properties.is_empty()
            && self.object_properties.is_empty()
            && self.events.is_empty()
    }
}

/// "Reuse existing term X instead of creating Y" hint. Never auto-applied;
/// the merger turns these into alias suggestions for human review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReuseHintV1 {
    pub proposed: String,
    pub reuse: String,
    #[serde(default)]
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AliasSuggestionV1 {
    pub names: Vec<String>,
    #[serde(default)]
    pub rationale: String,
}

/// Parsed LLM output for one chunk (schema pass).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChunkProposalV1 {
    #[serde(default)]
    pub chunk_id: String,
    #[serde(default)]
    pub proposed_additions: ProposedAdditionsV1,
    #[serde(default)]
    pub reuse_instead_of_create: Vec<ReuseHintV1>,
    #[serde(default)]
    pub alias_or_merge_suggestions: Vec<AliasSuggestionV1>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ChunkProposalV1 {
    /// Boundary conversion from raw model JSON. Rejects non-objects and
    /// mistyped known keys; tolerates unknown keys and fills missing ones.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
        ensure!(
            value.is_object(),
            "chunk proposal must be a JSON object, got {}",
            json_kind(&value)
        );
        serde_json::from_value(value).context("response does not match the chunk proposal schema")
    }
}

/// Aggregator output: one document-level proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DocumentProposalV1 {
    #[serde(default)]
    pub proposed_additions: ProposedAdditionsV1,
    #[serde(default)]
    pub reuse_instead_of_create: Vec<ReuseHintV1>,
    #[serde(default)]
    pub alias_or_merge_suggestions: Vec<AliasSuggestionV1>,
    #[serde(default)]
    pub warnings: Vec<String>,
    /// How many per-chunk proposals were folded in.
    #[serde(default)]
    pub chunks_aggregated: usize,
}

// ============================================================================
// Instance pass
// ============================================================================

/// A JSON literal in an instance proposal. The model may emit strings,
/// numbers, or booleans; materialization works on the lexical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl LiteralValue {
    pub fn lexical(&self) -> String {
        match self {
            LiteralValue::Bool(b) => b.to_string(),
            LiteralValue::Number(n) => n.to_string(),
            LiteralValue::Text(s) => s.clone(),
        }
    }
}

/// One proposed instance. `local_id` is stable within a single document's
/// extraction and is what object facts refer to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct InstanceProposalV1 {
    #[serde(default)]
    pub local_id: String,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub datatype_values: BTreeMap<String, LiteralValue>,
    #[serde(default)]
    pub object_values: BTreeMap<String, String>,
    #[serde(default)]
    pub evidence: Vec<EvidenceRef>,
}

/// Parsed LLM output for one chunk (instance pass).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChunkInstancesV1 {
    #[serde(default)]
    pub chunk_id: String,
    #[serde(default)]
    pub instances: Vec<InstanceProposalV1>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ChunkInstancesV1 {
    pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
        ensure!(
            value.is_object(),
            "instance proposal must be a JSON object, got {}",
            json_kind(&value)
        );
        serde_json::from_value(value).context("response does not match the instance proposal schema")
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
