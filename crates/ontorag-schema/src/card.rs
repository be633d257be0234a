//! The Schema Card: the canonical, versioned ontology artifact.
//!
//! A card is a set of value-oriented tables (classes, properties, events,
//! aliases) joined by name keys, not by pointer. The uniqueness key for
//! every named table is the lowercased trimmed name; entries keep their
//! first-seen casing. Serialization is canonical: sorted collections plus
//! sorted JSON keys, so two equal cards are byte-identical on disk.

use crate::proposal::EvidenceRef;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Namespace used to mint class/property IRIs when none is configured.
pub const DEFAULT_NAMESPACE: &str = "http://ontorag.local/ns/";

/// Origin tag for elements first introduced by an LLM proposal.
pub const ORIGIN_INDUCED: &str = "induced";

/// Case-insensitive uniqueness key for all named tables.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Closed set of datatype-property ranges, serialized as the XSD local
/// names used on the wire (`"dateTime"`, `"anyURI"`, …).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum DatatypeRange {
    #[default]
    #[serde(rename = "string")]
    String,
    #[serde(rename = "integer")]
    Integer,
    #[serde(rename = "decimal")]
    Decimal,
    #[serde(rename = "boolean")]
    Boolean,
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "dateTime")]
    DateTime,
    #[serde(rename = "anyURI")]
    AnyUri,
}

impl DatatypeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatatypeRange::String => "string",
            DatatypeRange::Integer => "integer",
            DatatypeRange::Decimal => "decimal",
            DatatypeRange::Boolean => "boolean",
            DatatypeRange::Date => "date",
            DatatypeRange::DateTime => "dateTime",
            DatatypeRange::AnyUri => "anyURI",
        }
    }

    /// Normalize a free-form proposed range. Returns the range plus a flag
    /// marking whether the input fell outside the fixed mapping (callers
    /// turn that into a warning).
    pub fn normalize(raw: &str) -> (Self, bool) {
        let range = match raw.trim().to_lowercase().as_str() {
            "str" | "string" | "text" => DatatypeRange::String,
            "int" | "integer" => DatatypeRange::Integer,
            "float" | "number" | "decimal" => DatatypeRange::Decimal,
            "bool" | "boolean" => DatatypeRange::Boolean,
            "date" => DatatypeRange::Date,
            "datetime" | "timestamp" => DatatypeRange::DateTime,
            "url" | "uri" | "anyuri" => DatatypeRange::AnyUri,
            _ => return (DatatypeRange::String, true),
        };
        (range, false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ClassEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<EvidenceRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DatatypePropertyEntry {
    pub name: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub range: DatatypeRange,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<EvidenceRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ObjectPropertyEntry {
    pub name: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub range: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<EvidenceRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EventEntry {
    pub name: String,
    #[serde(default)]
    pub actors: Vec<String>,
    #[serde(default)]
    pub effects: Vec<String>,
    #[serde(default)]
    pub origin: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<EvidenceRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AliasEntry {
    pub names: Vec<String>,
    #[serde(default)]
    pub rationale: String,
}

impl AliasEntry {
    /// Dedup key: the sorted tuple of lowercased names.
    pub fn key(&self) -> Vec<String> {
        let mut names: Vec<String> = self.names.iter().map(|n| name_key(n)).collect();
        names.sort();
        names
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaCard {
    /// ISO-8601 UTC timestamp; strictly increasing across merges.
    #[serde(default)]
    pub version: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub classes: Vec<ClassEntry>,
    #[serde(default)]
    pub datatype_properties: Vec<DatatypePropertyEntry>,
    #[serde(default)]
    pub object_properties: Vec<ObjectPropertyEntry>,
    #[serde(default)]
    pub events: Vec<EventEntry>,
    #[serde(default)]
    pub aliases: Vec<AliasEntry>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

impl Default for SchemaCard {
    fn default() -> Self {
        Self {
            version: String::new(),
            namespace: default_namespace(),
            classes: Vec::new(),
            datatype_properties: Vec::new(),
            object_properties: Vec::new(),
            events: Vec::new(),
            aliases: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl SchemaCard {
    pub fn find_class(&self, name: &str) -> Option<&ClassEntry> {
        let key = name_key(name);
        self.classes.iter().find(|c| name_key(&c.name) == key)
    }

    pub fn find_datatype_property(&self, name: &str) -> Option<&DatatypePropertyEntry> {
        let key = name_key(name);
        self.datatype_properties
            .iter()
            .find(|p| name_key(&p.name) == key)
    }

    pub fn find_object_property(&self, name: &str) -> Option<&ObjectPropertyEntry> {
        let key = name_key(name);
        self.object_properties
            .iter()
            .find(|p| name_key(&p.name) == key)
    }

    /// Canonical pretty-printed JSON: object keys sorted (via a `Value`
    /// round-trip, where serde_json's map is a `BTreeMap`), collections in
    /// merge order.
    pub fn to_canonical_json(&self) -> Result<String> {
        let value = serde_json::to_value(self).context("failed to encode schema card")?;
        let mut out =
            serde_json::to_string_pretty(&value).context("failed to render schema card")?;
        out.push('\n');
        Ok(out)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("failed to parse schema card")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_normalization_follows_fixed_mapping() {
        assert_eq!(DatatypeRange::normalize("int"), (DatatypeRange::Integer, false));
        assert_eq!(DatatypeRange::normalize("Integer"), (DatatypeRange::Integer, false));
        assert_eq!(DatatypeRange::normalize("text"), (DatatypeRange::String, false));
        assert_eq!(DatatypeRange::normalize("number"), (DatatypeRange::Decimal, false));
        assert_eq!(DatatypeRange::normalize("timestamp"), (DatatypeRange::DateTime, false));
        assert_eq!(DatatypeRange::normalize("dateTime"), (DatatypeRange::DateTime, false));
        assert_eq!(DatatypeRange::normalize("URL"), (DatatypeRange::AnyUri, false));
        assert_eq!(DatatypeRange::normalize("xyz"), (DatatypeRange::String, true));
    }

    #[test]
    fn range_serializes_as_xsd_local_name() {
        let json = serde_json::to_string(&DatatypeRange::DateTime).expect("serialize");
        assert_eq!(json, "\"dateTime\"");
        let back: DatatypeRange = serde_json::from_str("\"anyURI\"").expect("parse");
        assert_eq!(back, DatatypeRange::AnyUri);
    }

    #[test]
    fn canonical_json_sorts_object_keys() {
        let card = SchemaCard {
            version: "2026-01-01T00:00:00Z".to_string(),
            ..Default::default()
        };
        let json = card.to_canonical_json().expect("render");
        let aliases_at = json.find("\"aliases\"").expect("aliases key");
        let version_at = json.find("\"version\"").expect("version key");
        let warnings_at = json.find("\"warnings\"").expect("warnings key");
        assert!(aliases_at < version_at);
        assert!(version_at < warnings_at);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let card = SchemaCard {
            classes: vec![ClassEntry {
                name: "Person".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(card.find_class("  PERSON ").is_some());
        assert!(card.find_class("Ghost").is_none());
    }
}
