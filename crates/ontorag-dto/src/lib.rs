//! Document ingestion DTOs for OntoRAG
//!
//! Freezes document content into stable, content-addressed records:
//! - `DocumentDto` — one ingested source file
//! - `ChunkDto` — one extraction unit with provenance
//! - `ProvenanceDto` — source pointer (path, page, section, offsets)
//!
//! Everything downstream (LLM proposals, schema merging, instance
//! materialization) refers back to these records by id, so regeneration
//! with identical inputs must yield identical ids. See [`ids`].
//!
//! **Untrusted boundary**: rich-format parsing (PDF, DOCX, …) is delegated
//! to external loaders; this crate only chunks plain text and markdown.

use serde::{Deserialize, Serialize};

pub mod ids;
pub mod loader;
pub mod store;

pub use ids::{chunk_id, document_id, text_hash};
pub use loader::{load_document, LoaderOptions};
pub use store::{store_document, ChunkStore, StoredDocument};

/// A pointer from a chunk back into its source document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceDto {
    pub source_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_mime: Option<String>,
    /// 1-based page number, when the source has pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Section label (e.g. a markdown heading path).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Character-offset range of the chunk within the source text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_start: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_end: Option<usize>,
    /// Short cleaned excerpt for display; never used for identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_snippet: Option<String>,
}

/// One extraction unit of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkDto {
    pub document_id: String,
    pub chunk_id: String,
    pub chunk_index: usize,
    pub text: String,
    pub provenance: ProvenanceDto,
    pub text_hash: String,
    pub created_at: String,
}

/// One ingested source file with its chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentDto {
    pub document_id: String,
    pub source_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_mime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub chunks: Vec<ChunkDto>,
}

/// Current UTC instant as an ISO-8601 string (`…Z`).
pub fn now_iso8601() -> String {
    chrono::Utc::now()
        .to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

/// Collapse whitespace and truncate to a display-sized excerpt.
pub fn clean_snippet(text: &str, max_len: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_len {
        return collapsed;
    }
    let mut out: String = collapsed.chars().take(max_len).collect();
    out.push('…');
    out
}
