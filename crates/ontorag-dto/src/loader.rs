//! Plain-text and markdown chunking.
//!
//! This is the fallback loader: plain text is split into overlapping
//! character windows, markdown is split on headings with the heading path
//! recorded as section provenance. Rich formats (PDF, DOCX, EPUB, …) are
//! the job of an external document-loader; whatever produces the text, the
//! DTOs and ids come out the same way.

use crate::{clean_snippet, ids, now_iso8601, ChunkDto, DocumentDto, ProvenanceDto};
use anyhow::{Context, Result};
use std::path::Path;

const SNIPPET_MAX_LEN: usize = 240;

#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Window size for plain-text chunking, in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive windows, in characters.
    pub overlap: usize,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            chunk_size: 3000,
            overlap: 200,
        }
    }
}

/// Ingest a file from disk into a `DocumentDto`.
///
/// `.md`/`.markdown` files are split on headings; everything else is
/// treated as plain text and split into overlapping windows.
pub fn load_document(
    path: &Path,
    mime: Option<&str>,
    options: &LoaderOptions,
) -> Result<DocumentDto> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let source_path = path.to_string_lossy().to_string();
    let content_hash = ids::content_hash_file(path)
        .with_context(|| format!("failed to hash {}", path.display()))?;

    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let mut doc = if matches!(ext.as_str(), "md" | "markdown") {
        document_from_markdown(&source_path, &text, mime)
    } else {
        document_from_text(&source_path, &text, mime, options)
    };
    doc.content_hash = Some(content_hash);
    Ok(doc)
}

/// Chunk plain text into overlapping windows.
pub fn document_from_text(
    source_path: &str,
    text: &str,
    mime: Option<&str>,
    options: &LoaderOptions,
) -> DocumentDto {
    let doc_id = ids::document_id(source_path);
    let mut chunks = Vec::new();

    for (start, end) in char_windows(text, options.chunk_size, options.overlap) {
        let body = &text[start..end];
        if body.trim().is_empty() {
            continue;
        }
        let index = chunks.len();
        chunks.push(make_chunk(
            &doc_id,
            index,
            body,
            ProvenanceDto {
                source_path: source_path.to_string(),
                source_mime: mime.map(|s| s.to_string()),
                offset_start: Some(start),
                offset_end: Some(end),
                text_snippet: Some(clean_snippet(body, SNIPPET_MAX_LEN)),
                ..Default::default()
            },
        ));
    }

    DocumentDto {
        document_id: doc_id,
        source_path: source_path.to_string(),
        source_mime: mime.map(|s| s.to_string()),
        content_hash: None,
        title: None,
        created_at: now_iso8601(),
        chunks,
    }
}

/// Chunk markdown on headings, recording the heading as the section label.
pub fn document_from_markdown(
    source_path: &str,
    text: &str,
    mime: Option<&str>,
) -> DocumentDto {
    let doc_id = ids::document_id(source_path);
    let mut chunks: Vec<ChunkDto> = Vec::new();

    let mut title: Option<String> = None;
    let mut section: Option<String> = None;
    let mut body = String::new();
    let mut body_start = 0usize;
    let mut offset = 0usize;

    let flush =
        |section: &Option<String>, body: &mut String, body_start: usize, chunks: &mut Vec<ChunkDto>| {
            if body.trim().is_empty() {
                body.clear();
                return;
            }
            let trimmed = body.trim();
            let index = chunks.len();
            chunks.push(make_chunk(
                &doc_id,
                index,
                trimmed,
                ProvenanceDto {
                    source_path: source_path.to_string(),
                    source_mime: mime.map(|s| s.to_string()),
                    section: section.clone(),
                    offset_start: Some(body_start),
                    offset_end: Some(body_start + body.len()),
                    text_snippet: Some(clean_snippet(trimmed, SNIPPET_MAX_LEN)),
                    ..Default::default()
                },
            ));
            body.clear();
        };

    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();

        if line.trim_start().starts_with('#') {
            flush(&section, &mut body, body_start, &mut chunks);
            let heading = line.trim_start().trim_start_matches('#').trim().to_string();
            if title.is_none() && !heading.is_empty() {
                title = Some(heading.clone());
            }
            section = (!heading.is_empty()).then_some(heading);
            body_start = offset;
        } else {
            if body.is_empty() {
                body_start = line_start;
            }
            body.push_str(line);
        }
    }
    flush(&section, &mut body, body_start, &mut chunks);

    DocumentDto {
        document_id: doc_id,
        source_path: source_path.to_string(),
        source_mime: mime.map(|s| s.to_string()),
        content_hash: None,
        title,
        created_at: now_iso8601(),
        chunks,
    }
}

fn make_chunk(doc_id: &str, index: usize, text: &str, provenance: ProvenanceDto) -> ChunkDto {
    ChunkDto {
        document_id: doc_id.to_string(),
        chunk_id: ids::chunk_id(doc_id, index, text),
        chunk_index: index,
        text: text.to_string(),
        provenance,
        text_hash: ids::text_hash(text),
        created_at: now_iso8601(),
    }
}

/// Byte ranges of overlapping character windows, aligned to char boundaries.
fn char_windows(text: &str, chunk_size: usize, overlap: usize) -> Vec<(usize, usize)> {
    let chunk_size = chunk_size.max(1);
    let step = chunk_size.saturating_sub(overlap).max(1);

    let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    boundaries.push(text.len());
    let n_chars = boundaries.len() - 1;

    let mut out = Vec::new();
    let mut start = 0usize;
    while start < n_chars {
        let end = (start + chunk_size).min(n_chars);
        out.push((boundaries[start], boundaries[end]));
        if end == n_chars {
            break;
        }
        start += step;
    }
    out
}
