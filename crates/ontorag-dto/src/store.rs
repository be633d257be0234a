//! Append-only JSONL persistence for chunks.
//!
//! One compact JSON record per line, UTF-8, `\n` delimited. Reads stream;
//! writes append. Ordering is insertion order within a single writer
//! session only — readers must not depend on cross-session ordering.
//! Concurrent appends require external coordination.

use crate::{ChunkDto, DocumentDto};
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// A single JSONL file of `ChunkDto` records.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    path: PathBuf,
}

impl ChunkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append chunks, creating the file (and parent directories) on first
    /// write. Existing content is preserved.
    pub fn append_many(&self, chunks: &[ChunkDto]) -> Result<usize> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {} for append", self.path.display()))?;
        let mut writer = BufWriter::new(file);
        for chunk in chunks {
            serde_json::to_writer(&mut writer, chunk)
                .with_context(|| format!("failed to encode chunk {}", chunk.chunk_id))?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(chunks.len())
    }

    /// Stream the store's chunks in file order. Blank lines are skipped;
    /// a malformed line is an error carrying its line number.
    pub fn iter(&self) -> Result<impl Iterator<Item = Result<ChunkDto>>> {
        let file = File::open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        let reader = BufReader::new(file);
        let path = self.path.clone();
        Ok(reader
            .lines()
            .enumerate()
            .filter_map(move |(line_no, line)| {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => return Some(Err(e.into())),
                };
                if line.trim().is_empty() {
                    return None;
                }
                Some(serde_json::from_str::<ChunkDto>(&line).with_context(|| {
                    format!("invalid chunk record at {}:{}", path.display(), line_no + 1)
                }))
            }))
    }

    /// Read the whole store into memory.
    pub fn read_all(&self) -> Result<Vec<ChunkDto>> {
        self.iter()?.collect()
    }

    pub fn count(&self) -> Result<usize> {
        let mut n = 0;
        for chunk in self.iter()? {
            chunk?;
            n += 1;
        }
        Ok(n)
    }
}

/// Where `store_document` wrote its artifacts.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub document_path: PathBuf,
    pub chunks_path: PathBuf,
    pub chunks_written: usize,
}

/// Persist a document under `out_dir`:
/// - metadata (chunks elided) at `documents/{document_id}.json`
/// - chunks at `chunks/{document_id}.jsonl`
pub fn store_document(doc: &DocumentDto, out_dir: &Path) -> Result<StoredDocument> {
    let documents_dir = out_dir.join("documents");
    std::fs::create_dir_all(&documents_dir)
        .with_context(|| format!("failed to create {}", documents_dir.display()))?;

    let mut meta = doc.clone();
    let chunks = std::mem::take(&mut meta.chunks);

    let document_path = documents_dir.join(format!("{}.json", doc.document_id));
    let json = serde_json::to_string_pretty(&meta)?;
    std::fs::write(&document_path, json)
        .with_context(|| format!("failed to write {}", document_path.display()))?;

    let chunks_path = out_dir
        .join("chunks")
        .join(format!("{}.jsonl", doc.document_id));
    let store = ChunkStore::new(&chunks_path);
    let chunks_written = store.append_many(&chunks)?;

    Ok(StoredDocument {
        document_path,
        chunks_path,
        chunks_written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{document_from_text, LoaderOptions};
    use tempfile::tempdir;

    fn sample_doc() -> DocumentDto {
        let options = LoaderOptions {
            chunk_size: 16,
            overlap: 0,
        };
        document_from_text(
            "sample.txt",
            "first chunk body second chunk body",
            None,
            &options,
        )
    }

    #[test]
    fn append_iter_count_roundtrip() {
        let dir = tempdir().expect("tempdir");
        let store = ChunkStore::new(dir.path().join("chunks.jsonl"));
        let doc = sample_doc();

        store.append_many(&doc.chunks).expect("append");
        assert_eq!(store.count().expect("count"), doc.chunks.len());

        let read = store.read_all().expect("read");
        assert_eq!(read, doc.chunks);
    }

    #[test]
    fn append_preserves_existing_content() {
        let dir = tempdir().expect("tempdir");
        let store = ChunkStore::new(dir.path().join("chunks.jsonl"));
        let doc = sample_doc();

        store.append_many(&doc.chunks[..1]).expect("first append");
        store.append_many(&doc.chunks[1..]).expect("second append");

        let read = store.read_all().expect("read");
        assert_eq!(read, doc.chunks);
    }

    #[test]
    fn iter_is_restartable() {
        let dir = tempdir().expect("tempdir");
        let store = ChunkStore::new(dir.path().join("chunks.jsonl"));
        store.append_many(&sample_doc().chunks).expect("append");

        let first: Vec<String> = store
            .iter()
            .expect("iter")
            .map(|c| c.expect("chunk").chunk_id)
            .collect();
        let second: Vec<String> = store
            .iter()
            .expect("iter")
            .map(|c| c.expect("chunk").chunk_id)
            .collect();
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn store_document_writes_meta_and_chunks() {
        let dir = tempdir().expect("tempdir");
        let doc = sample_doc();

        let stored = store_document(&doc, dir.path()).expect("store");
        assert_eq!(stored.chunks_written, doc.chunks.len());

        let meta: DocumentDto = serde_json::from_str(
            &std::fs::read_to_string(&stored.document_path).expect("read meta"),
        )
        .expect("parse meta");
        assert_eq!(meta.document_id, doc.document_id);
        assert!(meta.chunks.is_empty());

        let store = ChunkStore::new(&stored.chunks_path);
        assert_eq!(store.count().expect("count"), doc.chunks.len());
    }
}
