//! Deterministic identifiers (versioned).
//!
//! Replay guarantee: every persistent id is a pure function of its inputs,
//! so re-ingesting the same file yields the same document and chunk ids and
//! downstream evidence pointers stay valid across runs.
//!
//! Encoding:
//! - algorithm: SHA-256
//! - output: first 40 lowercase hex digits
//! - composite inputs are joined with `:` so `(index, text)` pairs cannot
//!   collide by concatenation

use sha2::{Digest, Sha256};
use std::path::Path;

/// Width of every persistent id, in hex digits.
pub const ID_HEX_LEN: usize = 40;

fn digest40(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    out.truncate(ID_HEX_LEN);
    out
}

/// Stable document id from the source path bytes.
pub fn document_id(source_path: &str) -> String {
    digest40(source_path.as_bytes())
}

/// Stable chunk id from `document_id`, chunk index, and chunk text.
pub fn chunk_id(document_id: &str, chunk_index: usize, text: &str) -> String {
    let joined = format!("{document_id}:{chunk_index}:{text}");
    digest40(joined.as_bytes())
}

/// Stable digest of a chunk's text alone.
pub fn text_hash(text: &str) -> String {
    digest40(text.as_bytes())
}

/// Full SHA-256 hex digest of a file's raw bytes.
pub fn content_hash_file(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_have_expected_width() {
        assert_eq!(document_id("a/b.md").len(), ID_HEX_LEN);
        assert_eq!(chunk_id("d", 0, "text").len(), ID_HEX_LEN);
        assert_eq!(text_hash("text").len(), ID_HEX_LEN);
    }

    #[test]
    fn ids_are_pure_functions() {
        assert_eq!(document_id("a/b.md"), document_id("a/b.md"));
        assert_eq!(chunk_id("d", 3, "x"), chunk_id("d", 3, "x"));
    }

    #[test]
    fn chunk_id_separates_index_from_text() {
        // "1" + "2foo" must not collide with "12" + "foo".
        assert_ne!(chunk_id("d", 1, "2foo"), chunk_id("d", 12, "foo"));
    }

    #[test]
    fn ids_change_when_any_input_changes() {
        let base = chunk_id("d", 0, "text");
        assert_ne!(base, chunk_id("e", 0, "text"));
        assert_ne!(base, chunk_id("d", 1, "text"));
        assert_ne!(base, chunk_id("d", 0, "other"));
    }
}
