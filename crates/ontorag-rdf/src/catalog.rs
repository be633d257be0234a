//! The baseline ontology catalog.
//!
//! A catalog is a directory holding TTL files plus a `catalog.json`
//! manifest mapping id → entry. Registration copies the TTL into the
//! directory as `{id}.ttl` and records the detected (or supplied)
//! namespace; loading parses the TTL back into Schema Card entries with
//! `origin` fixed to the id.

use crate::baseline::{import_baseline_ttl, BaselineImport};
use anyhow::{anyhow, Context, Result};
use ontorag_schema::ttl::is_identifier_name;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CATALOG_MANIFEST: &str = "catalog.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CatalogEntryV1 {
    /// TTL file name, relative to the catalog directory.
    pub path: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub namespace: String,
}

/// A catalog directory with its manifest loaded.
#[derive(Debug, Clone)]
pub struct Catalog {
    dir: PathBuf,
    entries: BTreeMap<String, CatalogEntryV1>,
}

impl Catalog {
    /// Open a catalog directory; a missing manifest means an empty catalog.
    pub fn open(dir: &Path) -> Result<Self> {
        let manifest = dir.join(CATALOG_MANIFEST);
        let entries = if manifest.exists() {
            let json = std::fs::read_to_string(&manifest)
                .with_context(|| format!("failed to read {}", manifest.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("invalid catalog manifest {}", manifest.display()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            dir: dir.to_path_buf(),
            entries,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entries(&self) -> &BTreeMap<String, CatalogEntryV1> {
        &self.entries
    }

    /// Register a baseline: validate + parse the TTL, copy it into the
    /// catalog directory, update the manifest. The namespace is
    /// auto-detected from the declared terms, falling back to the
    /// registration argument when the TTL declares nothing usable.
    pub fn register(
        &mut self,
        id: &str,
        ttl_source: &Path,
        label: &str,
        description: &str,
        tags: Vec<String>,
        namespace: Option<String>,
    ) -> Result<CatalogEntryV1> {
        let id = id.trim();
        if !is_identifier_name(id) {
            return Err(anyhow!(
                "configuration error: catalog id \"{id}\" must be an identifier"
            ));
        }

        let ttl = std::fs::read_to_string(ttl_source)
            .with_context(|| format!("failed to read {}", ttl_source.display()))?;
        let import = import_baseline_ttl(&ttl, id)
            .with_context(|| format!("failed to parse {}", ttl_source.display()))?;

        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        let file_name = format!("{id}.ttl");
        let target = self.dir.join(&file_name);
        std::fs::write(&target, &ttl)
            .with_context(|| format!("failed to write {}", target.display()))?;

        let entry = CatalogEntryV1 {
            path: file_name,
            label: label.to_string(),
            description: description.to_string(),
            tags,
            namespace: import
                .namespace
                .or_else(|| namespace.filter(|ns| !ns.trim().is_empty()))
                .unwrap_or_default(),
        };
        self.entries.insert(id.to_string(), entry.clone());
        self.save()?;
        Ok(entry)
    }

    /// Parse a registered baseline into Schema Card entries tagged with
    /// `origin = id`.
    pub fn load_baseline(&self, id: &str) -> Result<BaselineImport> {
        let entry = self
            .entries
            .get(id)
            .ok_or_else(|| anyhow!("unknown baseline \"{id}\" (not in catalog)"))?;
        let path = self.dir.join(&entry.path);
        let ttl = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        import_baseline_ttl(&ttl, id)
    }

    fn save(&self) -> Result<()> {
        let manifest = self.dir.join(CATALOG_MANIFEST);
        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&manifest, json + "\n")
            .with_context(|| format!("failed to write {}", manifest.display()))?;
        Ok(())
    }
}
