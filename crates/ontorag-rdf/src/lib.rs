//! RDF boundary for OntoRAG.
//!
//! - [`baseline`] — parse registered OWL/RDFS Turtle into Schema Card
//!   entries with a fixed origin (untrusted input, typed output)
//! - [`catalog`] — the baseline catalog directory and its manifest
//! - [`instances`] — materialize LLM instance proposals into Turtle with
//!   PROV mention nodes
//!
//! Parsing uses Sophia; everything emitted back out is canonical Turtle
//! built with deterministic ordering so repeated runs are byte-identical.

pub mod baseline;
pub mod catalog;
pub mod instances;

pub use baseline::{import_baseline_ttl, BaselineImport};
pub use catalog::{Catalog, CatalogEntryV1, CATALOG_MANIFEST};
pub use instances::{materialize_instances, MaterializeSummary, MaterializedInstances};
