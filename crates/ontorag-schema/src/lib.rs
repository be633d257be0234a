//! Ontology governance for OntoRAG
//!
//! The LLM *proposes*, deterministic code *decides*:
//!
//! - [`proposal`] — typed wire records for per-chunk LLM output
//! - [`aggregate`] — fold per-chunk proposals into one document proposal
//! - [`card`] — the Schema Card, the canonical versioned ontology artifact
//! - [`merge`] — deterministic, origin-preserving fold of a proposal into a
//!   prior Schema Card
//! - [`ttl`] — OWL/RDFS Turtle rendering of a Schema Card
//!
//! Proposals are deliberately untrusted inputs. Nothing in this crate talks
//! to the network or reads ambient state; every function is a value-in,
//! value-out transformation so merge output is reproducible byte-for-byte.

pub mod aggregate;
pub mod card;
pub mod merge;
pub mod proposal;
pub mod ttl;

pub use aggregate::aggregate_chunk_proposals;
pub use card::{
    name_key, AliasEntry, ClassEntry, DatatypePropertyEntry, DatatypeRange, EventEntry,
    ObjectPropertyEntry, SchemaCard, DEFAULT_NAMESPACE, ORIGIN_INDUCED,
};
pub use merge::{merge_card, merge_card_at};
pub use proposal::{
    AliasSuggestionV1, ChunkInstancesV1, ChunkProposalV1, DocumentProposalV1, EvidenceRef,
    InstanceProposalV1, LiteralValue, ProposedAdditionsV1, ProposedClassV1,
    ProposedDatatypePropertyV1, ProposedEventV1, ProposedObjectPropertyV1, ReuseHintV1,
};
pub use ttl::schema_card_to_ttl;
