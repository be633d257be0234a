//! Offline end-to-end pipeline: markdown → DTOs → (simulated per-chunk
//! proposals) → aggregation → schema card merge → ontology TTL → instance
//! materialization. The LLM transport is the only piece not exercised; the
//! JSON here is exactly what the adapter hands to the boundary parsers.

use chrono::{TimeZone, Utc};
use ontorag_dto::loader::document_from_markdown;
use ontorag_dto::{store_document, ChunkStore};
use ontorag_rdf::materialize_instances;
use ontorag_schema::{
    aggregate_chunk_proposals, merge_card_at, schema_card_to_ttl, ChunkInstancesV1,
    ChunkProposalV1, DatatypeRange, SchemaCard,
};
use serde_json::json;
use tempfile::tempdir;

#[test]
fn markdown_to_schema_card_to_instance_ttl() {
    // Ingest + persist + re-read through the chunk store.
    let md = "# People\n\nAlice is a person. Her email is a@b.c.\n";
    let doc = document_from_markdown("people.md", md, None);
    let dir = tempdir().expect("tempdir");
    let stored = store_document(&doc, dir.path()).expect("store");
    let chunks = ChunkStore::new(&stored.chunks_path)
        .read_all()
        .expect("read chunks");
    assert_eq!(chunks.len(), 1);
    let chunk_id = chunks[0].chunk_id.clone();

    // Schema pass output for the single chunk, as parsed at the boundary.
    let proposal = ChunkProposalV1::from_json_value(json!({
        "chunk_id": chunk_id,
        "proposed_additions": {
            "classes": [{
                "name": "Person",
                "description": "A human",
                "evidence": [{ "chunk_id": chunk_id, "quote": "Alice is a person" }]
            }],
            "datatype_properties": [{
                "name": "email",
                "domain": "Person",
                "range": "str",
                "description": "Email address"
            }]
        }
    }))
    .expect("parse chunk proposal");

    let doc_proposal = aggregate_chunk_proposals(&[proposal]);
    assert_eq!(doc_proposal.chunks_aggregated, 1);

    // Deterministic merge into an empty card.
    let ts = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
    let card = merge_card_at(&SchemaCard::default(), &doc_proposal, ts);
    assert_eq!(card.find_class("Person").unwrap().origin, "induced");
    assert_eq!(
        card.find_datatype_property("email").unwrap().range,
        DatatypeRange::String
    );
    assert!(card.warnings.is_empty(), "{:?}", card.warnings);

    // Ontology TTL.
    let ontology_ttl = schema_card_to_ttl(&card);
    assert!(ontology_ttl.contains("ns:Person a owl:Class ;"));
    assert!(ontology_ttl.contains("ns:email a owl:DatatypeProperty ;"));

    // Instance pass output, materialized with PROV mentions.
    let chunk_instances = ChunkInstancesV1::from_json_value(json!({
        "chunk_id": chunk_id,
        "instances": [{
            "local_id": "p1",
            "class": "Person",
            "datatype_values": { "email": "a@b.c" },
            "object_values": {},
            "evidence": [{ "chunk_id": chunk_id, "quote": "Her email is a@b.c" }]
        }]
    }))
    .expect("parse instance proposal");

    let materialized = materialize_instances(&card, &chunk_instances.instances);
    assert!(materialized.warnings.is_empty(), "{:?}", materialized.warnings);
    assert!(materialized
        .ttl
        .contains("<http://ontorag.local/ns/Person/p1> a ns:Person ;"));
    assert!(materialized.ttl.contains("ns:email \"a@b.c\"^^xsd:string"));
    assert!(materialized
        .ttl
        .contains(&format!("prov:wasDerivedFrom <chunk:{chunk_id}>")));
    assert!(materialized.ttl.contains("prov:value \"Her email is a@b.c\""));
    assert_eq!(materialized.summary.mentions_emitted, 1);
}

#[test]
fn rerunning_the_offline_pipeline_is_reproducible() {
    let md = "# Notes\n\nWidgets are made by factories.\n";
    let build = || {
        let doc = document_from_markdown("notes.md", md, None);
        let proposal = ChunkProposalV1::from_json_value(json!({
            "chunk_id": doc.chunks[0].chunk_id,
            "proposed_additions": {
                "classes": [
                    { "name": "Widget", "description": "A manufactured thing" },
                    { "name": "Factory", "description": "A production site" }
                ],
                "object_properties": [{
                    "name": "madeBy", "domain": "Widget", "range": "Factory"
                }]
            }
        }))
        .expect("parse");
        let doc_proposal = aggregate_chunk_proposals(&[proposal]);
        let ts = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        merge_card_at(&SchemaCard::default(), &doc_proposal, ts)
            .to_canonical_json()
            .expect("render")
    };
    assert_eq!(build(), build());
}
