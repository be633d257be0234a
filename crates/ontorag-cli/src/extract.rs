//! Per-chunk extraction loops (schema pass and instance pass).
//!
//! The pipeline runs to completion over a finite chunk set. A chunk either
//! contributes a complete parsed proposal or contributes nothing: any
//! failure (HTTP, timeout, JSON after the one retry) drops that chunk with
//! a warning and the loop continues. Nothing partial is ever persisted.
//!
//! Workers default to 1 (sequential). With more, contiguous index ranges
//! go to scoped threads and results are folded back in chunk order, so the
//! aggregated output matches sequential execution.

use crate::llm::LlmClient;
use crate::prompt::{render_prompt, INSTANCE_SYSTEM_PROMPT, SCHEMA_SYSTEM_PROMPT};
use anyhow::Result;
use ontorag_dto::ChunkDto;
use ontorag_schema::{ChunkInstancesV1, ChunkProposalV1, SchemaCard};

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Bounded worker pool size; 1 keeps execution fully sequential.
    pub workers: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self { workers: 1 }
    }
}

/// Results in chunk order plus the warnings for dropped chunks.
pub struct ExtractOutcome<T> {
    pub results: Vec<T>,
    pub warnings: Vec<String>,
}

pub fn extract_schema_proposals(
    client: &LlmClient,
    chunks: &[ChunkDto],
    card: &SchemaCard,
    template: &str,
    options: &ExtractOptions,
) -> Result<ExtractOutcome<ChunkProposalV1>> {
    let card_json = serde_json::to_string(card)?;
    run_chunk_calls(
        client,
        chunks,
        &card_json,
        template,
        SCHEMA_SYSTEM_PROMPT,
        options,
        |value, chunk| {
            let mut proposal = ChunkProposalV1::from_json_value(value)?;
            // The model echoes chunk_id; the DTO is authoritative.
            proposal.chunk_id = chunk.chunk_id.clone();
            Ok(proposal)
        },
    )
}

pub fn extract_instance_proposals(
    client: &LlmClient,
    chunks: &[ChunkDto],
    card: &SchemaCard,
    template: &str,
    options: &ExtractOptions,
) -> Result<ExtractOutcome<ChunkInstancesV1>> {
    let card_json = serde_json::to_string(card)?;
    run_chunk_calls(
        client,
        chunks,
        &card_json,
        template,
        INSTANCE_SYSTEM_PROMPT,
        options,
        |value, chunk| {
            let mut instances = ChunkInstancesV1::from_json_value(value)?;
            instances.chunk_id = chunk.chunk_id.clone();
            Ok(instances)
        },
    )
}

fn run_chunk_calls<T, F>(
    client: &LlmClient,
    chunks: &[ChunkDto],
    card_json: &str,
    template: &str,
    system: &str,
    options: &ExtractOptions,
    parse: F,
) -> Result<ExtractOutcome<T>>
where
    T: Send,
    F: Fn(serde_json::Value, &ChunkDto) -> Result<T> + Sync,
{
    if chunks.is_empty() {
        return Ok(ExtractOutcome {
            results: Vec::new(),
            warnings: Vec::new(),
        });
    }

    let workers = options.workers.max(1).min(chunks.len());

    let outcomes: Vec<Result<T>> = if workers <= 1 {
        run_slice(client, chunks, card_json, template, system, &parse)
    } else {
        let per_worker = chunks.len().div_ceil(workers);
        let mut collected: Vec<Vec<Result<T>>> = Vec::with_capacity(workers);
        std::thread::scope(|scope| {
            let mut handles = Vec::new();
            for slice in chunks.chunks(per_worker) {
                let parse = &parse;
                handles.push(scope.spawn(move || {
                    run_slice(client, slice, card_json, template, system, parse)
                }));
            }
            for handle in handles {
                collected.push(handle.join().expect("extraction worker panicked"));
            }
        });
        collected.into_iter().flatten().collect()
    };

    let mut results = Vec::new();
    let mut warnings = Vec::new();
    for (chunk, outcome) in chunks.iter().zip(outcomes) {
        match outcome {
            Ok(value) => results.push(value),
            Err(e) => warnings.push(format!("chunk {}: {e:#}", chunk.chunk_id)),
        }
    }
    Ok(ExtractOutcome { results, warnings })
}

/// Sequential pass over one slice, honoring the inter-call delay between
/// successive calls.
fn run_slice<T, F>(
    client: &LlmClient,
    chunks: &[ChunkDto],
    card_json: &str,
    template: &str,
    system: &str,
    parse: &F,
) -> Vec<Result<T>>
where
    F: Fn(serde_json::Value, &ChunkDto) -> Result<T>,
{
    let mut out = Vec::with_capacity(chunks.len());
    for (i, chunk) in chunks.iter().enumerate() {
        if i > 0 && !client.inter_call_delay().is_zero() {
            std::thread::sleep(client.inter_call_delay());
        }
        out.push(call_one(client, chunk, card_json, template, system, parse));
    }
    out
}

fn call_one<T, F>(
    client: &LlmClient,
    chunk: &ChunkDto,
    card_json: &str,
    template: &str,
    system: &str,
    parse: &F,
) -> Result<T>
where
    F: Fn(serde_json::Value, &ChunkDto) -> Result<T>,
{
    let chunk_json = serde_json::to_string(chunk)?;
    let user = render_prompt(template, &chunk_json, card_json);
    let value = client.chat_strict_json(system, &user)?;
    parse(value, chunk)
}
