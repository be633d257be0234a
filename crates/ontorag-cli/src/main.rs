//! OntoRAG CLI
//!
//! Unified command-line interface for:
//! - Ingesting documents into DTO + chunk stores
//! - Running LLM ontology induction over chunks (schema pass)
//! - Deterministically merging proposals into Schema Cards
//! - Registering/importing baseline ontologies from the catalog
//! - Materializing instance proposals into Turtle with PROV mentions

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

mod extract;
mod llm;
mod prompt;

use extract::{extract_instance_proposals, extract_schema_proposals, ExtractOptions};
use llm::{LlmClient, LlmConfig};
use ontorag_dto::{load_document, store_document, ChunkStore, LoaderOptions};
use ontorag_rdf::{materialize_instances, Catalog};
use ontorag_schema::{
    aggregate_chunk_proposals, merge_card, schema_card_to_ttl, ChunkInstancesV1,
    DocumentProposalV1, InstanceProposalV1, SchemaCard,
};
use prompt::{load_template, DEFAULT_INSTANCE_PROMPT, DEFAULT_SCHEMA_PROMPT};

#[derive(Parser)]
#[command(name = "ontorag")]
#[command(
    version,
    about = "OntoRAG: document ingestion, ontology induction, schema cards, RDF export"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a text/markdown file into DocumentDTO + chunk JSONL
    Ingest {
        /// Input file
        input: PathBuf,
        /// Output folder for the DTO store
        #[arg(short, long, default_value = "./data/dto")]
        out: PathBuf,
        /// Optional MIME type override
        #[arg(long)]
        mime: Option<String>,
        /// Plain-text window size, in characters
        #[arg(long, default_value_t = 3000)]
        chunk_size: usize,
        /// Plain-text window overlap, in characters
        #[arg(long, default_value_t = 200)]
        overlap: usize,
    },

    /// Run ontology induction on chunks (LLM) and write the aggregated
    /// document proposal
    ExtractSchema {
        /// Chunks JSONL (ChunkDTO records)
        #[arg(long)]
        chunks: PathBuf,
        /// Current schema card JSON
        #[arg(long)]
        card: PathBuf,
        /// Output path for the aggregated proposal JSON
        #[arg(short, long)]
        out: PathBuf,
        /// Prompt template override (must contain both placeholders)
        #[arg(long)]
        prompt: Option<PathBuf>,
        /// Worker pool size (1 = sequential)
        #[arg(long, default_value_t = 1)]
        workers: usize,
    },

    /// Deterministically merge a prior schema card with a document proposal
    BuildSchemaCard {
        /// Previous schema card JSON
        #[arg(long)]
        previous: PathBuf,
        /// Aggregated proposal JSON
        #[arg(long)]
        proposal: PathBuf,
        /// Output path for the next schema card
        #[arg(short, long)]
        out: PathBuf,
        /// Override the namespace on the output card
        #[arg(long)]
        namespace: Option<String>,
    },

    /// Export a schema card as OWL/RDFS Turtle
    ExportSchemaTtl {
        /// Schema card JSON
        #[arg(long)]
        card: PathBuf,
        /// Output TTL path
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Run instance extraction on chunks (LLM) and materialize Turtle
    ExtractInstances {
        /// Chunks JSONL (ChunkDTO records)
        #[arg(long)]
        chunks: PathBuf,
        /// Schema card JSON
        #[arg(long)]
        card: PathBuf,
        /// Output TTL for instances
        #[arg(long)]
        out_ttl: PathBuf,
        /// Also save the raw per-chunk instance proposals
        #[arg(long)]
        out_proposals: Option<PathBuf>,
        /// Prompt template override (must contain both placeholders)
        #[arg(long)]
        prompt: Option<PathBuf>,
        /// Worker pool size (1 = sequential)
        #[arg(long, default_value_t = 1)]
        workers: usize,
    },

    /// Materialize instance Turtle from saved instance proposals (offline)
    MaterializeInstances {
        /// Per-chunk instance proposals JSON
        #[arg(long)]
        proposals: PathBuf,
        /// Schema card JSON
        #[arg(long)]
        card: PathBuf,
        /// Output TTL path
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Manage the baseline ontology catalog
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },

    /// Merge a registered baseline ontology into a schema card
    ImportBaseline {
        /// Catalog directory
        #[arg(long)]
        dir: PathBuf,
        /// Baseline id (e.g. foaf)
        #[arg(long)]
        id: String,
        /// Schema card JSON to merge into
        #[arg(long)]
        card: PathBuf,
        /// Output path for the merged card
        #[arg(short, long)]
        out: PathBuf,
    },
}

#[derive(Subcommand)]
enum CatalogCommands {
    /// Register a TTL baseline and update the manifest
    Register {
        /// Catalog directory
        #[arg(long)]
        dir: PathBuf,
        /// Baseline id (identifier, e.g. foaf)
        #[arg(long)]
        id: String,
        /// Source TTL file
        #[arg(long)]
        ttl: PathBuf,
        #[arg(long, default_value = "")]
        label: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        /// Namespace override (auto-detected when omitted)
        #[arg(long)]
        namespace: Option<String>,
    },
    /// List registered baselines
    List {
        /// Catalog directory
        #[arg(long)]
        dir: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Ingest {
            input,
            out,
            mime,
            chunk_size,
            overlap,
        } => cmd_ingest(&input, &out, mime.as_deref(), chunk_size, overlap),
        Commands::ExtractSchema {
            chunks,
            card,
            out,
            prompt,
            workers,
        } => cmd_extract_schema(&chunks, &card, &out, prompt.as_deref(), workers),
        Commands::BuildSchemaCard {
            previous,
            proposal,
            out,
            namespace,
        } => cmd_build_schema_card(&previous, &proposal, &out, namespace.as_deref()),
        Commands::ExportSchemaTtl { card, out } => cmd_export_schema_ttl(&card, &out),
        Commands::ExtractInstances {
            chunks,
            card,
            out_ttl,
            out_proposals,
            prompt,
            workers,
        } => cmd_extract_instances(
            &chunks,
            &card,
            &out_ttl,
            out_proposals.as_deref(),
            prompt.as_deref(),
            workers,
        ),
        Commands::MaterializeInstances {
            proposals,
            card,
            out,
        } => cmd_materialize_instances(&proposals, &card, &out),
        Commands::Catalog { command } => match command {
            CatalogCommands::Register {
                dir,
                id,
                ttl,
                label,
                description,
                tags,
                namespace,
            } => cmd_catalog_register(&dir, &id, &ttl, &label, &description, tags, namespace),
            CatalogCommands::List { dir } => cmd_catalog_list(&dir),
        },
        Commands::ImportBaseline { dir, id, card, out } => {
            cmd_import_baseline(&dir, &id, &card, &out)
        }
    }
}

// -------------------------
// Helpers
// -------------------------

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("failed to parse {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    write_text(path, &(json + "\n"))
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}

fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        eprintln!("{} {warning}", "warning:".yellow().bold());
    }
}

fn extend_warnings(base: &mut Vec<String>, extra: &[String]) {
    let mut seen: HashSet<String> = base.iter().cloned().collect();
    for w in extra {
        if seen.insert(w.clone()) {
            base.push(w.clone());
        }
    }
}

// -------------------------
// Commands
// -------------------------

fn cmd_ingest(
    input: &Path,
    out: &Path,
    mime: Option<&str>,
    chunk_size: usize,
    overlap: usize,
) -> Result<()> {
    println!("{} document {}", "Ingesting".green().bold(), input.display());

    let options = LoaderOptions {
        chunk_size,
        overlap,
    };
    let doc = load_document(input, mime, &options)?;
    let stored = store_document(&doc, out)?;

    println!("  {} {}", "→".cyan(), stored.document_path.display());
    println!(
        "  {} {} (chunks={})",
        "→".cyan(),
        stored.chunks_path.display(),
        stored.chunks_written
    );
    println!(
        "  {} document_id={}",
        "→".yellow(),
        doc.document_id
    );
    Ok(())
}

fn cmd_extract_schema(
    chunks_path: &Path,
    card_path: &Path,
    out: &Path,
    prompt_path: Option<&Path>,
    workers: usize,
) -> Result<()> {
    let chunks = ChunkStore::new(chunks_path).read_all()?;
    let card: SchemaCard = read_json(card_path)?;
    let template = load_template(prompt_path, DEFAULT_SCHEMA_PROMPT)?;

    println!(
        "{} schema proposals for {} chunks",
        "Extracting".green().bold(),
        chunks.len()
    );

    let client = LlmClient::new(LlmConfig::from_env()?)?;
    let options = ExtractOptions { workers };
    let outcome = extract_schema_proposals(&client, &chunks, &card, &template, &options)?;

    let mut proposal = aggregate_chunk_proposals(&outcome.results);
    extend_warnings(&mut proposal.warnings, &outcome.warnings);

    write_json(out, &proposal)?;
    println!(
        "  {} {} (proposals={}, skipped={})",
        "→".cyan(),
        out.display(),
        outcome.results.len(),
        chunks.len() - outcome.results.len()
    );
    print_warnings(&proposal.warnings);
    Ok(())
}

fn cmd_build_schema_card(
    previous: &Path,
    proposal_path: &Path,
    out: &Path,
    namespace: Option<&str>,
) -> Result<()> {
    let prior: SchemaCard = read_json(previous)?;
    let proposal: DocumentProposalV1 = read_json(proposal_path)?;

    let mut card = merge_card(&prior, &proposal);
    if let Some(namespace) = namespace {
        card.namespace = namespace.to_string();
    }

    write_text(out, &card.to_canonical_json()?)?;
    println!(
        "{} schema card {} (classes={}, datatype={}, object={}, events={})",
        "Merged".green().bold(),
        out.display(),
        card.classes.len(),
        card.datatype_properties.len(),
        card.object_properties.len(),
        card.events.len()
    );

    let new_warnings: Vec<String> = card
        .warnings
        .iter()
        .filter(|w| !prior.warnings.contains(w))
        .cloned()
        .collect();
    print_warnings(&new_warnings);
    Ok(())
}

fn cmd_export_schema_ttl(card_path: &Path, out: &Path) -> Result<()> {
    let card: SchemaCard = read_json(card_path)?;
    write_text(out, &schema_card_to_ttl(&card))?;
    println!("{} ontology TTL {}", "Exported".green().bold(), out.display());
    Ok(())
}

fn cmd_extract_instances(
    chunks_path: &Path,
    card_path: &Path,
    out_ttl: &Path,
    out_proposals: Option<&Path>,
    prompt_path: Option<&Path>,
    workers: usize,
) -> Result<()> {
    let chunks = ChunkStore::new(chunks_path).read_all()?;
    let card: SchemaCard = read_json(card_path)?;
    let template = load_template(prompt_path, DEFAULT_INSTANCE_PROMPT)?;

    println!(
        "{} instances from {} chunks",
        "Extracting".green().bold(),
        chunks.len()
    );

    let client = LlmClient::new(LlmConfig::from_env()?)?;
    let options = ExtractOptions { workers };
    let outcome = extract_instance_proposals(&client, &chunks, &card, &template, &options)?;

    if let Some(out_proposals) = out_proposals {
        write_json(out_proposals, &outcome.results)?;
        println!("  {} {}", "→".cyan(), out_proposals.display());
    }

    let mut warnings = outcome.warnings.clone();
    for chunk_result in &outcome.results {
        extend_warnings(&mut warnings, &chunk_result.warnings);
    }

    let instances: Vec<InstanceProposalV1> = outcome
        .results
        .into_iter()
        .flat_map(|r| r.instances)
        .collect();
    let materialized = materialize_instances(&card, &instances);
    extend_warnings(&mut warnings, &materialized.warnings);

    write_text(out_ttl, &materialized.ttl)?;
    println!(
        "  {} {} (instances={}, mentions={}, skipped={})",
        "→".cyan(),
        out_ttl.display(),
        materialized.summary.instances_emitted,
        materialized.summary.mentions_emitted,
        materialized.summary.instances_skipped
    );
    print_warnings(&warnings);
    Ok(())
}

fn cmd_materialize_instances(proposals_path: &Path, card_path: &Path, out: &Path) -> Result<()> {
    let chunk_results: Vec<ChunkInstancesV1> = read_json(proposals_path)?;
    let card: SchemaCard = read_json(card_path)?;

    let mut warnings = Vec::new();
    for chunk_result in &chunk_results {
        extend_warnings(&mut warnings, &chunk_result.warnings);
    }
    let instances: Vec<InstanceProposalV1> = chunk_results
        .into_iter()
        .flat_map(|r| r.instances)
        .collect();

    let materialized = materialize_instances(&card, &instances);
    extend_warnings(&mut warnings, &materialized.warnings);

    write_text(out, &materialized.ttl)?;
    println!(
        "{} instance TTL {} (instances={}, mentions={})",
        "Materialized".green().bold(),
        out.display(),
        materialized.summary.instances_emitted,
        materialized.summary.mentions_emitted
    );
    print_warnings(&warnings);
    Ok(())
}

fn cmd_catalog_register(
    dir: &Path,
    id: &str,
    ttl: &Path,
    label: &str,
    description: &str,
    tags: Vec<String>,
    namespace: Option<String>,
) -> Result<()> {
    let mut catalog = Catalog::open(dir)?;
    let entry = catalog.register(id, ttl, label, description, tags, namespace)?;
    println!(
        "{} baseline {} (namespace={})",
        "Registered".green().bold(),
        id.bold(),
        if entry.namespace.is_empty() {
            "unknown"
        } else {
            entry.namespace.as_str()
        }
    );
    println!("  {} {}", "→".cyan(), dir.join(&entry.path).display());
    Ok(())
}

fn cmd_catalog_list(dir: &Path) -> Result<()> {
    let catalog = Catalog::open(dir)?;
    if catalog.entries().is_empty() {
        println!("no baselines registered in {}", dir.display());
        return Ok(());
    }
    for (id, entry) in catalog.entries() {
        let label = if entry.label.is_empty() {
            id.clone()
        } else {
            entry.label.clone()
        };
        println!(
            "{}  {}  {}  {}",
            id.bold(),
            label,
            entry.namespace,
            entry.tags.join(",")
        );
    }
    Ok(())
}

fn cmd_import_baseline(dir: &Path, id: &str, card_path: &Path, out: &Path) -> Result<()> {
    let catalog = Catalog::open(dir)?;
    let import = catalog.load_baseline(id)?;
    let prior: SchemaCard = read_json(card_path)?;

    let card = merge_card(&prior, &import.proposal);
    write_text(out, &card.to_canonical_json()?)?;

    let add = &import.proposal.proposed_additions;
    println!(
        "{} baseline {} into {} (classes={}, datatype={}, object={})",
        "Imported".green().bold(),
        id.bold(),
        out.display(),
        add.classes.len(),
        add.datatype_properties.len(),
        add.object_properties.len()
    );
    print_warnings(&import.proposal.warnings);
    Ok(())
}
