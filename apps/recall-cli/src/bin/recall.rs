//! recall CLI
//!
//! Build the vector index for a corpus, query it, and inspect what is on disk.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use recall_cli::{init_tracing, load_corpus, load_settings, progress_bar};
use recall_core::RetrievalRequest;
use recall_embed::get_default_embedder;
use recall_hybrid::{build_summarizer, NoopSummarizer, RetrievalService};
use recall_vector::VectorIndex;

#[derive(Parser)]
#[command(name = "recall")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Personal knowledge retrieval over pre-extracted documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed the corpus and write the vector index
    Index {
        /// Directory of .txt documents (defaults to data.corpus_dir)
        data_dir: Option<PathBuf>,
        /// JSON array of document records instead of a directory
        #[arg(long)]
        corpus_json: Option<PathBuf>,
    },

    /// Retrieve a budgeted context block for a query
    Query {
        query: String,
        /// Character budget for the assembled context
        #[arg(long)]
        max_chars: Option<usize>,
        /// Run the summarization pass
        #[arg(long)]
        use_summary: bool,
        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        corpus_json: Option<PathBuf>,
    },

    /// Show metadata of the persisted index
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let base = std::env::current_dir()?;
    let settings = load_settings(&base)?;
    let index_dir = settings.data.index_dir(&base);

    match cli.command {
        Commands::Index { data_dir, corpus_json } => {
            let corpus = load_corpus(&settings, &base, data_dir, corpus_json)?;
            let embedder = get_default_embedder(&settings.embedding)?;
            let service = RetrievalService::new(settings, embedder, Arc::new(NoopSummarizer));
            let pb = progress_bar();
            service.rebuild(corpus, Some(&pb)).await?;
            pb.finish_with_message("embedded");
            service.save_index(&index_dir)?;

            let status = service.status();
            println!("Indexed {} of {} documents into {}", status.vector_indexed, status.documents, index_dir.display());
            if status.vector_skipped > 0 {
                println!("Skipped {} documents too short to embed (still searchable lexically)", status.vector_skipped);
            }
        }
        Commands::Query { query, max_chars, use_summary, json, data_dir, corpus_json } => {
            let corpus = load_corpus(&settings, &base, data_dir, corpus_json)?;
            let embedder = get_default_embedder(&settings.embedding)?;
            let summarizer = build_summarizer(&settings.summary)?;
            let service = RetrievalService::new(settings, embedder, summarizer);
            service
                .load_index(corpus, &index_dir)
                .with_context(|| format!("loading index from {} (run `recall index` first)", index_dir.display()))?;

            let mut request = RetrievalRequest::new(query).with_summary(use_summary);
            if let Some(n) = max_chars { request = request.with_max_chars(n); }
            let resp = service.retrieve(request).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&resp)?);
            } else {
                println!("{}", resp.message);
                println!("keywords: {}", resp.keywords_used.join(", "));
                println!("sources: {}", resp.sources.join(", "));
                println!();
                println!("{}", resp.context);
            }
        }
        Commands::Status => {
            let index = VectorIndex::load(&index_dir)
                .with_context(|| format!("no usable index in {}", index_dir.display()))?;
            println!("index dir:   {}", index_dir.display());
            println!("embedder:    {}", index.embedder_id());
            println!("dimension:   {}", index.dim());
            println!("documents:   {}", index.len());
            println!("skipped:     {}", index.skipped().len());
            println!("built at:    {}", index.built_at().to_rfc3339());
        }
    }
    Ok(())
}
