use anyhow::{Context, Result};
use clap::Parser;

use recall_cli::{init_tracing, load_settings};
use recall_embed::get_default_embedder;
use recall_vector::VectorIndex;

/// Run the vector leg alone against the persisted index.
#[derive(Parser)]
#[command(name = "recall-vector-search")]
struct Args {
    query: String,
    #[arg(long, default_value = "10")]
    limit: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let base = std::env::current_dir()?;
    let settings = load_settings(&base)?;
    let index_dir = settings.data.index_dir(&base);

    let embedder = get_default_embedder(&settings.embedding)?;
    let index = VectorIndex::load_for(&index_dir, embedder.dim(), embedder.embedder_id())
        .with_context(|| format!("loading index from {}", index_dir.display()))?;

    println!("Query: {}", args.query);
    println!("Index: {} ({} documents, dim {})", index_dir.display(), index.len(), index.dim());
    let results = index.search(&args.query, args.limit, embedder.as_ref()).await?;
    println!("\nFound {} results for: \"{}\"", results.len(), args.query);
    for r in &results {
        let file_name = r.metadata.get("file_name").map(String::as_str).unwrap_or("-");
        println!("\n  {}. score={:.4}  id={}  file={}", r.rank, r.score, r.doc_id, file_name);
        println!("     {}", r.text.replace('\n', " "));
    }
    Ok(())
}
