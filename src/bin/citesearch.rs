use anyhow::Result;
use clap::Parser;
use paperkg::db::Db;
use paperkg::gateways::{OpenAiEmbedder, OpenAiExtractor};
use paperkg::retrieval::citation_search;
use paperkg::Config;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "citesearch")]
#[command(about = "Find citable passages with paper provenance for a query")]
struct Args {
    /// Free-text search query
    query: String,

    /// Number of results; defaults to the configured citation_k
    #[arg(short, long)]
    k: Option<usize>,

    /// Emit results as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    if args.query.trim().is_empty() {
        anyhow::bail!("Query cannot be empty");
    }

    let config = Config::load()?;
    let db = Db::new(config.db_path());

    let embed_key = std::env::var(&config.embeddings.api_key_env)?;
    let embedder = OpenAiEmbedder::new(embed_key, config.embeddings.model.clone(), None);

    let extract_key = std::env::var(&config.extraction.api_key_env)?;
    let extractor = OpenAiExtractor::new(extract_key, config.extraction.model.clone());

    let k = args.k.unwrap_or(config.retrieval.citation_k);

    let start = Instant::now();
    let results = citation_search(&db, &embedder, &extractor, &args.query, k, &config.retrieval)
        .await?;
    let elapsed = start.elapsed();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    println!("Query: {}", args.query);
    println!("({} results in {:.0}ms)\n", results.len(), elapsed.as_millis());
    for (i, hit) in results.iter().enumerate() {
        println!("{}. {} ({}, {})", i + 1, hit.paper_title, hit.paper_venue, hit.paper_year);
        println!("   Authors: {}", hit.paper_authors);
        println!("   Score: {:.4}", hit.relevance_score);
        println!("   Passage: {}", hit.paragraph_text);
        if !hit.context_summary.is_empty() {
            println!("   Context: {}", hit.context_summary);
        }
        println!();
    }

    Ok(())
}
