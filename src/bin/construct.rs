use anyhow::Result;
use clap::Parser;
use paperkg::construct::construct_document;
use paperkg::db::{migrate, Db};
use paperkg::gateways::{OpenAiEmbedder, OpenAiExtractor};
use paperkg::Config;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "construct")]
#[command(about = "Build knowledge graphs from research paper text files")]
struct Args {
    /// Paper text files (markdown or plain text) to process
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Document id override; defaults to the file stem. Only valid with a
    /// single input file.
    #[arg(long)]
    document_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "info")).init();

    let args = Args::parse();
    if args.document_id.is_some() && args.files.len() > 1 {
        anyhow::bail!("--document_id requires exactly one input file");
    }

    let config = Config::load()?;
    log::info!("Configuration loaded successfully");
    log::info!("Database path: {}", config.db_path().display());

    let db = Db::new(config.db_path());

    let migrations_dir = Path::new("migrations");
    db.with_connection(|conn| migrate::run_migrations(conn, migrations_dir))
        .await?;
    log::info!("Database initialized");

    let embedder = build_embedder(&config)?;
    let extractor = build_extractor(&config)?;

    let mut failures = 0;
    for file in &args.files {
        let document_id = match &args.document_id {
            Some(id) => id.clone(),
            None => file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string()),
        };
        let text = std::fs::read_to_string(file)?;

        log::info!("Constructing graph for '{}' ({})", document_id, file.display());
        let start = Instant::now();
        match construct_document(
            &db,
            &embedder,
            &extractor,
            &config.extraction,
            &document_id,
            &text,
        )
        .await
        {
            Ok(report) => {
                println!(
                    "{}: {} sections, {} paragraphs, {} entities, {} citations \
                     ({} resolved references), {} skips in {:.1}s",
                    report.document_id,
                    report.sections_created,
                    report.paragraphs_created,
                    report.entities_created,
                    report.citations_created,
                    report.references_resolved,
                    report.skips.len(),
                    start.elapsed().as_secs_f64()
                );
                for skip in &report.skips {
                    println!("  skipped ({:?}) {}: {}", skip.round, skip.item, skip.reason);
                }
            }
            Err(e) => {
                log::error!("Construction failed for '{}': {}", document_id, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} documents failed", failures, args.files.len());
    }
    Ok(())
}

/// Build a configured embedder with an optional LRU embedding cache.
fn build_embedder(config: &Config) -> Result<OpenAiEmbedder> {
    let api_key = std::env::var(&config.embeddings.api_key_env).map_err(|_| {
        anyhow::anyhow!(
            "Environment variable {} not set. Set it in your .env file or as an environment variable.",
            config.embeddings.api_key_env
        )
    })?;

    let cache = if config.embeddings.cache_capacity > 0 {
        Some(Arc::new(paperkg::cache::EmbeddingCache::new(
            config.embeddings.cache_capacity,
        )))
    } else {
        None
    };

    Ok(OpenAiEmbedder::new(
        api_key,
        config.embeddings.model.clone(),
        cache,
    ))
}

fn build_extractor(config: &Config) -> Result<OpenAiExtractor> {
    let api_key = std::env::var(&config.extraction.api_key_env).map_err(|_| {
        anyhow::anyhow!(
            "Environment variable {} not set. Set it in your .env file or as an environment variable.",
            config.extraction.api_key_env
        )
    })?;
    Ok(OpenAiExtractor::new(
        api_key,
        config.extraction.model.clone(),
    ))
}
