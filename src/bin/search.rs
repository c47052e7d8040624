use paperkg::db::Db;
use paperkg::gateways::OpenAiEmbedder;
use paperkg::retrieval::search_and_explain;
use paperkg::Config;
use std::time::Instant;

/// Parse CLI args: first positional is the query.
fn parse_search_args() -> anyhow::Result<String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let query = args
        .into_iter()
        .find(|arg| !arg.starts_with("--"))
        .ok_or_else(|| {
            anyhow::anyhow!("Usage: search <query>\nExample: search \"attention mechanisms\"")
        })?;
    if query.trim().is_empty() {
        anyhow::bail!("Query cannot be empty");
    }
    Ok(query)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = Config::load()?;
    let db = Db::new(config.db_path());

    // API key from environment (loaded by config via dotenv)
    let api_key = std::env::var(&config.embeddings.api_key_env)?;
    let embedder = OpenAiEmbedder::new(api_key, config.embeddings.model.clone(), None);

    let query = parse_search_args()?;

    let start = Instant::now();
    let sentences = search_and_explain(&db, &embedder, &query, &config.retrieval).await?;
    let elapsed = start.elapsed();

    println!("Query: {}", query);
    println!("({} results in {:.0}ms)\n", sentences.len(), elapsed.as_millis());
    for sentence in &sentences {
        println!("{}", sentence);
    }

    Ok(())
}
