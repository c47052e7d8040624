use anyhow::Result;
use paperkg::db::{migrate, Db};
use paperkg::Config;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger from environment variable or default to info level
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "info")).init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("verify");

    match command {
        "migrate" => {
            run_migrations_only().await?;
        }
        "verify" | _ => {
            // Default: migrate then verify database schema
            run_schema_verification().await?;
        }
    }

    Ok(())
}

async fn run_migrations_only() -> Result<()> {
    let config = Config::load()?;
    let db = Db::new(config.db_path());

    let migrations_dir = Path::new("migrations");
    db.with_connection(|conn| migrate::run_migrations(conn, migrations_dir))
        .await?;

    log::info!("Migrations applied");
    Ok(())
}

async fn run_schema_verification() -> Result<()> {
    log::info!("Starting Paperkg v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    log::info!("Configuration loaded successfully");
    log::info!("Database path: {}", config.db_path().display());
    log::info!("Embedding model: {}", config.embeddings.model);
    log::info!("Extraction model: {}", config.extraction.model);

    let db = Db::new(config.db_path());

    let migrations_dir = Path::new("migrations");
    db.with_connection(|conn| migrate::run_migrations(conn, migrations_dir))
        .await?;

    log::info!("Database initialized successfully");

    verify_database_schema(&db).await?;

    log::info!("Schema verified; ready for document construction");

    Ok(())
}

/// Verify that all expected database objects exist
async fn verify_database_schema(db: &Db) -> Result<()> {
    use paperkg::error::PaperkgError;

    db.with_connection(|conn| {
        let mut stmt =
            conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        let expected_tables = ["entities", "relationships", "schema_migrations"];
        let mut all_tables_exist = true;

        for table in &expected_tables {
            if !tables.iter().any(|t| t == table) {
                log::error!("Missing table: {}", table);
                all_tables_exist = false;
            } else {
                log::debug!("✓ Table exists: {}", table);
            }
        }

        if !all_tables_exist {
            return Err(PaperkgError::Config(
                "Not all required tables exist".to_string(),
            ));
        }

        let mut stmt =
            conn.prepare("SELECT name FROM sqlite_master WHERE type='index' ORDER BY name")?;
        let indexes: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        let expected_indexes = [
            "idx_entities_type",
            "idx_entities_source_doc",
            "idx_relationships_source",
            "idx_relationships_target",
        ];
        let mut all_indexes_exist = true;

        for index in &expected_indexes {
            if !indexes.iter().any(|i| i == index) {
                log::error!("Missing index: {}", index);
                all_indexes_exist = false;
            } else {
                log::debug!("✓ Index exists: {}", index);
            }
        }

        if !all_indexes_exist {
            return Err(PaperkgError::Config(
                "Not all required indexes exist".to_string(),
            ));
        }

        let entity_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM entities", [], |row| row.get(0))?;
        let relationship_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM relationships", [], |row| row.get(0))?;
        log::info!(
            "Graph store: {} entities, {} relationships",
            entity_count,
            relationship_count
        );

        Ok(())
    })
    .await?;

    Ok(())
}
