use crate::error::{PaperkgError, Result};
use rusqlite::{params, Connection};
use std::fs;
use std::path::Path;

/// Migration metadata
struct Migration {
    version: u32,
    name: String,
    sql: String,
}

/// Create schema_migrations table if it doesn't exist
fn ensure_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Get list of applied migrations
pub fn get_applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM schema_migrations ORDER BY version")?;
    let names: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
        .map_err(PaperkgError::Database)?;
    Ok(names)
}

/// Load migration files from migrations directory.
/// Filenames encode the version: "001_graph_tables.sql" -> 1.
fn load_migrations(migrations_dir: &Path) -> Result<Vec<Migration>> {
    let mut migrations = Vec::new();

    let entries = fs::read_dir(migrations_dir).map_err(PaperkgError::Io)?;

    let mut files: Vec<_> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("sql"))
        .collect();

    files.sort_by_key(|e| e.file_name());

    for entry in files {
        let path = entry.path();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PaperkgError::Config("Invalid migration filename".to_string()))?;

        let version_str = filename.split('_').next().ok_or_else(|| {
            PaperkgError::Config(format!("Invalid migration filename: {}", filename))
        })?;
        let version: u32 = version_str.parse().map_err(|_| {
            PaperkgError::Config(format!("Invalid migration version: {}", version_str))
        })?;

        let sql = fs::read_to_string(&path).map_err(PaperkgError::Io)?;
        let name = filename.trim_end_matches(".sql").to_string();

        migrations.push(Migration { version, name, sql });
    }

    migrations.sort_by_key(|m| m.version);

    Ok(migrations)
}

/// Run all pending migrations
pub fn run_migrations(conn: &mut Connection, migrations_dir: &Path) -> Result<()> {
    ensure_migrations_table(conn)?;

    let applied = get_applied_migrations(conn)?;
    let migrations = load_migrations(migrations_dir)?;

    for migration in migrations {
        if applied.contains(&migration.name) {
            log::debug!("Migration {} already applied, skipping", migration.name);
            continue;
        }

        log::info!(
            "Applying migration: {} (version {})",
            migration.name,
            migration.version
        );

        let tx = conn.transaction()?;

        // execute_batch handles multi-statement migration files
        tx.execute_batch(&migration.sql).map_err(|e| {
            PaperkgError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                Some(format!(
                    "Failed to execute migration {}: {}",
                    migration.name, e
                )),
            ))
        })?;

        tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;

        tx.commit()?;

        log::info!("Migration {} applied successfully", migration.name);
    }

    log::info!("All migrations completed");
    Ok(())
}
