//! Numbered SQL migrations (`migrations/NNN_name.sql`), tracked in `schema_migrations`.

use rusqlite::{params, Connection};
use std::fs;
use std::path::Path;
use crate::error::{Result, GalynError};

/// Tables every fully migrated database must contain
pub const EXPECTED_TABLES: &[&str] = &[
    "accusations",
    "counties",
    "lynchings",
    "relationships",
    "schema_migrations",
    "stories",
    "story_counties",
];

struct Migration {
    version: u32,
    name: String,
    sql: String,
}

impl Migration {
    /// Read `NNN_name.sql`; the numeric prefix is the version.
    fn from_file(path: &Path) -> Result<Self> {
        let name = path
            .file_stem()
            .and_then(|n| n.to_str())
            .ok_or_else(|| GalynError::Config(format!("Invalid migration filename: {}", path.display())))?
            .to_string();
        let version = name
            .split('_')
            .next()
            .and_then(|v| v.parse::<u32>().ok())
            .ok_or_else(|| GalynError::Config(format!("Migration {} has no numeric version prefix", name)))?;
        let sql = fs::read_to_string(path)?;
        Ok(Self { version, name, sql })
    }
}

fn ensure_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );",
    )?;
    Ok(())
}

/// Names of applied migrations, oldest first
pub fn get_applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM schema_migrations ORDER BY version")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(names)
}

fn load_migrations(migrations_dir: &Path) -> Result<Vec<Migration>> {
    let mut migrations = Vec::new();
    for entry in fs::read_dir(migrations_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("sql") {
            migrations.push(Migration::from_file(&path)?);
        }
    }
    migrations.sort_by_key(|m| m.version);

    if let Some(pair) = migrations.windows(2).find(|w| w[0].version == w[1].version) {
        return Err(GalynError::Config(format!(
            "Migrations {} and {} share version {}",
            pair[0].name, pair[1].name, pair[0].version
        )));
    }
    Ok(migrations)
}

/// Apply every migration in `migrations_dir` that has not been applied yet.
/// Each migration runs in its own transaction.
pub fn run_migrations(conn: &mut Connection, migrations_dir: &Path) -> Result<()> {
    ensure_migrations_table(conn)?;
    let applied = get_applied_migrations(conn)?;

    for migration in load_migrations(migrations_dir)? {
        if applied.contains(&migration.name) {
            log::debug!("Migration {} already applied", migration.name);
            continue;
        }

        log::info!("Applying migration {} (version {})", migration.name, migration.version);
        let tx = conn.transaction()?;
        tx.execute_batch(&migration.sql).map_err(|e| {
            GalynError::Config(format!("Migration {} failed: {}", migration.name, e))
        })?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;
        tx.commit()?;
    }

    log::info!("Database schema is up to date");
    Ok(())
}
