use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use galyn::db::{migrate, Db};
use galyn::events::{load_triplets, triplet_graph};
use galyn::relations::{relationship_graph, RelationFilter};
use galyn::sparql::SparqlStore;
use galyn::web::GalynServer;
use galyn::{Config, GalynError};
use std::path::Path;

#[derive(Parser, Debug)]
#[command(name = "galyn")]
#[command(about = "Relationship graphs, timemaps and word clouds for Georgia lynching records")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply migrations and verify the database schema (default)
    Verify,
    /// Serve the JSON API
    Serve,
    /// Print relationship graph JSON to stdout
    Graph {
        #[arg(long, value_enum, default_value_t = GraphSource::Relationships)]
        source: GraphSource,
        /// Equality filter on a configured field, e.g. --filter subject_gender=M
        #[arg(long = "filter", value_name = "FIELD=VALUE")]
        filters: Vec<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum GraphSource {
    /// Flat relationship records from the database
    Relationships,
    /// Semantic triplets from the SPARQL store
    Triples,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", config.galyn.log_level.as_str())
    ).init();

    match args.command.unwrap_or(Command::Verify) {
        Command::Verify => run_schema_verification(&config).await?,
        Command::Serve => run_http_server(config).await?,
        Command::Graph { source, filters } => print_graph(&config, source, &filters).await?,
    }

    Ok(())
}

/// Open the database and bring its schema up to date
async fn open_db(config: &Config) -> Result<Db> {
    let db = Db::new(config.db_path());
    let migrations_dir = Path::new("migrations");
    db.with_connection(|conn| migrate::run_migrations(conn, migrations_dir)).await?;

    let fields = config.filter_fields();
    db.with_connection(move |conn| fields.verify_columns(conn)).await?;
    Ok(db)
}

async fn run_http_server(config: Config) -> Result<()> {
    log::info!("Starting Galyn HTTP server v{}", env!("CARGO_PKG_VERSION"));
    let db = open_db(&config).await?;
    log::info!("Database initialized: {}", config.db_path().display());

    GalynServer::new(db, config)?.run().await?;
    Ok(())
}

async fn print_graph(config: &Config, source: GraphSource, filters: &[String]) -> Result<()> {
    let data = match source {
        GraphSource::Relationships => {
            let fields = config.filter_fields();
            let mut filter = RelationFilter::none();
            for raw in filters {
                let (field, value) = raw
                    .split_once('=')
                    .ok_or_else(|| anyhow::anyhow!("Filter must look like FIELD=VALUE, got {:?}", raw))?;
                filter = filter.with(&fields, field, value)?;
            }
            let db = open_db(config).await?;
            relationship_graph(&db, &filter).await?
        }
        GraphSource::Triples => {
            if !filters.is_empty() {
                log::warn!("Filters apply to relationship records only; ignoring {} filter(s)", filters.len());
            }
            let store = SparqlStore::from_config(&config.sparql)?;
            triplet_graph(&load_triplets(&store).await?)
        }
    };

    log::info!("Graph has {} nodes and {} links", data.nodes.len(), data.links.len());
    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}

async fn run_schema_verification(config: &Config) -> Result<()> {
    log::info!("Starting Galyn v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Database path: {}", config.db_path().display());
    log::info!("SPARQL endpoint: {}", config.sparql.endpoint);

    let db = open_db(config).await?;

    db.with_connection(|conn| {
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
        let tables: Vec<String> = stmt.query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        let missing: Vec<&str> = migrate::EXPECTED_TABLES
            .iter()
            .copied()
            .filter(|t| !tables.iter().any(|have| have == t))
            .collect();
        if !missing.is_empty() {
            for table in &missing {
                log::error!("Missing table: {}", table);
            }
            return Err(GalynError::Config(format!("Missing tables: {}", missing.join(", "))));
        }

        let applied = migrate::get_applied_migrations(conn)?;
        log::debug!("{} migrations applied", applied.len());

        let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if integrity != "ok" {
            return Err(GalynError::Config(format!("Database integrity check failed: {}", integrity)));
        }

        let relationships: i64 = conn.query_row("SELECT COUNT(*) FROM relationships", [], |row| row.get(0))?;
        let stories: i64 = conn.query_row("SELECT COUNT(*) FROM stories", [], |row| row.get(0))?;
        log::info!("{} stories, {} relationship records", stories, relationships);
        Ok(())
    }).await?;

    log::info!("Database schema verification complete");
    Ok(())
}
