use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::relations::{FilterFields, DEFAULT_FILTER_FIELDS};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub galyn: GalynConfig,
    pub sparql: SparqlConfig,
    #[serde(default)]
    pub relations: RelationsConfig,
    #[serde(default)]
    pub http_server: HttpServerConfig,
}

/// Galyn-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GalynConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// SPARQL store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SparqlConfig {
    /// Query endpoint of the triple store, e.g. a Sesame repository URL
    pub endpoint: String,
    #[serde(default = "default_sparql_timeout")]
    pub timeout_secs: u64,
}

/// Relationship graph configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RelationsConfig {
    /// Categorical columns of `relationships` that requests may filter on.
    /// Each entry is an equality filter on the column of the same name.
    #[serde(default = "default_filter_fields")]
    pub filter_fields: Vec<String>,
}

impl Default for RelationsConfig {
    fn default() -> Self {
        Self {
            filter_fields: default_filter_fields(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default = "default_http_bind")]
    pub bind: String,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            port: default_http_port(),
            bind: default_http_bind(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_filter_fields() -> Vec<String> {
    DEFAULT_FILTER_FIELDS.iter().map(|s| s.to_string()).collect()
}

fn default_sparql_timeout() -> u64 {
    30
}

fn default_http_port() -> u16 {
    8000
}

fn default_http_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec![]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in GALYN_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        let _ = dotenv::dotenv();

        let config_path = std::env::var("GALYN_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        Self::from_toml(&config_str)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str).context("Failed to parse config.toml")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        let endpoint = url::Url::parse(&self.sparql.endpoint)
            .with_context(|| format!("sparql.endpoint is not a valid URL: {}", self.sparql.endpoint))?;
        if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
            anyhow::bail!("sparql.endpoint must use http or https: {}", endpoint);
        }

        if self.sparql.timeout_secs == 0 {
            anyhow::bail!("sparql.timeout_secs must be greater than 0");
        }

        // Filter fields end up as column names in SQL, so only plain identifiers are allowed
        let ident = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid regex pattern");
        for field in &self.relations.filter_fields {
            if !ident.is_match(field) {
                anyhow::bail!("relations.filter_fields contains an invalid column name: {:?}", field);
            }
        }

        if self.http_server.port == 0 {
            anyhow::bail!("http_server.port must be greater than 0");
        }

        Ok(())
    }

    /// Filterable relationship columns
    pub fn filter_fields(&self) -> FilterFields {
        FilterFields::new(self.relations.filter_fields.clone())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.galyn.db_path
    }
}
