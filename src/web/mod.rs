//! JSON endpoints for the graph, word cloud, timemap and actor pages.

mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Db;
use crate::error::{GalynError, Result};
use crate::relations::FilterFields;
use crate::sparql::SparqlStore;

/// Everything a request handler needs. Handlers build their own
/// per-request aggregates; nothing here is mutated after startup.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub db: Db,
    pub sparql: SparqlStore,
    pub filter_fields: FilterFields,
}

pub type AppState = Arc<AppContext>;

/// Build the application router
pub fn router(ctx: AppContext, allowed_origins: &[String]) -> Router {
    let cors = if allowed_origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        let origins: Vec<axum::http::HeaderValue> =
            allowed_origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/health", get(handlers::health))
        .route("/relations/graph", get(handlers::graph_page))
        .route("/relations/graph/data", get(handlers::graph_data))
        .route("/relations/graph/triple-data", get(handlers::graph_triple_data))
        .route("/relations/cloud/data", get(handlers::cloud_data))
        .route("/relations/event-lookup", get(handlers::event_lookup))
        .route("/lynchings/stories", get(handlers::story_list))
        .route("/lynchings/story/:story_id/", get(handlers::story_detail))
        .route("/lynchings/timemap/data", get(handlers::timemap_data))
        .route("/lynchings/alleged-crimes", get(handlers::alleged_crimes))
        .route(
            "/lynchings/alleged-crimes/:accusation_id/stories",
            get(handlers::stories_by_accusation),
        )
        .route("/actors/macroevents", get(handlers::actor_macroevents))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(Arc::new(ctx))
}

/// HTTP server for the Galyn JSON API
pub struct GalynServer {
    ctx: AppContext,
    config: Config,
}

impl GalynServer {
    pub fn new(db: Db, config: Config) -> Result<Self> {
        let sparql = SparqlStore::from_config(&config.sparql)?;
        Ok(Self {
            ctx: AppContext {
                db,
                sparql,
                filter_fields: config.filter_fields(),
            },
            config,
        })
    }

    /// Bind and serve until the process is stopped
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.http_server.bind, self.config.http_server.port);
        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
            let msg = if e.kind() == std::io::ErrorKind::AddrInUse {
                format!(
                    "Port {} is already in use. Stop the other process or set http_server.port in config.toml",
                    self.config.http_server.port
                )
            } else {
                format!("Failed to bind to {}: {}", addr, e)
            };
            GalynError::Io(std::io::Error::new(e.kind(), msg))
        })?;

        log::info!("Serving Galyn on http://{}", addr);
        log::info!("SPARQL store: {}", self.ctx.sparql.endpoint());

        let app = router(self.ctx, &self.config.http_server.allowed_origins);
        axum::serve(listener, app)
            .await
            .map_err(|e| GalynError::Io(std::io::Error::new(std::io::ErrorKind::Other, format!("HTTP server error: {}", e))))?;
        Ok(())
    }
}
