//! Mindmap Server
//!
//! HTTP and websocket front end for the mindmap sync engine. Endpoint modules
//! translate requests into `NodeService` / `RealtimeChannel` calls and map
//! errors onto status codes; everything else lives in `mindmap-core`.

use anyhow::Context;
use axum::{http::HeaderValue, Router};
use mindmap_core::db::{DatabaseService, TursoStore};
use mindmap_core::mirrors::{
    GraphMirror, InMemorySearchMirror, MeilisearchMirror, SearchMirror, SurrealGraphMirror,
};
use mindmap_core::realtime::{RealtimeChannel, SessionRegistry};
use mindmap_core::services::NodeService;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod http_error;
pub mod node_endpoints;
pub mod realtime_endpoint;

pub use config::ServerConfig;
pub use http_error::HttpError;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub node_service: NodeService,
    pub realtime: RealtimeChannel,
}

impl AppState {
    pub fn new(node_service: NodeService, realtime_buffer: usize) -> Self {
        let registry = Arc::new(SessionRegistry::new(realtime_buffer));
        let realtime = RealtimeChannel::new(registry, node_service.clone());
        Self {
            node_service,
            realtime,
        }
    }
}

/// Build the CORS layer; any origin when none is configured
pub fn cors_layer(allow_origin: Option<&str>) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match allow_origin {
        Some(origin) => {
            let origin = HeaderValue::from_str(origin)
                .with_context(|| format!("Invalid CORS origin: {}", origin))?;
            Ok(layer.allow_origin(origin))
        }
        None => Ok(layer.allow_origin(Any)),
    }
}

/// Create the router with all endpoints
pub fn create_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .merge(node_endpoints::routes(state.clone()))
        .merge(realtime_endpoint::routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Open the canonical store and both mirrors described by `config`
pub async fn build_state(config: &ServerConfig) -> anyhow::Result<AppState> {
    let sync_config = config.sync_config();

    // Lock waits block the calling thread, so they get the same deadline as store calls
    let database = DatabaseService::new(config.db_path.clone())
        .await
        .with_context(|| format!("Failed to open store at {}", config.db_path.display()))?
        .with_busy_timeout(sync_config.store_timeout);
    let store = Arc::new(TursoStore::new(Arc::new(database)));

    let graph: Arc<dyn GraphMirror> = match &config.surreal_endpoint {
        Some(endpoint) => {
            tracing::info!("Graph mirror: SurrealDB at {}", endpoint);
            Arc::new(
                SurrealGraphMirror::new_http(
                    endpoint,
                    &config.surreal_ns,
                    &config.surreal_db,
                    &config.surreal_user,
                    &config.surreal_pass,
                )
                .await
                .with_context(|| format!("Failed to connect graph mirror at {}", endpoint))?,
            )
        }
        None => {
            tracing::info!("Graph mirror: embedded in-memory SurrealDB");
            Arc::new(
                SurrealGraphMirror::new_in_memory()
                    .await
                    .context("Failed to start embedded graph mirror")?,
            )
        }
    };

    let search: Arc<dyn SearchMirror> = match &config.meili_host {
        Some(host) => {
            tracing::info!("Search mirror: Meilisearch at {}", host);
            Arc::new(MeilisearchMirror::new(
                host.clone(),
                Some(config.meili_master_key.clone()),
                config.meili_index.clone(),
            ))
        }
        None => {
            tracing::info!("Search mirror: in-process index");
            Arc::new(InMemorySearchMirror::new())
        }
    };

    let node_service = NodeService::new(store, graph, search).with_config(sync_config);

    Ok(AppState::new(node_service, config.session_buffer))
}

/// Run the server until ctrl-c or SIGTERM, then flush the canonical store
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    let state = build_state(&config).await?;
    let app = create_router(
        state.clone(),
        cors_layer(config.cors_allow_origin.as_deref())?,
    );

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("🚀 Mindmap server listening on http://{}", addr);
    tracing::info!("   Realtime: ws://{}/mindmap/ws", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shutting down, flushing canonical store");
    state.node_service.shutdown().await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received ctrl-c"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
