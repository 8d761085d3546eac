//! Node Endpoints
//!
//! Thin pass-through from HTTP to `NodeService`. No business rules live here.
//!
//! # Endpoints
//!
//! - `GET /api/health` - Health check endpoint
//! - `GET /mindmap` - All nodes, newest first
//! - `POST /mindmap/node` - Create a node
//! - `GET /mindmap/node/:id` - Get a node by ID
//! - `PUT /mindmap/node/:id` - Sparse update (content and/or position)
//! - `DELETE /mindmap/node/:id` - Delete a node
//! - `GET /mindmap/search?q=&limit=` - Free-text search

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use mindmap_core::models::{Node, NodeUpdate, SearchDocument};
use mindmap_core::services::CreateNodeParams;
use serde::{Deserialize, Serialize};

use crate::{AppState, HttpError};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub sessions: usize,
}

/// Response for delete
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
    #[serde(default)]
    limit: Option<usize>,
}

fn parse_id(raw: &str) -> Result<i64, HttpError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| HttpError::invalid_input(format!("Invalid node id: {}", raw)))
}

/// Health check endpoint
///
/// ```bash
/// curl http://localhost:3000/api/health
/// ```
async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        sessions: state.realtime.registry().total_sessions(),
    })
}

async fn list_nodes(State(state): State<AppState>) -> Result<Json<Vec<Node>>, HttpError> {
    let nodes = state.node_service.list_nodes().await?;
    Ok(Json(nodes))
}

/// Create a new node
///
/// ```bash
/// curl -X POST http://localhost:3000/mindmap/node \
///   -H "Content-Type: application/json" \
///   -d '{"name": "Sylar", "description": "Bio", "type": "family_member",
///        "metadata": {"parent": "Grandpa"}}'
/// ```
async fn create_node(
    State(state): State<AppState>,
    Json(params): Json<CreateNodeParams>,
) -> Result<(StatusCode, Json<Node>), HttpError> {
    let node = state.node_service.create_node(params).await?;
    Ok((StatusCode::CREATED, Json(node)))
}

async fn get_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Node>, HttpError> {
    let id = parse_id(&id)?;
    let node = state
        .node_service
        .get_node(id)
        .await?
        .ok_or_else(|| HttpError::new(format!("Node not found: {}", id), "NODE_NOT_FOUND"))?;

    Ok(Json(node))
}

/// Update an existing node
///
/// Omitted fields keep their stored values; `metadata` is merged key-by-key.
///
/// ```bash
/// curl -X PUT http://localhost:3000/mindmap/node/7 \
///   -H "Content-Type: application/json" \
///   -d '{"x": 120, "y": 80}'
/// ```
async fn update_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<NodeUpdate>,
) -> Result<Json<Node>, HttpError> {
    let id = parse_id(&id)?;
    let node = state.node_service.update_node(id, update).await?;
    Ok(Json(node))
}

async fn delete_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, HttpError> {
    let id = parse_id(&id)?;
    state.node_service.delete_node(id).await?;
    Ok(Json(DeleteResponse { success: true }))
}

async fn search_nodes(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SearchDocument>>, HttpError> {
    let hits = state
        .node_service
        .search(&query.q, query.limit.unwrap_or(0))
        .await?;
    Ok(Json(hits))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/mindmap", get(list_nodes))
        .route("/mindmap/node", axum::routing::post(create_node))
        .route(
            "/mindmap/node/:id",
            get(get_node).put(update_node).delete(delete_node),
        )
        .route("/mindmap/search", get(search_nodes))
        .with_state(state)
}
