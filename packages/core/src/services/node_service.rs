//! Node Service - Sync Orchestrator
//!
//! This module owns the node lifecycle and the consistency policy across the
//! three stores:
//!
//! 1. Write the canonical store. Failure (or timeout) fails the call and no
//!    mirror is touched.
//! 2. Re-upsert the search document.
//! 3. On update, derive the `CHILD_OF` edge from `metadata.parent`.
//!
//! Steps 2 and 3 are best-effort: failures are logged at `warn`, recorded in a
//! [`MirrorOutcome`] and never unwind step 1. A stale mirror is repaired by the
//! next update of the same node. There is no transaction spanning stores and
//! no ordering across calls; concurrent updates are last-write-wins per key.
//!
//! # Known limitation
//!
//! Relationships are derived from the parent's *name*. Creating the parent
//! after the child does not retroactively link them, and renaming a parent
//! breaks existing links for future derivations.
//!
//! # Examples
//!
//! ```rust,no_run
//! use mindmap_core::db::{DatabaseService, NodeStore, TursoStore};
//! use mindmap_core::mirrors::{InMemoryGraphMirror, InMemorySearchMirror};
//! use mindmap_core::services::{CreateNodeParams, NodeService};
//! use mindmap_core::models::NodeUpdate;
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/mindmap.db")).await?);
//!     let service = NodeService::new(
//!         Arc::new(TursoStore::new(db)),
//!         Arc::new(InMemoryGraphMirror::new()),
//!         Arc::new(InMemorySearchMirror::new()),
//!     );
//!
//!     let node = service
//!         .create_node(CreateNodeParams::named("Grandpa"))
//!         .await?;
//!     service.update_node(node.id, NodeUpdate::position(10.0, 20.0)).await?;
//!     Ok(())
//! }
//! ```

use crate::db::{DatabaseError, NodeStore};
use crate::mirrors::{GraphMirror, MirrorError, MirrorKind, SearchMirror, DEFAULT_SEARCH_LIMIT};
use crate::models::{DeleteResult, NewNode, Node, NodeUpdate, SearchDocument};
use crate::services::error::NodeServiceError;
use crate::services::outcome::{MirrorOutcome, Synced};
use crate::services::parent_resolver::{NameParentResolver, ParentResolver};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on a single search page
pub const MAX_SEARCH_LIMIT: usize = 1000;

/// Deadlines for external store calls
///
/// Expiry is treated exactly like a store error: fatal for the canonical
/// store, logged and swallowed for the mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    pub store_timeout: Duration,
    pub mirror_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_millis(5000),
            mirror_timeout: Duration::from_millis(3000),
        }
    }
}

/// Parameters for creating a node
///
/// All fields are optional; defaults are applied by [`NewNode::new`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateNodeParams {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Category tag stored as `metadata.type`
    #[serde(default, rename = "type")]
    pub node_type: Option<String>,

    /// Extra metadata; `type` and `source` are always overwritten. `null` reads as `{}`.
    #[serde(default, deserialize_with = "null_as_empty_map")]
    pub metadata: Map<String, Value>,
}

fn null_as_empty_map<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Map<String, Value>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl CreateNodeParams {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = Some(node_type.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Sync orchestrator
///
/// All handles are constructed once at startup and shared; cloning is cheap.
#[derive(Clone)]
pub struct NodeService {
    store: Arc<dyn NodeStore>,
    graph: Arc<dyn GraphMirror>,
    search: Arc<dyn SearchMirror>,
    resolver: Arc<dyn ParentResolver>,
    config: SyncConfig,
}

impl NodeService {
    /// Build a service with name-based parent resolution and default deadlines
    pub fn new(
        store: Arc<dyn NodeStore>,
        graph: Arc<dyn GraphMirror>,
        search: Arc<dyn SearchMirror>,
    ) -> Self {
        let resolver = Arc::new(NameParentResolver::new(store.clone()));
        Self {
            store,
            graph,
            search,
            resolver,
            config: SyncConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Swap the parent resolution strategy
    pub fn with_resolver(mut self, resolver: Arc<dyn ParentResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    //
    // DEADLINES
    //

    async fn store_call<T, F>(&self, operation: &str, call: F) -> Result<T, NodeServiceError>
    where
        F: Future<Output = Result<T, DatabaseError>>,
    {
        match tokio::time::timeout(self.config.store_timeout, call).await {
            Ok(result) => result.map_err(NodeServiceError::from),
            Err(_) => Err(DatabaseError::timeout(
                operation,
                self.config.store_timeout.as_millis() as u64,
            )
            .into()),
        }
    }

    async fn mirror_call<T, F>(&self, mirror: MirrorKind, call: F) -> Result<T, MirrorError>
    where
        F: Future<Output = Result<T, MirrorError>>,
    {
        match tokio::time::timeout(self.config.mirror_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(MirrorError::timeout(
                mirror,
                self.config.mirror_timeout.as_millis() as u64,
            )),
        }
    }

    fn record_outcome(
        node_id: i64,
        mirror: MirrorKind,
        result: Result<(), MirrorError>,
    ) -> MirrorOutcome {
        match result {
            Ok(()) => MirrorOutcome::Synced,
            Err(e) => {
                tracing::warn!(
                    node_id,
                    mirror = %mirror,
                    error = %e,
                    "Mirror write failed; canonical record kept"
                );
                MirrorOutcome::Failed(e.to_string())
            }
        }
    }

    async fn upsert_search_document(&self, node: &Node) -> MirrorOutcome {
        let document = node.search_document();
        let result = self
            .mirror_call(
                MirrorKind::Search,
                self.search.upsert_documents(std::slice::from_ref(&document)),
            )
            .await;
        Self::record_outcome(node.id, MirrorKind::Search, result)
    }

    //
    // LIFECYCLE
    //

    /// Create a node and index it for search
    ///
    /// Relationships are not derived at creation.
    pub async fn create_node(&self, params: CreateNodeParams) -> Result<Node, NodeServiceError> {
        self.create_node_synced(params).await.map(Synced::into_record)
    }

    /// Same as [`create_node`](Self::create_node), also reporting mirror outcomes
    pub async fn create_node_synced(
        &self,
        params: CreateNodeParams,
    ) -> Result<Synced<Node>, NodeServiceError> {
        let new_node = NewNode::new(
            params.name.unwrap_or_default(),
            params.description.unwrap_or_default(),
            params.node_type.as_deref(),
            params.metadata,
        );

        let node = self
            .store_call("create_node", self.store.create_node(new_node))
            .await?;
        tracing::info!(node_id = node.id, "Created node '{}'", node.name);

        let search = self.upsert_search_document(&node).await;

        Ok(Synced::new(node, search, MirrorOutcome::Skipped))
    }

    pub async fn get_node(&self, id: i64) -> Result<Option<Node>, NodeServiceError> {
        self.store_call("get_node", self.store.get_node(id)).await
    }

    /// All nodes, newest first
    pub async fn list_nodes(&self) -> Result<Vec<Node>, NodeServiceError> {
        self.store_call("list_nodes", self.store.list_nodes()).await
    }

    /// Merge a sparse update, re-index, and derive the parent edge
    ///
    /// Returns `NodeNotFound` before any mirror call when the id has no row.
    pub async fn update_node(
        &self,
        id: i64,
        update: NodeUpdate,
    ) -> Result<Node, NodeServiceError> {
        self.update_node_synced(id, update)
            .await
            .map(Synced::into_record)
    }

    /// Same as [`update_node`](Self::update_node), also reporting mirror outcomes
    pub async fn update_node_synced(
        &self,
        id: i64,
        update: NodeUpdate,
    ) -> Result<Synced<Node>, NodeServiceError> {
        update.validate()?;

        let node = self
            .store_call("update_node", self.store.update_node(id, update))
            .await?
            .ok_or_else(|| NodeServiceError::node_not_found(id))?;
        tracing::debug!(node_id = id, "Updated node");

        let search = self.upsert_search_document(&node).await;

        let graph = match node.parent_name() {
            Some(parent_name) => self.sync_relationship(node.id, parent_name).await,
            None => MirrorOutcome::Skipped,
        };

        Ok(Synced::new(node, search, graph))
    }

    /// Delete from the canonical store, then from both mirrors
    ///
    /// Deleting a missing id succeeds. Mirror deletes run independently.
    pub async fn delete_node(&self, id: i64) -> Result<DeleteResult, NodeServiceError> {
        self.delete_node_synced(id).await.map(Synced::into_record)
    }

    /// Same as [`delete_node`](Self::delete_node), also reporting mirror outcomes
    pub async fn delete_node_synced(
        &self,
        id: i64,
    ) -> Result<Synced<DeleteResult>, NodeServiceError> {
        let result = self
            .store_call("delete_node", self.store.delete_node(id))
            .await?;
        tracing::info!(node_id = id, existed = result.existed, "Deleted node");

        let (graph, search) = tokio::join!(
            self.mirror_call(MirrorKind::Graph, self.graph.detach_delete(id)),
            self.mirror_call(MirrorKind::Search, self.search.delete_document(id)),
        );

        Ok(Synced::new(
            result,
            Self::record_outcome(id, MirrorKind::Search, search),
            Self::record_outcome(id, MirrorKind::Graph, graph),
        ))
    }

    /// Resolve `parent_name` and merge the `child -> parent` edge
    ///
    /// - No match: `Skipped` (no retroactive edge if the parent appears later)
    /// - Several matches: lowest id wins
    /// - Resolves to the child itself: `Skipped`
    ///
    /// Never fails the caller; lookup and graph errors come back as `Failed`.
    pub async fn sync_relationship(&self, child_id: i64, parent_name: &str) -> MirrorOutcome {
        let resolved = match tokio::time::timeout(
            self.config.store_timeout,
            self.resolver.resolve(parent_name),
        )
        .await
        {
            Ok(Ok(resolved)) => resolved,
            Ok(Err(e)) => {
                return Self::record_outcome(
                    child_id,
                    MirrorKind::Graph,
                    Err(MirrorError::ParentLookup(e)),
                )
            }
            Err(_) => {
                return Self::record_outcome(
                    child_id,
                    MirrorKind::Graph,
                    Err(MirrorError::ParentLookup(DatabaseError::timeout(
                        "resolve_parent",
                        self.config.store_timeout.as_millis() as u64,
                    ))),
                )
            }
        };

        let Some(parent_id) = resolved else {
            tracing::debug!(
                node_id = child_id,
                "No node named '{}'; skipping relationship",
                parent_name
            );
            return MirrorOutcome::Skipped;
        };

        if parent_id == child_id {
            tracing::debug!(node_id = child_id, "Skipping self-reference");
            return MirrorOutcome::Skipped;
        }

        let result = self
            .mirror_call(
                MirrorKind::Graph,
                self.graph.merge_child_of(child_id, parent_id),
            )
            .await;
        let outcome = Self::record_outcome(child_id, MirrorKind::Graph, result);
        if outcome.is_synced() {
            tracing::debug!(node_id = child_id, parent_id, "Synced CHILD_OF edge");
        }
        outcome
    }

    /// Free-text search over the search mirror
    ///
    /// A read path with no canonical fallback, so failures are surfaced.
    /// `limit` of 0 means the default page size.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchDocument>, NodeServiceError> {
        let limit = match limit {
            0 => DEFAULT_SEARCH_LIMIT,
            n => n.min(MAX_SEARCH_LIMIT),
        };

        self.mirror_call(MirrorKind::Search, self.search.search(query, limit))
            .await
            .map_err(NodeServiceError::search_failed)
    }

    /// Flush the canonical store; called once on shutdown
    pub async fn shutdown(&self) -> Result<(), NodeServiceError> {
        self.store_call("close", self.store.close()).await?;
        tracing::info!("Canonical store drained");
        Ok(())
    }
}
