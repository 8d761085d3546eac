//! NodeStore Trait - Canonical Store Abstraction
//!
//! This module defines the `NodeStore` trait that abstracts canonical store
//! operations. `NodeService` only talks to this trait, so tests can swap in a
//! fault-injecting store without touching the sync logic.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: every method is async
//! 2. **Typed errors**: methods return `DatabaseError` so the service can tell
//!    a timeout from a rejected statement
//! 3. **Merge in the store**: `update_node` performs the read-merge-write itself,
//!    atomically, rather than leaving it to the caller
//!
//! # Examples
//!
//! ```rust,no_run
//! use mindmap_core::db::{DatabaseService, NodeStore, TursoStore};
//! use mindmap_core::models::NewNode;
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/mindmap.db")).await?);
//!     let store: Arc<dyn NodeStore> = Arc::new(TursoStore::new(db));
//!
//!     let created = store
//!         .create_node(NewNode::new("Grandpa", "", None, Default::default()))
//!         .await?;
//!     println!("created node {}", created.id);
//!     Ok(())
//! }
//! ```

use crate::db::DatabaseError;
use crate::models::{DeleteResult, NewNode, Node, NodeUpdate};
use async_trait::async_trait;

/// Abstraction layer for canonical node persistence
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the service shares one store across
/// every HTTP request and realtime session.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Insert a node; the store assigns `id` and `created_at`
    async fn create_node(&self, node: NewNode) -> Result<Node, DatabaseError>;

    /// Fetch a node by id
    async fn get_node(&self, id: i64) -> Result<Option<Node>, DatabaseError>;

    /// All nodes, newest id first
    async fn list_nodes(&self) -> Result<Vec<Node>, DatabaseError>;

    /// Merge a sparse update atomically
    ///
    /// Returns `Ok(None)` if the node does not exist. Two concurrent updates
    /// touching disjoint fields must both survive.
    async fn update_node(&self, id: i64, update: NodeUpdate)
        -> Result<Option<Node>, DatabaseError>;

    /// Delete a node; deleting a missing id is not an error
    async fn delete_node(&self, id: i64) -> Result<DeleteResult, DatabaseError>;

    /// Ids of nodes whose name equals `name` ignoring case, ascending
    async fn find_ids_by_name(&self, name: &str) -> Result<Vec<i64>, DatabaseError>;

    /// Flush and release resources on shutdown
    async fn close(&self) -> Result<(), DatabaseError>;
}
