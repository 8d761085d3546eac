//! TursoStore - NodeStore Implementation for the libsql Backend
//!
//! Thin wrapper around `DatabaseService`: every method delegates to the
//! matching `db_*` call. All SQL and row mapping lives in `database.rs`.

use crate::db::node_store::NodeStore;
use crate::db::{DatabaseError, DatabaseService};
use crate::models::{DeleteResult, NewNode, Node, NodeUpdate};
use async_trait::async_trait;
use std::sync::Arc;

/// TursoStore implements NodeStore for libsql
pub struct TursoStore {
    db: Arc<DatabaseService>,
}

impl TursoStore {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    /// Underlying database service
    pub fn database(&self) -> &Arc<DatabaseService> {
        &self.db
    }
}

#[async_trait]
impl NodeStore for TursoStore {
    async fn create_node(&self, node: NewNode) -> Result<Node, DatabaseError> {
        self.db.db_insert_node(&node).await
    }

    async fn get_node(&self, id: i64) -> Result<Option<Node>, DatabaseError> {
        self.db.db_get_node(id).await
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, DatabaseError> {
        self.db.db_list_nodes().await
    }

    async fn update_node(
        &self,
        id: i64,
        update: NodeUpdate,
    ) -> Result<Option<Node>, DatabaseError> {
        self.db.db_update_node(id, &update).await
    }

    async fn delete_node(&self, id: i64) -> Result<DeleteResult, DatabaseError> {
        let rows_affected = self.db.db_delete_node(id).await?;
        Ok(if rows_affected > 0 {
            DeleteResult::existed()
        } else {
            DeleteResult::not_found()
        })
    }

    async fn find_ids_by_name(&self, name: &str) -> Result<Vec<i64>, DatabaseError> {
        self.db.db_find_ids_by_name(name).await
    }

    async fn close(&self) -> Result<(), DatabaseError> {
        self.db.drain_and_checkpoint().await
    }
}
