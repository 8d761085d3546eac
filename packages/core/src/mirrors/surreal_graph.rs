//! SurrealGraphMirror - GraphMirror Implementation for SurrealDB
//!
//! Vertices live in the `node` table with record ids `node:<canonical id>`;
//! edges live in the `child_of` relation table (`in` = child, `out` = parent).
//!
//! # Engines
//!
//! - `SurrealGraphMirror<Db>`: embedded in-memory engine (`kv-mem`), used for
//!   local runs and tests
//! - `SurrealGraphMirror<Client>`: remote server over HTTP(S), used in deployment
//!
//! # Examples
//!
//! ```rust,no_run
//! use mindmap_core::mirrors::{GraphMirror, SurrealGraphMirror};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let graph = SurrealGraphMirror::new_in_memory().await?;
//!     graph.merge_child_of(2, 1).await?;
//!     assert_eq!(graph.parents_of(2).await?, vec![1]);
//!     Ok(())
//! }
//! ```

use crate::mirrors::{GraphMirror, MirrorError};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use surrealdb::engine::local::{Db, Mem};
use surrealdb::engine::remote::http::{Client, Http, Https};
use surrealdb::opt::auth::Root;
use surrealdb::sql::{Id, Thing};
use surrealdb::{Connection, Surreal};
use tracing::debug;

/// Vertex table name
pub const VERTEX_TABLE: &str = "node";

/// Edge (relation) table name
pub const EDGE_TABLE: &str = "child_of";

/// Namespace / database used by the embedded engine
const EMBEDDED_NAMESPACE: &str = "mindmap";
const EMBEDDED_DATABASE: &str = "graph";

/// Attempts for one edge merge when concurrent writers conflict
const MERGE_ATTEMPTS: u32 = 8;

/// Error text SurrealDB uses for conflicts that succeed on a rerun
const RETRYABLE_MARKERS: &[&str] = &["can be retried", "conflict", "already contains"];

#[derive(Debug, Deserialize)]
struct EdgeOut {
    out: Thing,
}

#[derive(Debug, Deserialize)]
struct EdgeIn {
    #[serde(rename = "in")]
    in_: Thing,
}

/// SurrealDB-backed graph mirror
pub struct SurrealGraphMirror<C = Db>
where
    C: Connection,
{
    db: Arc<Surreal<C>>,
}

impl SurrealGraphMirror<Db> {
    /// Embedded in-memory engine
    pub async fn new_in_memory() -> Result<Self, MirrorError> {
        let db = Surreal::new::<Mem>(()).await?;
        db.use_ns(EMBEDDED_NAMESPACE)
            .use_db(EMBEDDED_DATABASE)
            .await?;

        Self::from_client(db).await
    }
}

impl SurrealGraphMirror<Client> {
    /// Connect to a SurrealDB server and sign in as root
    ///
    /// `https://` endpoints use TLS; `http://` or a bare `host:port` use plain HTTP.
    pub async fn new_http(
        endpoint: &str,
        namespace: &str,
        database: &str,
        username: &str,
        password: &str,
    ) -> Result<Self, MirrorError> {
        let (tls, address) = split_endpoint(endpoint);

        let db = if tls {
            Surreal::new::<Https>(address).await?
        } else {
            Surreal::new::<Http>(address).await?
        };
        db.signin(Root { username, password }).await?;
        db.use_ns(namespace).use_db(database).await?;

        Self::from_client(db).await
    }
}

/// `(uses_tls, address)` with the scheme and trailing slash removed
fn split_endpoint(endpoint: &str) -> (bool, &str) {
    let endpoint = endpoint.trim().trim_end_matches('/');
    match endpoint.strip_prefix("https://") {
        Some(address) => (true, address),
        None => (false, endpoint.trim_start_matches("http://")),
    }
}

fn is_retryable(error: &surrealdb::Error) -> bool {
    let message = error.to_string();
    RETRYABLE_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

impl<C> SurrealGraphMirror<C>
where
    C: Connection,
{
    /// Wrap an already-connected client and define the mirror tables
    pub async fn from_client(db: Surreal<C>) -> Result<Self, MirrorError> {
        let mirror = Self { db: Arc::new(db) };
        mirror.initialize_schema().await?;
        Ok(mirror)
    }

    async fn initialize_schema(&self) -> Result<(), MirrorError> {
        self.db
            .query(format!(
                "
                DEFINE TABLE IF NOT EXISTS {VERTEX_TABLE} SCHEMALESS;
                DEFINE TABLE IF NOT EXISTS {EDGE_TABLE} SCHEMALESS TYPE RELATION;
                DEFINE INDEX IF NOT EXISTS {EDGE_TABLE}_endpoints ON {EDGE_TABLE} FIELDS in, out UNIQUE;
                "
            ))
            .await?
            .check()?;

        debug!("Graph mirror schema ready");
        Ok(())
    }

    /// One merge attempt: a read-only existence check, then vertices and edge
    /// in a single transaction
    async fn try_merge_child_of(&self, child_id: i64, parent_id: i64) -> Result<(), MirrorError> {
        let child = Self::vertex(child_id);
        let parent = Self::vertex(parent_id);

        let mut check_response = self
            .db
            .query(format!(
                "SELECT VALUE id FROM {EDGE_TABLE} WHERE in = $child AND out = $parent;"
            ))
            .bind(("child", child.clone()))
            .bind(("parent", parent.clone()))
            .await?;

        let existing_edges: Vec<Thing> = check_response.take(0)?;
        if !existing_edges.is_empty() {
            return Ok(());
        }

        let mut response = self
            .db
            .query(format!(
                "
                BEGIN TRANSACTION;
                UPSERT $child SET canonical_id = $child_id;
                UPSERT $parent SET canonical_id = $parent_id;
                RELATE $child->{EDGE_TABLE}->$parent;
                COMMIT TRANSACTION;
                "
            ))
            .bind(("child", child))
            .bind(("child_id", child_id))
            .bind(("parent", parent))
            .bind(("parent_id", parent_id))
            .await?;

        // A failed commit marks every statement; surface a retryable cause if any
        let mut errors: Vec<(usize, surrealdb::Error)> =
            response.take_errors().into_iter().collect();
        errors.sort_by_key(|(index, _)| *index);
        match errors.iter().position(|(_, e)| is_retryable(e)) {
            Some(i) => Err(errors.swap_remove(i).1.into()),
            None => match errors.into_iter().next() {
                Some((_, e)) => Err(e.into()),
                None => Ok(()),
            },
        }
    }

    fn vertex(id: i64) -> Thing {
        Thing::from((VERTEX_TABLE, Id::Number(id)))
    }

    fn canonical_id(thing: &Thing) -> Option<i64> {
        match &thing.id {
            Id::Number(id) => Some(*id),
            _ => None,
        }
    }
}

#[async_trait]
impl<C> GraphMirror for SurrealGraphMirror<C>
where
    C: Connection,
{
    async fn merge_child_of(&self, child_id: i64, parent_id: i64) -> Result<(), MirrorError> {
        let mut attempt = 1;
        loop {
            match self.try_merge_child_of(child_id, parent_id).await {
                Err(MirrorError::Graph(e)) if is_retryable(&e) && attempt < MERGE_ATTEMPTS => {
                    debug!(child_id, parent_id, attempt, "Retrying edge merge: {}", e);
                    tokio::time::sleep(Duration::from_millis(5 * u64::from(attempt))).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn detach_delete(&self, node_id: i64) -> Result<(), MirrorError> {
        self.db
            .query(format!(
                "
                DELETE {EDGE_TABLE} WHERE in = $vertex OR out = $vertex;
                DELETE $vertex;
                "
            ))
            .bind(("vertex", Self::vertex(node_id)))
            .await?
            .check()?;

        Ok(())
    }

    async fn parents_of(&self, node_id: i64) -> Result<Vec<i64>, MirrorError> {
        let mut response = self
            .db
            .query(format!("SELECT out FROM {EDGE_TABLE} WHERE in = $vertex;"))
            .bind(("vertex", Self::vertex(node_id)))
            .await?;

        let edges: Vec<EdgeOut> = response.take(0)?;
        let mut parents: Vec<i64> = edges
            .iter()
            .filter_map(|edge| Self::canonical_id(&edge.out))
            .collect();
        parents.sort_unstable();
        Ok(parents)
    }

    async fn children_of(&self, node_id: i64) -> Result<Vec<i64>, MirrorError> {
        let mut response = self
            .db
            .query(format!("SELECT in FROM {EDGE_TABLE} WHERE out = $vertex;"))
            .bind(("vertex", Self::vertex(node_id)))
            .await?;

        let edges: Vec<EdgeIn> = response.take(0)?;
        let mut children: Vec<i64> = edges
            .iter()
            .filter_map(|edge| Self::canonical_id(&edge.in_))
            .collect();
        children.sort_unstable();
        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_endpoint() {
        assert_eq!(split_endpoint("http://surreal:8000"), (false, "surreal:8000"));
        assert_eq!(split_endpoint("https://graph.example.com/"), (true, "graph.example.com"));
        assert_eq!(split_endpoint("localhost:8000"), (false, "localhost:8000"));
    }
}
