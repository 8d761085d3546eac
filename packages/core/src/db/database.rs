//! Database Connection Management
//!
//! This module provides the canonical store: connection handling, schema
//! bootstrap and the raw SQL for every node operation, using libsql.
//!
//! # Architecture
//!
//! - **Single table**: `mindmap_nodes` holds every node; `metadata` is a JSON text column
//! - **Store-assigned ids**: `INTEGER PRIMARY KEY AUTOINCREMENT`, never reused
//! - **WAL mode**: Write-Ahead Logging so readers never block the drag-end writer
//! - **Atomic merge**: sparse updates read, merge and write inside one
//!   `BEGIN IMMEDIATE` transaction, so concurrent writers touching disjoint
//!   fields never lose each other's changes
//!
//! # Database Connection Patterns
//!
//! **ALWAYS use `connect_with_timeout()` in async functions.** The busy timeout
//! (5 seconds unless set with [`DatabaseService::with_busy_timeout`]) lets
//! concurrent writers wait for the write lock instead of failing immediately
//! with `SQLITE_BUSY`. The local engine waits on the calling thread, so the
//! busy timeout is the only deadline that can interrupt a lock wait; a write
//! that exhausts it fails with [`DatabaseError::Timeout`].
//!
//! ```no_run
//! # use mindmap_core::db::DatabaseService;
//! # use std::path::PathBuf;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let db_service = DatabaseService::new(PathBuf::from("./data/mindmap.db")).await?;
//! let conn = db_service.connect_with_timeout().await?;
//! # Ok(())
//! # }
//! ```

use crate::db::error::DatabaseError;
use crate::models::{NewNode, Node, NodeUpdate};
use chrono::{DateTime, NaiveDateTime, Utc};
use libsql::{Builder, Database, Row};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Canonical table name
pub const NODES_TABLE: &str = "mindmap_nodes";

/// Column list shared by every SELECT / RETURNING clause; `row_to_node` reads
/// columns in exactly this order.
const NODE_COLUMNS: &str = "id, name, description, metadata, x, y, created_at";

/// Lock wait used when no store deadline is configured
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Primary result code for `SQLITE_BUSY` (extended codes share the low byte)
const SQLITE_BUSY: i32 = 5;

/// Database service for managing the libsql connection and schema
///
/// # Examples
///
/// ```no_run
/// use mindmap_core::db::DatabaseService;
/// use std::path::PathBuf;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db_service = DatabaseService::new(PathBuf::from("./data/mindmap.db")).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,

    /// How long a connection waits for the write lock
    busy_timeout: Duration,
}

impl DatabaseService {
    /// Open (or create) the canonical store at `db_path`
    ///
    /// This will:
    /// 1. Ensure the parent directory exists
    /// 2. Open/create the database file
    /// 3. Initialize the schema (CREATE TABLE IF NOT EXISTS)
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the directory cannot be created, the
    /// connection fails or schema initialization fails.
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        let is_new_database = !db_path.exists();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        };

        service.initialize_schema(is_new_database).await?;

        Ok(service)
    }

    /// Bound lock waits on every later connection, normally to the store deadline
    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }

    /// Classify a failed write: lock waits that ran out become `Timeout`
    fn write_error(&self, operation: &str, context: &str, e: libsql::Error) -> DatabaseError {
        if is_busy(&e) {
            DatabaseError::timeout(operation, self.busy_timeout.as_millis() as u64)
        } else {
            DatabaseError::sql_execution(format!("{}: {}", context, e))
        }
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so they go through query() instead of execute().
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Initialize database schema and configuration
    ///
    /// Idempotent: safe to call on every start.
    ///
    /// # Schema
    ///
    /// - `mindmap_nodes` table: one row per node
    /// - `idx_mindmap_nodes_name_lower`: backs case-insensitive parent-name lookup
    async fn initialize_schema(&self, is_new_database: bool) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;

        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {NODES_TABLE} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    metadata TEXT NOT NULL DEFAULT '{{}}',
                    x REAL NOT NULL DEFAULT 0.0,
                    y REAL NOT NULL DEFAULT 0.0,
                    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                )"
            ),
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!(
                "Failed to create {NODES_TABLE} table: {}",
                e
            ))
        })?;

        conn.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS idx_mindmap_nodes_name_lower ON {NODES_TABLE}(lower(name))"
            ),
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!(
                "Failed to create index 'idx_mindmap_nodes_name_lower': {}",
                e
            ))
        })?;

        // Flush schema for brand new files so a second connection sees the table
        if is_new_database {
            self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
                .await?;
        }

        Ok(())
    }

    /// Get a synchronous connection to the database
    ///
    /// Only for single-threaded code that never holds the connection across an
    /// `.await`. Everything else uses `connect_with_timeout()`.
    pub fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Get an async connection with busy timeout configured
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.connect()?;

        let pragma = format!("PRAGMA busy_timeout = {}", self.busy_timeout.as_millis());
        self.execute_pragma(&conn, &pragma).await?;

        Ok(conn)
    }

    //
    // NODE OPERATIONS
    // Wrapped by the NodeStore trait implementation (TursoStore).
    //

    /// Insert a node and return the stored row (with its assigned id and timestamp)
    pub async fn db_insert_node(&self, node: &NewNode) -> Result<Node, DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        let metadata = serde_json::to_string(&node.metadata)?;

        let mut rows = conn
            .query(
                &format!(
                    "INSERT INTO {NODES_TABLE} (name, description, metadata, x, y)
                     VALUES (?, ?, ?, 0.0, 0.0)
                     RETURNING {NODE_COLUMNS}"
                ),
                (node.name.as_str(), node.description.as_str(), metadata),
            )
            .await
            .map_err(|e| self.write_error("insert_node", "Failed to insert node", e))?;

        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
            .ok_or_else(|| DatabaseError::sql_execution("INSERT ... RETURNING produced no row"))?;

        row_to_node(&row)
    }

    /// Fetch a single node by id
    pub async fn db_get_node(&self, id: i64) -> Result<Option<Node>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        fetch_node(&conn, id).await
    }

    /// All nodes, newest id first
    pub async fn db_list_nodes(&self) -> Result<Vec<Node>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut rows = conn
            .query(
                &format!("SELECT {NODE_COLUMNS} FROM {NODES_TABLE} ORDER BY id DESC"),
                (),
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to list nodes: {}", e)))?;

        let mut nodes = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            nodes.push(row_to_node(&row)?);
        }

        Ok(nodes)
    }

    /// Merge a sparse update into the stored row
    ///
    /// The read, merge and write all happen inside one `BEGIN IMMEDIATE`
    /// transaction, which takes the write lock up front. Returns `Ok(None)`
    /// (after rolling back) when the id does not exist.
    pub async fn db_update_node(
        &self,
        id: i64,
        update: &NodeUpdate,
    ) -> Result<Option<Node>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute("BEGIN IMMEDIATE", ())
            .await
            .map_err(|e| self.write_error("update_node", "Failed to begin transaction", e))?;

        match merge_in_transaction(&conn, id, update).await {
            Ok(Some(node)) => {
                if let Err(e) = conn.execute("COMMIT", ()).await {
                    let _rollback = conn.execute("ROLLBACK", ()).await;
                    return Err(self.write_error(
                        "update_node",
                        &format!("Failed to commit update of node {}", id),
                        e,
                    ));
                }
                Ok(Some(node))
            }
            Ok(None) => {
                let _rollback = conn.execute("ROLLBACK", ()).await;
                Ok(None)
            }
            Err(e) => {
                let _rollback = conn.execute("ROLLBACK", ()).await;
                Err(e)
            }
        }
    }

    /// Delete a node by id
    ///
    /// Returns the number of rows removed (0 when the id never existed).
    pub async fn db_delete_node(&self, id: i64) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let rows_affected = conn
            .execute(&format!("DELETE FROM {NODES_TABLE} WHERE id = ?"), [id])
            .await
            .map_err(|e| self.write_error("delete_node", "Failed to delete node", e))?;

        Ok(rows_affected)
    }

    /// Ids of nodes whose name matches `name` case-insensitively, lowest first
    ///
    /// Uses SQLite `lower()`, which folds ASCII letters only.
    pub async fn db_find_ids_by_name(&self, name: &str) -> Result<Vec<i64>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut rows = conn
            .query(
                &format!(
                    "SELECT id FROM {NODES_TABLE} WHERE lower(name) = lower(?) ORDER BY id ASC"
                ),
                [name],
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to look up nodes by name: {}", e))
            })?;

        let mut ids = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            ids.push(row.get::<i64>(0)?);
        }

        Ok(ids)
    }

    /// Flush pending WAL writes to the main database file
    ///
    /// Called on shutdown after in-flight writes have settled.
    pub async fn drain_and_checkpoint(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
            .await?;

        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

        Ok(())
    }
}

fn is_busy(e: &libsql::Error) -> bool {
    matches!(e, libsql::Error::SqliteFailure(code, _) if code & 0xff == SQLITE_BUSY)
}

async fn fetch_node(conn: &libsql::Connection, id: i64) -> Result<Option<Node>, DatabaseError> {
    let mut rows = conn
        .query(
            &format!("SELECT {NODE_COLUMNS} FROM {NODES_TABLE} WHERE id = ?"),
            [id],
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute get_node query: {}", e))
        })?;

    match rows
        .next()
        .await
        .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
    {
        Some(row) => Ok(Some(row_to_node(&row)?)),
        None => Ok(None),
    }
}

async fn merge_in_transaction(
    conn: &libsql::Connection,
    id: i64,
    update: &NodeUpdate,
) -> Result<Option<Node>, DatabaseError> {
    let Some(current) = fetch_node(conn, id).await? else {
        return Ok(None);
    };

    let merged = current.merged_with(update);
    let metadata = serde_json::to_string(&merged.metadata)?;

    let mut rows = conn
        .query(
            &format!(
                "UPDATE {NODES_TABLE}
                 SET name = ?, description = ?, metadata = ?, x = ?, y = ?
                 WHERE id = ?
                 RETURNING {NODE_COLUMNS}"
            ),
            (
                merged.name.as_str(),
                merged.description.as_str(),
                metadata,
                merged.x,
                merged.y,
                id,
            ),
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to update node: {}", e)))?;

    let row = rows
        .next()
        .await
        .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        .ok_or_else(|| DatabaseError::sql_execution(format!("Node {} vanished mid-update", id)))?;

    row_to_node(&row).map(Some)
}

/// Parse timestamp from database - handles both SQLite and RFC3339 formats
///
/// SQLite CURRENT_TIMESTAMP returns: "YYYY-MM-DD HH:MM:SS"
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }

    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Convert a libsql row (in `NODE_COLUMNS` order) to a `Node`
fn row_to_node(row: &Row) -> Result<Node, DatabaseError> {
    let id: i64 = row.get(0)?;
    let name: String = row.get(1)?;
    let description: String = row.get(2)?;
    let metadata_json: String = row.get(3)?;
    let x: f64 = row.get(4)?;
    let y: f64 = row.get(5)?;
    let created_at_str: String = row.get(6)?;

    let metadata = match serde_json::from_str::<Value>(&metadata_json) {
        Ok(Value::Object(map)) => map,
        Ok(Value::Null) => Map::new(),
        Ok(other) => {
            return Err(DatabaseError::corrupt_row(
                id,
                format!("metadata is not an object: {}", other),
            ))
        }
        Err(e) => return Err(DatabaseError::corrupt_row(id, e.to_string())),
    };

    let created_at = parse_timestamp(&created_at_str).ok_or_else(|| {
        DatabaseError::corrupt_row(id, format!("unparseable created_at '{}'", created_at_str))
    })?;

    Ok(Node {
        id,
        name,
        description,
        metadata,
        x,
        y,
        created_at,
    })
}
