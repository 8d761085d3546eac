//! Database Layer
//!
//! The canonical store: the single source of truth for node data.
//!
//! - `DatabaseService` - libsql connection management, schema bootstrap and SQL
//! - `NodeStore` - async trait the sync service is written against
//! - `TursoStore` - `NodeStore` backed by `DatabaseService`
//!
//! The graph and search mirrors live in [`crate::mirrors`]; they are derived
//! views and never read back into this layer.

mod database;
mod error;
mod node_store;
mod turso_store;

pub use database::{DatabaseService, DEFAULT_BUSY_TIMEOUT, NODES_TABLE};
pub use error::DatabaseError;
pub use node_store::NodeStore;
pub use turso_store::TursoStore;
