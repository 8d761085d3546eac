//! Derived Stores
//!
//! Best-effort mirrors of the canonical store:
//!
//! - [`GraphMirror`] - `CHILD_OF` edges between canonical ids (SurrealDB or in-process)
//! - [`SearchMirror`] - `{id, name, description}` documents (Meilisearch or in-process)
//!
//! Mirrors are never read back into the canonical store. A mirror that falls
//! behind is repaired by the next update of the same node.

mod error;
mod graph;
mod meilisearch;
mod search;
mod surreal_graph;

pub use error::{MirrorError, MirrorKind};
pub use graph::{GraphMirror, InMemoryGraphMirror};
pub use meilisearch::{
    MeilisearchMirror, DEFAULT_MEILI_HOST, DEFAULT_MEILI_INDEX, DEFAULT_MEILI_KEY,
};
pub use search::{InMemorySearchMirror, SearchMirror, DEFAULT_SEARCH_LIMIT};
pub use surreal_graph::{SurrealGraphMirror, EDGE_TABLE, VERTEX_TABLE};
