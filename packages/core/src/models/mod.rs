//! Data Models
//!
//! This module contains the core data structures used throughout the engine:
//!
//! - `Node` - Canonical node record (source of truth)
//! - `NewNode` / `NodeUpdate` - Create and sparse-update payloads
//! - `SearchDocument` - Projection mirrored into the search index

mod node;

pub use node::{
    DeleteResult, NewNode, Node, NodeUpdate, SearchDocument, ValidationError, DEFAULT_NODE_NAME,
    DEFAULT_NODE_SOURCE, DEFAULT_NODE_TYPE, METADATA_PARENT_KEY, METADATA_SOURCE_KEY,
    METADATA_TYPE_KEY,
};
