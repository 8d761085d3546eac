//! Service Layer Error Types
//!
//! Errors the sync orchestrator surfaces to its callers. Mirror failures on
//! the write path never appear here; they are logged and reported through
//! `MirrorOutcome` instead.

use crate::db::DatabaseError;
use crate::mirrors::MirrorError;
use crate::models::ValidationError;
use thiserror::Error;

/// Service operation errors
#[derive(Error, Debug)]
pub enum NodeServiceError {
    /// Node not found by ID
    #[error("Node not found: {id}")]
    NodeNotFound { id: i64 },

    /// Validation failed for an update payload
    #[error("Node validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    /// Canonical store unreachable, failed, or timed out
    #[error("Canonical store unavailable: {0}")]
    StoreUnavailable(#[from] DatabaseError),

    /// Read-path search failure (no canonical fallback exists)
    #[error("Search failed: {0}")]
    SearchFailed(#[source] MirrorError),

    /// Malformed input that never reached the store
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl NodeServiceError {
    /// Create a node not found error
    pub fn node_not_found(id: i64) -> Self {
        Self::NodeNotFound { id }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn search_failed(source: MirrorError) -> Self {
        Self::SearchFailed(source)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NodeNotFound { .. })
    }

    /// True when a deadline expired rather than the store reporting an error
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::StoreUnavailable(e) => e.is_timeout(),
            Self::SearchFailed(MirrorError::Timeout { .. }) => true,
            _ => false,
        }
    }
}
