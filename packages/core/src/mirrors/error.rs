//! Mirror Error Types
//!
//! Failures of the derived stores. Once a canonical write has succeeded these
//! are logged and recorded in a `MirrorOutcome`, never propagated.

use crate::db::DatabaseError;
use std::fmt;
use thiserror::Error;

/// Which derived store an error or outcome belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MirrorKind {
    Graph,
    Search,
}

impl fmt::Display for MirrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirrorKind::Graph => write!(f, "graph"),
            MirrorKind::Search => write!(f, "search"),
        }
    }
}

/// Graph and search mirror errors
#[derive(Error, Debug)]
pub enum MirrorError {
    /// SurrealDB query or connection failure
    #[error("Graph mirror query failed: {0}")]
    Graph(#[from] surrealdb::Error),

    /// Transport-level failure talking to the search service
    #[error("Search mirror request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Search service answered with a non-success status
    #[error("Search mirror rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// Mirror call did not complete within the configured deadline
    #[error("{mirror} mirror call timed out after {timeout_ms}ms")]
    Timeout { mirror: MirrorKind, timeout_ms: u64 },

    /// Parent lookup in the canonical store failed during derivation
    #[error("Parent lookup failed: {0}")]
    ParentLookup(#[source] DatabaseError),

    /// Mirror is not reachable or refused the operation
    #[error("{mirror} mirror unavailable: {reason}")]
    Unavailable { mirror: MirrorKind, reason: String },
}

impl MirrorError {
    pub fn rejected(status: u16, body: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            body: body.into(),
        }
    }

    pub fn timeout(mirror: MirrorKind, timeout_ms: u64) -> Self {
        Self::Timeout { mirror, timeout_ms }
    }

    pub fn unavailable(mirror: MirrorKind, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            mirror,
            reason: reason.into(),
        }
    }
}
