//! Parent Resolution
//!
//! Maps the free-text `parent` reference in a node's metadata to a canonical
//! id. The reference is a *name*: duplicates are ambiguous and renaming the
//! parent silently breaks the link. Resolution sits behind a trait so an
//! id-based or fuzzy strategy can replace it without touching the orchestrator.

use crate::db::{DatabaseError, NodeStore};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait ParentResolver: Send + Sync {
    /// Canonical id for `parent_name`, or `None` when nothing matches
    async fn resolve(&self, parent_name: &str) -> Result<Option<i64>, DatabaseError>;
}

/// Case-insensitive exact-name lookup in the canonical store
///
/// Tie-break: when several nodes share the name, the lowest id wins. Case
/// folding is whatever the store's `lower()` does (ASCII only for SQLite).
pub struct NameParentResolver {
    store: Arc<dyn NodeStore>,
}

impl NameParentResolver {
    pub fn new(store: Arc<dyn NodeStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ParentResolver for NameParentResolver {
    async fn resolve(&self, parent_name: &str) -> Result<Option<i64>, DatabaseError> {
        let ids = self.store.find_ids_by_name(parent_name).await?;
        Ok(ids.into_iter().min())
    }
}
