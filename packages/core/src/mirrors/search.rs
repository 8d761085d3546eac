//! Search Mirror
//!
//! Materializes `{id, name, description}` documents keyed by canonical id.
//! Documents are fully replaced on every write.

use crate::mirrors::MirrorError;
use crate::models::SearchDocument;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Default page size for free-text queries
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Text index keyed by canonical ids
#[async_trait]
pub trait SearchMirror: Send + Sync {
    /// Add or fully replace documents by id
    async fn upsert_documents(&self, documents: &[SearchDocument]) -> Result<(), MirrorError>;

    /// Remove a document; a missing id is a no-op
    async fn delete_document(&self, id: i64) -> Result<(), MirrorError>;

    /// Free-text query over name and description
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchDocument>, MirrorError>;
}

/// Process-local search mirror, used when no search host is configured
///
/// Matches case-insensitive substrings of name or description, ascending id.
#[derive(Default)]
pub struct InMemorySearchMirror {
    documents: RwLock<BTreeMap<i64, SearchDocument>>,
}

impl InMemorySearchMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: i64) -> Option<SearchDocument> {
        self.documents.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl SearchMirror for InMemorySearchMirror {
    async fn upsert_documents(&self, documents: &[SearchDocument]) -> Result<(), MirrorError> {
        let mut index = self.documents.write().await;
        for document in documents {
            index.insert(document.id, document.clone());
        }
        Ok(())
    }

    async fn delete_document(&self, id: i64) -> Result<(), MirrorError> {
        self.documents.write().await.remove(&id);
        Ok(())
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchDocument>, MirrorError> {
        let needle = query.trim().to_lowercase();
        let index = self.documents.read().await;

        Ok(index
            .values()
            .filter(|doc| {
                needle.is_empty()
                    || doc.name.to_lowercase().contains(&needle)
                    || doc.description.to_lowercase().contains(&needle)
            })
            .take(limit)
            .cloned()
            .collect())
    }
}
