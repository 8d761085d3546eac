//! Shared fixtures and fault-injecting doubles for the integration tests.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use mindmap_core::db::{DatabaseError, DatabaseService, NodeStore, TursoStore};
use mindmap_core::mirrors::{
    GraphMirror, InMemoryGraphMirror, InMemorySearchMirror, MirrorError, MirrorKind, SearchMirror,
};
use mindmap_core::models::{DeleteResult, NewNode, Node, NodeUpdate, SearchDocument};
use mindmap_core::services::NodeService;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Real libsql store in a temp directory, plus in-process mirrors
pub struct Harness {
    pub service: NodeService,
    pub store: Arc<CountingStore>,
    pub graph: Arc<InMemoryGraphMirror>,
    pub search: Arc<InMemorySearchMirror>,
    pub _temp_dir: TempDir,
}

pub async fn create_test_store() -> Result<(Arc<TursoStore>, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let db = Arc::new(DatabaseService::new(db_path).await?);
    Ok((Arc::new(TursoStore::new(db)), temp_dir))
}

pub async fn create_harness() -> Result<Harness> {
    let (turso, temp_dir) = create_test_store().await?;
    let store = Arc::new(CountingStore::new(turso));
    let graph = Arc::new(InMemoryGraphMirror::new());
    let search = Arc::new(InMemorySearchMirror::new());
    let service = NodeService::new(store.clone(), graph.clone(), search.clone());

    Ok(Harness {
        service,
        store,
        graph,
        search,
        _temp_dir: temp_dir,
    })
}

/// Wraps a store and counts writes
pub struct CountingStore {
    inner: Arc<dyn NodeStore>,
    writes: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: Arc<dyn NodeStore>) -> Self {
        Self {
            inner,
            writes: AtomicUsize::new(0),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NodeStore for CountingStore {
    async fn create_node(&self, node: NewNode) -> Result<Node, DatabaseError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.create_node(node).await
    }

    async fn get_node(&self, id: i64) -> Result<Option<Node>, DatabaseError> {
        self.inner.get_node(id).await
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, DatabaseError> {
        self.inner.list_nodes().await
    }

    async fn update_node(
        &self,
        id: i64,
        update: NodeUpdate,
    ) -> Result<Option<Node>, DatabaseError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update_node(id, update).await
    }

    async fn delete_node(&self, id: i64) -> Result<DeleteResult, DatabaseError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_node(id).await
    }

    async fn find_ids_by_name(&self, name: &str) -> Result<Vec<i64>, DatabaseError> {
        self.inner.find_ids_by_name(name).await
    }

    async fn close(&self) -> Result<(), DatabaseError> {
        self.inner.close().await
    }
}

/// Store whose every call fails, or hangs past any deadline
pub struct BrokenStore {
    pub hang: bool,
}

impl BrokenStore {
    async fn fail<T>(&self) -> Result<T, DatabaseError> {
        if self.hang {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Err(DatabaseError::sql_execution("store is down"))
    }
}

#[async_trait]
impl NodeStore for BrokenStore {
    async fn create_node(&self, _node: NewNode) -> Result<Node, DatabaseError> {
        self.fail().await
    }

    async fn get_node(&self, _id: i64) -> Result<Option<Node>, DatabaseError> {
        self.fail().await
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, DatabaseError> {
        self.fail().await
    }

    async fn update_node(
        &self,
        _id: i64,
        _update: NodeUpdate,
    ) -> Result<Option<Node>, DatabaseError> {
        self.fail().await
    }

    async fn delete_node(&self, _id: i64) -> Result<DeleteResult, DatabaseError> {
        self.fail().await
    }

    async fn find_ids_by_name(&self, _name: &str) -> Result<Vec<i64>, DatabaseError> {
        self.fail().await
    }

    async fn close(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

/// Mirror double that records calls and fails (or hangs) on demand
#[derive(Default)]
pub struct FaultyMirror {
    pub fail: bool,
    pub hang: bool,
    pub calls: AtomicUsize,
}

impl FaultyMirror {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn call(&self, mirror: MirrorKind) -> Result<(), MirrorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.fail {
            return Err(MirrorError::unavailable(mirror, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl GraphMirror for FaultyMirror {
    async fn merge_child_of(&self, _child_id: i64, _parent_id: i64) -> Result<(), MirrorError> {
        self.call(MirrorKind::Graph).await
    }

    async fn detach_delete(&self, _node_id: i64) -> Result<(), MirrorError> {
        self.call(MirrorKind::Graph).await
    }

    async fn parents_of(&self, _node_id: i64) -> Result<Vec<i64>, MirrorError> {
        self.call(MirrorKind::Graph).await.map(|_| Vec::new())
    }

    async fn children_of(&self, _node_id: i64) -> Result<Vec<i64>, MirrorError> {
        self.call(MirrorKind::Graph).await.map(|_| Vec::new())
    }
}

#[async_trait]
impl SearchMirror for FaultyMirror {
    async fn upsert_documents(&self, _documents: &[SearchDocument]) -> Result<(), MirrorError> {
        self.call(MirrorKind::Search).await
    }

    async fn delete_document(&self, _id: i64) -> Result<(), MirrorError> {
        self.call(MirrorKind::Search).await
    }

    async fn search(
        &self,
        _query: &str,
        _limit: usize,
    ) -> Result<Vec<SearchDocument>, MirrorError> {
        self.call(MirrorKind::Search).await.map(|_| Vec::new())
    }
}
