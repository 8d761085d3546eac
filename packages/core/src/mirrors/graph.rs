//! Graph Mirror
//!
//! Materializes directed `CHILD_OF` edges between canonical node ids. Vertices
//! merge by id and edges merge by endpoints, so every write is idempotent.

use crate::mirrors::MirrorError;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashSet};
use tokio::sync::RwLock;

/// Relationship store keyed by canonical ids
#[async_trait]
pub trait GraphMirror: Send + Sync {
    /// Ensure both vertices and the single `child -> parent` edge exist
    async fn merge_child_of(&self, child_id: i64, parent_id: i64) -> Result<(), MirrorError>;

    /// Remove a vertex and every edge touching it; missing vertices are a no-op
    async fn detach_delete(&self, node_id: i64) -> Result<(), MirrorError>;

    /// Parents of `node_id` (targets of its outgoing edges), ascending
    async fn parents_of(&self, node_id: i64) -> Result<Vec<i64>, MirrorError>;

    /// Children of `node_id` (sources of its incoming edges), ascending
    async fn children_of(&self, node_id: i64) -> Result<Vec<i64>, MirrorError>;
}

#[derive(Default)]
struct GraphState {
    vertices: HashSet<i64>,
    edges: BTreeSet<(i64, i64)>,
}

/// Process-local graph mirror, used when no graph endpoint is configured
#[derive(Default)]
pub struct InMemoryGraphMirror {
    state: RwLock<GraphState>,
}

impl InMemoryGraphMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn vertex_count(&self) -> usize {
        self.state.read().await.vertices.len()
    }

    pub async fn edge_count(&self) -> usize {
        self.state.read().await.edges.len()
    }
}

#[async_trait]
impl GraphMirror for InMemoryGraphMirror {
    async fn merge_child_of(&self, child_id: i64, parent_id: i64) -> Result<(), MirrorError> {
        let mut state = self.state.write().await;
        state.vertices.insert(child_id);
        state.vertices.insert(parent_id);
        state.edges.insert((child_id, parent_id));
        Ok(())
    }

    async fn detach_delete(&self, node_id: i64) -> Result<(), MirrorError> {
        let mut state = self.state.write().await;
        state.vertices.remove(&node_id);
        state
            .edges
            .retain(|(child, parent)| *child != node_id && *parent != node_id);
        Ok(())
    }

    async fn parents_of(&self, node_id: i64) -> Result<Vec<i64>, MirrorError> {
        let state = self.state.read().await;
        Ok(state
            .edges
            .iter()
            .filter(|(child, _)| *child == node_id)
            .map(|(_, parent)| *parent)
            .collect())
    }

    async fn children_of(&self, node_id: i64) -> Result<Vec<i64>, MirrorError> {
        let state = self.state.read().await;
        let mut children: Vec<i64> = state
            .edges
            .iter()
            .filter(|(_, parent)| *parent == node_id)
            .map(|(child, _)| *child)
            .collect();
        children.sort_unstable();
        Ok(children)
    }
}
