//! SurrealDB Graph Mirror Tests
//!
//! Runs `SurrealGraphMirror` against the embedded `kv-mem` engine.
//!
//! ## Edge Direction
//! - `child_of` edge: child vertex → parent vertex
//! - `node:<id>` record ids carry the canonical integer id

#[cfg(test)]
mod surreal_graph_tests {
    use anyhow::Result;
    use mindmap_core::mirrors::{GraphMirror, SurrealGraphMirror};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_merge_creates_single_edge() -> Result<()> {
        let graph = SurrealGraphMirror::new_in_memory().await?;

        graph.merge_child_of(2, 1).await?;
        graph.merge_child_of(2, 1).await?;
        graph.merge_child_of(2, 1).await?;

        assert_eq!(graph.parents_of(2).await?, vec![1]);
        assert_eq!(graph.children_of(1).await?, vec![2]);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_merges_of_one_edge_all_succeed() -> Result<()> {
        let graph = Arc::new(SurrealGraphMirror::new_in_memory().await?);

        let merges: Vec<_> = (0..8)
            .map(|_| {
                let graph = graph.clone();
                tokio::spawn(async move { graph.merge_child_of(2, 1).await })
            })
            .collect();

        for merge in merges {
            merge.await??;
        }

        assert_eq!(graph.parents_of(2).await?, vec![1]);
        assert_eq!(graph.children_of(1).await?, vec![2]);
        Ok(())
    }

    #[tokio::test]
    async fn test_child_can_accumulate_parents() -> Result<()> {
        let graph = SurrealGraphMirror::new_in_memory().await?;

        graph.merge_child_of(3, 1).await?;
        graph.merge_child_of(3, 2).await?;

        assert_eq!(graph.parents_of(3).await?, vec![1, 2]);
        Ok(())
    }

    #[tokio::test]
    async fn test_detach_delete_removes_vertex_and_edges() -> Result<()> {
        let graph = SurrealGraphMirror::new_in_memory().await?;
        graph.merge_child_of(2, 1).await?;
        graph.merge_child_of(3, 2).await?;

        graph.detach_delete(2).await?;

        assert!(graph.children_of(1).await?.is_empty());
        assert!(graph.parents_of(3).await?.is_empty());
        assert!(graph.parents_of(2).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_detach_delete_unknown_vertex_is_noop() -> Result<()> {
        let graph = SurrealGraphMirror::new_in_memory().await?;

        graph.detach_delete(404).await?;

        assert!(graph.parents_of(404).await?.is_empty());
        Ok(())
    }
}
