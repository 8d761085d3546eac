//! Relationship Sync Tests
//!
//! `CHILD_OF` derivation from `metadata.parent` and the best-effort mirror
//! policy:
//!
//! - exactly one edge no matter how often derivation repeats
//! - unmatched parent name is a silent no-op
//! - duplicate names resolve to the lowest id
//! - a node never becomes its own parent
//! - graph/search failures and timeouts never fail the canonical write

mod common;

#[cfg(test)]
mod relationship_sync_tests {
    use super::common::{create_test_store, CountingStore, FaultyMirror};
    use anyhow::Result;
    use async_trait::async_trait;
    use mindmap_core::db::DatabaseError;
    use mindmap_core::mirrors::{GraphMirror, InMemoryGraphMirror, InMemorySearchMirror};
    use mindmap_core::models::NodeUpdate;
    use mindmap_core::services::{
        CreateNodeParams, MirrorOutcome, NodeService, ParentResolver, SyncConfig,
    };
    use serde_json::{json, Map};
    use std::sync::Arc;
    use std::time::Duration;

    fn parent_update(name: &str) -> NodeUpdate {
        let mut metadata = Map::new();
        metadata.insert("parent".to_string(), json!(name));
        NodeUpdate::new().with_metadata(metadata)
    }

    #[tokio::test]
    async fn test_parent_derivation_creates_exactly_one_edge() -> Result<()> {
        let (store, _temp_dir) = create_test_store().await?;
        let graph = Arc::new(InMemoryGraphMirror::new());
        let service =
            NodeService::new(store, graph.clone(), Arc::new(InMemorySearchMirror::new()));

        let grandpa = service.create_node(CreateNodeParams::named("Grandpa")).await?;
        let dad = service.create_node(CreateNodeParams::named("Dad")).await?;

        let first = service.update_node_synced(dad.id, parent_update("Grandpa")).await?;
        assert_eq!(first.graph, MirrorOutcome::Synced);

        // Repeated updates (including position-only ones that keep the parent key)
        service.update_node(dad.id, parent_update("grandpa")).await?;
        service.update_node(dad.id, NodeUpdate::position(3.0, 4.0)).await?;

        assert_eq!(graph.edge_count().await, 1);
        assert_eq!(graph.parents_of(dad.id).await?, vec![grandpa.id]);
        assert_eq!(graph.children_of(grandpa.id).await?, vec![dad.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_unmatched_parent_is_noop() -> Result<()> {
        let (store, _temp_dir) = create_test_store().await?;
        let graph = Arc::new(InMemoryGraphMirror::new());
        let service =
            NodeService::new(store, graph.clone(), Arc::new(InMemorySearchMirror::new()));
        let dad = service.create_node(CreateNodeParams::named("Dad")).await?;

        let synced = service
            .update_node_synced(dad.id, parent_update("Nobody"))
            .await?;

        assert_eq!(synced.graph, MirrorOutcome::Skipped);
        assert_eq!(synced.record.metadata["parent"], json!("Nobody"));
        assert_eq!(graph.edge_count().await, 0);

        // Parent created later: no retroactive edge
        service.create_node(CreateNodeParams::named("Nobody")).await?;
        assert_eq!(graph.edge_count().await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_parent_names_resolve_to_lowest_id() -> Result<()> {
        let (store, _temp_dir) = create_test_store().await?;
        let graph = Arc::new(InMemoryGraphMirror::new());
        let service =
            NodeService::new(store, graph.clone(), Arc::new(InMemorySearchMirror::new()));

        let first = service.create_node(CreateNodeParams::named("Grandpa")).await?;
        let _second = service.create_node(CreateNodeParams::named("GRANDPA")).await?;
        let dad = service.create_node(CreateNodeParams::named("Dad")).await?;

        service.update_node(dad.id, parent_update("grandpa")).await?;

        assert_eq!(graph.parents_of(dad.id).await?, vec![first.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_self_reference_is_skipped() -> Result<()> {
        let (store, _temp_dir) = create_test_store().await?;
        let graph = Arc::new(InMemoryGraphMirror::new());
        let service =
            NodeService::new(store, graph.clone(), Arc::new(InMemorySearchMirror::new()));
        let narcissus = service.create_node(CreateNodeParams::named("Narcissus")).await?;

        let synced = service
            .update_node_synced(narcissus.id, parent_update("Narcissus"))
            .await?;

        assert_eq!(synced.graph, MirrorOutcome::Skipped);
        assert_eq!(graph.edge_count().await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_mirror_failures_never_fail_the_write() -> Result<()> {
        let (turso, _temp_dir) = create_test_store().await?;
        let store = Arc::new(CountingStore::new(turso));
        let graph = Arc::new(FaultyMirror::failing());
        let search = Arc::new(FaultyMirror::failing());
        let service = NodeService::new(store.clone(), graph.clone(), search.clone());

        let created = service
            .create_node_synced(CreateNodeParams::named("Grandpa"))
            .await?;
        assert!(created.search.is_failed());
        let dad = service.create_node(CreateNodeParams::named("Dad")).await?;

        let updated = service
            .update_node_synced(dad.id, parent_update("Grandpa"))
            .await?;
        assert!(updated.search.is_failed());
        assert!(updated.graph.is_failed());
        assert!(!updated.fully_synced());

        // Canonical write landed regardless
        let stored = service.get_node(dad.id).await?.expect("node stored");
        assert_eq!(stored.metadata["parent"], json!("Grandpa"));

        let deleted = service.delete_node_synced(dad.id).await?;
        assert!(deleted.record.existed);
        assert!(deleted.graph.is_failed());
        assert!(service.get_node(dad.id).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_mirror_timeout_is_a_mirror_failure() -> Result<()> {
        let (store, _temp_dir) = create_test_store().await?;
        let service = NodeService::new(
            store,
            Arc::new(FaultyMirror::hanging()),
            Arc::new(FaultyMirror::hanging()),
        )
        .with_config(SyncConfig {
            store_timeout: Duration::from_secs(5),
            mirror_timeout: Duration::from_millis(50),
        });

        let grandpa = service
            .create_node_synced(CreateNodeParams::named("Grandpa"))
            .await?;
        assert!(grandpa.search.is_failed());

        let dad = service.create_node(CreateNodeParams::named("Dad")).await?;
        let updated = service
            .update_node_synced(dad.id, parent_update("Grandpa"))
            .await?;
        assert!(updated.graph.is_failed());
        assert_eq!(updated.record.metadata["parent"], json!("Grandpa"));
        Ok(())
    }

    #[tokio::test]
    async fn test_search_failure_is_surfaced_on_read_path() -> Result<()> {
        let (store, _temp_dir) = create_test_store().await?;
        let service = NodeService::new(
            store,
            Arc::new(InMemoryGraphMirror::new()),
            Arc::new(FaultyMirror::failing()),
        );

        assert!(service.search("anything", 10).await.is_err());
        Ok(())
    }

    struct FixedResolver(Option<i64>);

    #[async_trait]
    impl ParentResolver for FixedResolver {
        async fn resolve(&self, _parent_name: &str) -> Result<Option<i64>, DatabaseError> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn test_resolver_is_pluggable() -> Result<()> {
        let (store, _temp_dir) = create_test_store().await?;
        let graph = Arc::new(InMemoryGraphMirror::new());
        let service = NodeService::new(store, graph.clone(), Arc::new(InMemorySearchMirror::new()))
            .with_resolver(Arc::new(FixedResolver(Some(7))));
        let dad = service.create_node(CreateNodeParams::named("Dad")).await?;

        let outcome = service.sync_relationship(dad.id, "whatever").await;

        assert_eq!(outcome, MirrorOutcome::Synced);
        assert_eq!(graph.parents_of(dad.id).await?, vec![7]);
        Ok(())
    }
}
