//! Mindmap Core - Synchronization & Realtime Collaboration Engine
//!
//! This crate keeps three independently-failing stores usefully consistent and
//! runs the live drag channel.
//!
//! # Architecture
//!
//! - **Canonical store**: libsql table `mindmap_nodes`, the single source of truth
//! - **Graph mirror**: `CHILD_OF` edges derived from `metadata.parent` (SurrealDB)
//! - **Search mirror**: `{id, name, description}` documents (Meilisearch)
//! - **Primary write, then best-effort fan-out**: mirror failures are logged and
//!   reported, never unwound into the canonical write
//!
//! # Modules
//!
//! - [`models`] - Node record and create/update payloads
//! - [`db`] - Canonical store (libsql)
//! - [`mirrors`] - Graph and search mirrors
//! - [`services`] - Sync orchestrator (`NodeService`)
//! - [`realtime`] - Session registry and move/drag-end dispatch

pub mod db;
pub mod mirrors;
pub mod models;
pub mod realtime;
pub mod services;

// Re-export commonly used types
pub use models::*;
pub use services::*;
