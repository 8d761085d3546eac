//! Business Services
//!
//! - `NodeService` - node lifecycle and the canonical-then-mirrors write pipeline
//! - `ParentResolver` - name-to-id resolution for relationship derivation
//!
//! Services coordinate between the canonical store and the mirrors; transports
//! (HTTP, realtime) call into them and never touch a store directly.

pub mod error;
pub mod node_service;
pub mod outcome;
pub mod parent_resolver;

pub use error::NodeServiceError;
pub use node_service::{CreateNodeParams, NodeService, SyncConfig, MAX_SEARCH_LIMIT};
pub use outcome::{MirrorOutcome, Synced};
pub use parent_resolver::{NameParentResolver, ParentResolver};
