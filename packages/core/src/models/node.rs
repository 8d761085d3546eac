//! Node Data Structures
//!
//! This module defines the canonical `Node` record and the payloads used to
//! create and update it.
//!
//! # Architecture
//!
//! - **Canonical Node**: One row per node in the canonical store; the integer
//!   `id` is the only key shared with the graph and search mirrors
//! - **Open metadata**: `metadata` is a schemaless JSON object. The engine reads
//!   `type`, `parent` and `source`; every other key is carried through untouched
//! - **Merge updates**: `NodeUpdate` is sparse. Omitted fields keep their stored
//!   value and metadata is merged key-by-key
//!
//! # Examples
//!
//! ```rust
//! use mindmap_core::models::{NewNode, NodeUpdate};
//! use serde_json::{json, Map};
//!
//! let mut extra = Map::new();
//! extra.insert("parent".to_string(), json!("Grandpa"));
//!
//! let new_node = NewNode::new("Sylar", "Bio", Some("family_member"), extra);
//! assert_eq!(new_node.metadata["type"], "family_member");
//! assert_eq!(new_node.metadata["source"], "dashboard");
//!
//! // Position-only update (drag end)
//! let update = NodeUpdate::position(43.0, 13.0);
//! assert!(update.name.is_none());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Name used when a node is created without one
pub const DEFAULT_NODE_NAME: &str = "Untitled";

/// Category tag used when a node is created without a type
pub const DEFAULT_NODE_TYPE: &str = "default";

/// Provenance tag stamped on every node created through the engine
pub const DEFAULT_NODE_SOURCE: &str = "dashboard";

/// Metadata key holding the category tag
pub const METADATA_TYPE_KEY: &str = "type";

/// Metadata key holding the parent's *name*
pub const METADATA_PARENT_KEY: &str = "parent";

/// Metadata key holding the provenance tag
pub const METADATA_SOURCE_KEY: &str = "source";

/// Validation errors for node payloads
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Node name must not be empty")]
    EmptyName,

    #[error("Coordinate {axis} must be a finite number, got {value}")]
    NonFiniteCoordinate { axis: char, value: f64 },
}

/// Canonical node record.
///
/// # Fields
///
/// - `id`: Store-assigned integer, immutable and never reused
/// - `name`: Display name; not unique
/// - `description`: Free text, may contain markup the engine never parses
/// - `metadata`: Open JSON object (`type`, `parent`, `source` + arbitrary keys)
/// - `x`, `y`: Canvas coordinates, `0,0` means "unpositioned"
/// - `created_at`: Set once by the store at insert time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub metadata: Map<String, Value>,
    pub x: f64,
    pub y: f64,
    pub created_at: DateTime<Utc>,
}

impl Node {
    /// Category tag, falling back to `"default"` when absent or not a string
    pub fn node_type(&self) -> &str {
        self.metadata
            .get(METADATA_TYPE_KEY)
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_NODE_TYPE)
    }

    /// Parent reference by name, if the metadata carries a non-empty string.
    ///
    /// The reference is a *name*, not an id. Duplicate names are ambiguous and
    /// renaming the parent silently breaks the link.
    pub fn parent_name(&self) -> Option<&str> {
        self.metadata
            .get(METADATA_PARENT_KEY)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Searchable projection of this node
    pub fn search_document(&self) -> SearchDocument {
        SearchDocument {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }

    /// Apply a sparse update, producing the row that should be written back.
    ///
    /// Metadata is merged shallowly (new keys win), everything else is replaced
    /// only when present in the update. `id` and `created_at` never change.
    pub fn merged_with(&self, update: &NodeUpdate) -> Node {
        let mut merged = self.clone();

        if let Some(name) = &update.name {
            merged.name = name.clone();
        }
        if let Some(description) = &update.description {
            merged.description = description.clone();
        }
        if let Some(metadata) = &update.metadata {
            for (key, value) in metadata {
                merged.metadata.insert(key.clone(), value.clone());
            }
        }
        if let Some(x) = update.x {
            merged.x = x;
        }
        if let Some(y) = update.y {
            merged.y = y;
        }

        merged
    }
}

/// Insert payload for the canonical store.
///
/// Built with [`NewNode::new`], which applies the creation defaults: blank
/// names become `"Untitled"`, the type defaults to `"default"` and `source` is
/// stamped as `"dashboard"`. The `type` and `source` keys always override any
/// value supplied in the extra metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNode {
    pub name: String,
    pub description: String,
    pub metadata: Map<String, Value>,
}

impl NewNode {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        node_type: Option<&str>,
        extra_metadata: Map<String, Value>,
    ) -> Self {
        let name = name.into();
        let name = if name.trim().is_empty() {
            DEFAULT_NODE_NAME.to_string()
        } else {
            name
        };

        let node_type = node_type
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_NODE_TYPE);

        let mut metadata = extra_metadata;
        metadata.insert(
            METADATA_TYPE_KEY.to_string(),
            Value::String(node_type.to_string()),
        );
        metadata.insert(
            METADATA_SOURCE_KEY.to_string(),
            Value::String(DEFAULT_NODE_SOURCE.to_string()),
        );

        Self {
            name,
            description: description.into(),
            metadata,
        }
    }
}

/// Sparse update for an existing node.
///
/// Every field is optional; `None` means "keep the stored value". This is what
/// lets the realtime channel persist a position without touching content, and
/// an editor save content without touching position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Keys merged into the stored metadata (not a replacement)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

impl NodeUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position-only update, as issued when a drag gesture ends
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.metadata.is_none()
            && self.x.is_none()
            && self.y.is_none()
    }

    /// Reject updates that would store an invalid row
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(ValidationError::EmptyName);
            }
        }
        for (axis, value) in [('x', self.x), ('y', self.y)] {
            if let Some(value) = value {
                if !value.is_finite() {
                    return Err(ValidationError::NonFiniteCoordinate { axis, value });
                }
            }
        }
        Ok(())
    }
}

/// Document stored in the search mirror, keyed by canonical id.
///
/// Fully replaced on every write, never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: i64,
    pub name: String,
    pub description: String,
}

/// Result of a canonical delete.
///
/// Deleting a missing id is not an error; `existed` only records whether a row
/// was actually removed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteResult {
    pub existed: bool,
}

impl DeleteResult {
    pub fn existed() -> Self {
        Self { existed: true }
    }

    pub fn not_found() -> Self {
        Self { existed: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_node() -> Node {
        let mut metadata = Map::new();
        metadata.insert("type".into(), json!("person"));
        metadata.insert("source".into(), json!("dashboard"));
        metadata.insert("nickname".into(), json!("Gramps"));
        Node {
            id: 7,
            name: "Grandpa".into(),
            description: "Bio".into(),
            metadata,
            x: 5.0,
            y: 6.0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_new_node_applies_defaults() {
        let node = NewNode::new("   ", "", None, Map::new());
        assert_eq!(node.name, DEFAULT_NODE_NAME);
        assert_eq!(node.metadata["type"], "default");
        assert_eq!(node.metadata["source"], "dashboard");
    }

    #[test]
    fn test_new_node_fixed_keys_override_extra_metadata() {
        let mut extra = Map::new();
        extra.insert("type".into(), json!("ignored"));
        extra.insert("source".into(), json!("import"));
        extra.insert("parent".into(), json!("Grandpa"));

        let node = NewNode::new("Dad", "", Some("family_member"), extra);
        assert_eq!(node.metadata["type"], "family_member");
        assert_eq!(node.metadata["source"], "dashboard");
        assert_eq!(node.metadata["parent"], "Grandpa");
    }

    #[test]
    fn test_position_update_leaves_content_untouched() {
        let node = sample_node();
        let merged = node.merged_with(&NodeUpdate::position(10.0, 20.0));

        assert_eq!(merged.x, 10.0);
        assert_eq!(merged.y, 20.0);
        assert_eq!(merged.name, node.name);
        assert_eq!(merged.description, node.description);
        assert_eq!(merged.metadata, node.metadata);
        assert_eq!(merged.created_at, node.created_at);
    }

    #[test]
    fn test_metadata_merge_keeps_unknown_keys() {
        let node = sample_node();
        let mut patch = Map::new();
        patch.insert("type".into(), json!("ancestor"));
        patch.insert("parent".into(), json!("Great Grandpa"));

        let merged = node.merged_with(&NodeUpdate::new().with_metadata(patch));
        assert_eq!(merged.metadata["type"], "ancestor");
        assert_eq!(merged.metadata["parent"], "Great Grandpa");
        assert_eq!(merged.metadata["nickname"], "Gramps");
        assert_eq!(merged.x, node.x);
    }

    #[test]
    fn test_parent_name_ignores_blank_and_non_string_values() {
        let mut node = sample_node();
        assert_eq!(node.parent_name(), None);

        node.metadata.insert("parent".into(), json!("  "));
        assert_eq!(node.parent_name(), None);

        node.metadata.insert("parent".into(), json!(42));
        assert_eq!(node.parent_name(), None);

        node.metadata.insert("parent".into(), json!(" Grandma "));
        assert_eq!(node.parent_name(), Some("Grandma"));
    }

    #[test]
    fn test_validate_rejects_blank_name_and_nan() {
        assert_eq!(
            NodeUpdate::new().with_name(" ").validate(),
            Err(ValidationError::EmptyName)
        );
        assert!(matches!(
            NodeUpdate::position(f64::NAN, 1.0).validate(),
            Err(ValidationError::NonFiniteCoordinate { axis: 'x', .. })
        ));
        assert!(NodeUpdate::position(1.0, 2.0).validate().is_ok());
    }

    #[test]
    fn test_update_deserializes_sparse_payload() {
        let update: NodeUpdate = serde_json::from_value(json!({"x": 1.5})).unwrap();
        assert_eq!(update.x, Some(1.5));
        assert!(update.name.is_none());
        assert!(update.metadata.is_none());
        assert!(!update.is_empty());
    }
}
