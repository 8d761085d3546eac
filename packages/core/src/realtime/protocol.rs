//! Realtime wire protocol
//!
//! JSON text frames tagged by `type`:
//!
//! ```json
//! {"type": "node_move",     "id": 7,   "x": 120.5, "y": 80}
//! {"type": "node_drag_end", "id": "7", "x": 42.7,  "y": 13.2}
//! {"type": "node_moved",    "id": 7,   "x": 120.5, "y": 80}
//! ```
//!
//! Move payloads are opaque: whatever object follows the tag is relayed as
//! received. Only drag-end is interpreted, through [`NodePosition::from_payload`],
//! which accepts numbers and numeric strings for the id and both coordinates.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Event body without its `type` tag
pub type EventPayload = Map<String, Value>;

/// Inbound events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// In-progress drag position; relayed to peers, never stored
    NodeMove(EventPayload),
    /// Terminal drag position; stored, never relayed
    NodeDragEnd(EventPayload),
}

/// Outbound events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    NodeMoved(EventPayload),
}

/// `{id, x, y}` body, for callers building events in code
pub fn position_payload(id: impl Into<Value>, x: f64, y: f64) -> EventPayload {
    let mut payload = Map::new();
    payload.insert("id".to_string(), id.into());
    payload.insert("x".to_string(), Value::from(x));
    payload.insert("y".to_string(), Value::from(y));
    payload
}

#[derive(Debug, Error, PartialEq)]
pub enum PositionError {
    #[error("invalid node id: {0}")]
    InvalidId(Value),

    #[error("invalid {axis} coordinate: {value}")]
    InvalidCoordinate { axis: &'static str, value: Value },
}

/// Drag-end target after coercion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodePosition {
    pub id: i64,
    pub x: f64,
    pub y: f64,
}

impl NodePosition {
    /// Read `id`, `x` and `y` out of a drag-end body
    ///
    /// The id must be integral (`7`, `7.0` and `"7"` all name node 7).
    /// Coordinates must be finite.
    pub fn from_payload(payload: &EventPayload) -> Result<Self, PositionError> {
        let raw_id = payload.get("id").cloned().unwrap_or(Value::Null);
        let id = coerce_number(&raw_id)
            .filter(|v| v.fract() == 0.0 && v.abs() <= MAX_SAFE_INTEGER)
            .map(|v| v as i64)
            .ok_or(PositionError::InvalidId(raw_id))?;

        Ok(Self {
            id,
            x: coordinate(payload, "x")?,
            y: coordinate(payload, "y")?,
        })
    }
}

/// Largest integer a JSON client can send without precision loss
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn coordinate(payload: &EventPayload, axis: &'static str) -> Result<f64, PositionError> {
    let value = payload.get(axis).cloned().unwrap_or(Value::Null);
    coerce_number(&value).ok_or(PositionError::InvalidCoordinate { axis, value })
}

/// Finite number from a JSON number or numeric string
fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Round a drag-end coordinate to a whole pixel, half up (`floor(v + 0.5)`)
///
/// Non-finite values are rejected.
pub fn snap_to_pixel(value: f64) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    Some((value + 0.5).floor())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> EventPayload {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {}", other),
        }
    }

    #[test]
    fn test_parse_tags() {
        let event: ClientEvent =
            serde_json::from_value(json!({"type": "node_move", "id": 7, "x": 1.5, "y": 2}))
                .unwrap();
        assert_eq!(
            event,
            ClientEvent::NodeMove(body(json!({"id": 7, "x": 1.5, "y": 2})))
        );

        let event: ClientEvent =
            serde_json::from_value(json!({"type": "node_drag_end", "id": "12", "x": 0, "y": 0}))
                .unwrap();
        let ClientEvent::NodeDragEnd(payload) = event else {
            panic!("expected node_drag_end");
        };
        assert_eq!(NodePosition::from_payload(&payload).unwrap().id, 12);
    }

    #[test]
    fn test_relay_preserves_payload_form() {
        let inbound = json!({
            "type": "node_move",
            "id": 7.0,
            "x": "120.5",
            "y": null,
            "color": "red"
        });
        let ClientEvent::NodeMove(payload) = serde_json::from_value(inbound).unwrap() else {
            panic!("expected node_move");
        };

        let outbound = serde_json::to_value(ServerEvent::NodeMoved(payload)).unwrap();
        assert_eq!(
            outbound,
            json!({"type": "node_moved", "id": 7.0, "x": "120.5", "y": null, "color": "red"})
        );
    }

    #[test]
    fn test_unknown_event_type_is_rejected() {
        let result = serde_json::from_value::<ClientEvent>(json!({"type": "node_delete", "id": 1}));
        assert!(result.is_err());
    }

    #[test]
    fn test_drag_end_coercion() {
        let position =
            NodePosition::from_payload(&body(json!({"id": 7.0, "x": "42.7", "y": 13}))).unwrap();
        assert_eq!(position, NodePosition { id: 7, x: 42.7, y: 13.0 });

        let position =
            NodePosition::from_payload(&body(json!({"id": " 5 ", "x": 0, "y": -1.5}))).unwrap();
        assert_eq!(position.id, 5);
    }

    #[test]
    fn test_drag_end_rejects_unusable_values() {
        assert!(matches!(
            NodePosition::from_payload(&body(json!({"id": "abc", "x": 1, "y": 1}))),
            Err(PositionError::InvalidId(_))
        ));
        assert!(matches!(
            NodePosition::from_payload(&body(json!({"id": 7.5, "x": 1, "y": 1}))),
            Err(PositionError::InvalidId(_))
        ));
        assert!(matches!(
            NodePosition::from_payload(&body(json!({"x": 1, "y": 1}))),
            Err(PositionError::InvalidId(_))
        ));
        assert_eq!(
            NodePosition::from_payload(&body(json!({"id": 1, "x": "left", "y": 1}))),
            Err(PositionError::InvalidCoordinate {
                axis: "x",
                value: json!("left")
            })
        );
    }

    #[test]
    fn test_position_payload_shape() {
        assert_eq!(
            Value::Object(position_payload(3, 1.0, 2.5)),
            json!({"id": 3, "x": 1.0, "y": 2.5})
        );
    }

    #[test]
    fn test_snap_to_pixel_rounds_half_up() {
        assert_eq!(snap_to_pixel(42.7), Some(43.0));
        assert_eq!(snap_to_pixel(13.2), Some(13.0));
        assert_eq!(snap_to_pixel(2.5), Some(3.0));
        assert_eq!(snap_to_pixel(-2.5), Some(-2.0));
        assert_eq!(snap_to_pixel(f64::NAN), None);
        assert_eq!(snap_to_pixel(f64::INFINITY), None);
    }
}
