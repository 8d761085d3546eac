//! Realtime Channel Manager
//!
//! Dispatches inbound events to one of two paths:
//!
//! - **Relay** (`node_move`): fan out to peers in the same namespace. Never
//!   touches storage and never waits on it.
//! - **Persist** (`node_drag_end`): snap the coordinates to whole pixels and
//!   hand a position-only update to the sync orchestrator on a detached task.
//!   Nothing is broadcast, and failures are logged rather than sent back.
//!
//! The channel is transport-agnostic; the HTTP server owns the websocket and
//! feeds text frames in through [`RealtimeChannel::handle_text`].

use crate::models::{Node, NodeUpdate};
use crate::realtime::protocol::{
    snap_to_pixel, ClientEvent, EventPayload, NodePosition, ServerEvent,
};
use crate::realtime::sessions::{SessionContext, SessionHandle, SessionRegistry};
use crate::services::{NodeService, NodeServiceError};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Namespace used when a client does not pick one
pub const DEFAULT_NAMESPACE: &str = "mindmap";

/// What happened to one inbound event
#[derive(Debug)]
pub enum Dispatch {
    /// Move relayed to this many peer sessions
    Relayed { recipients: usize },
    /// Drag-end persistence running in the background
    Persisting(JoinHandle<Result<Node, NodeServiceError>>),
    /// Malformed or unusable event; logged and dropped
    Rejected(String),
}

#[derive(Clone)]
pub struct RealtimeChannel {
    registry: Arc<SessionRegistry>,
    nodes: NodeService,
}

impl RealtimeChannel {
    pub fn new(registry: Arc<SessionRegistry>, nodes: NodeService) -> Self {
        Self { registry, nodes }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn connect(&self, namespace: &str) -> SessionHandle {
        let handle = self.registry.connect(namespace);
        tracing::info!(
            session_id = %handle.context.id,
            namespace,
            "Realtime session connected"
        );
        handle
    }

    pub fn disconnect(&self, context: &SessionContext) {
        if self.registry.disconnect(context) {
            tracing::info!(
                session_id = %context.id,
                namespace = %context.namespace,
                "Realtime session disconnected"
            );
        }
    }

    /// Decode one text frame and dispatch it
    pub fn handle_text(&self, context: &SessionContext, text: &str) -> Dispatch {
        match serde_json::from_str::<ClientEvent>(text) {
            Ok(event) => self.handle_event(context, event),
            Err(e) => {
                tracing::warn!(session_id = %context.id, error = %e, "Ignoring malformed realtime frame");
                Dispatch::Rejected(e.to_string())
            }
        }
    }

    pub fn handle_event(&self, context: &SessionContext, event: ClientEvent) -> Dispatch {
        match event {
            ClientEvent::NodeMove(payload) => {
                let recipients = self.registry.broadcast_except(
                    &context.namespace,
                    context.id,
                    ServerEvent::NodeMoved(payload),
                );
                Dispatch::Relayed { recipients }
            }
            ClientEvent::NodeDragEnd(payload) => self.persist_drag_end(context, &payload),
        }
    }

    fn persist_drag_end(&self, context: &SessionContext, payload: &EventPayload) -> Dispatch {
        let position = match NodePosition::from_payload(payload) {
            Ok(position) => position,
            Err(e) => {
                tracing::warn!(session_id = %context.id, error = %e, "Ignoring unusable drag end");
                return Dispatch::Rejected(e.to_string());
            }
        };
        let id = position.id;

        let Some((x, y)) = snap_to_pixel(position.x).zip(snap_to_pixel(position.y)) else {
            tracing::warn!(session_id = %context.id, node_id = id, "Drag end with unusable coordinates");
            return Dispatch::Rejected(format!("invalid coordinates for node {}", id));
        };

        let nodes = self.nodes.clone();
        let session_id = context.id;
        let task = tokio::spawn(async move {
            let result = nodes.update_node(id, NodeUpdate::position(x, y)).await;
            if let Err(e) = &result {
                tracing::error!(
                    %session_id,
                    node_id = id,
                    error = %e,
                    "Failed to persist drag end position"
                );
            }
            result
        });

        Dispatch::Persisting(task)
    }
}
