//! Realtime Collaboration
//!
//! Position sharing during drag gestures:
//!
//! - [`protocol`] - JSON events (`node_move`, `node_drag_end`, `node_moved`)
//! - [`sessions`] - live sessions per namespace and lossy peer relay
//! - [`channel`] - dispatch to the relay path or the persistence path
//!
//! Sessions hold no server-side history; a reconnect is a fresh session.

pub mod channel;
pub mod protocol;
pub mod sessions;

pub use channel::{Dispatch, RealtimeChannel, DEFAULT_NAMESPACE};
pub use protocol::{
    position_payload, snap_to_pixel, ClientEvent, EventPayload, NodePosition, PositionError,
    ServerEvent,
};
pub use sessions::{
    SessionContext, SessionEvents, SessionHandle, SessionRegistry, DEFAULT_RELAY_CAPACITY,
};
