//! WebSocket adapter for the realtime channel
//!
//! - `GET /mindmap/ws` - join the default `mindmap` namespace
//! - `GET /ws/:namespace` - join a named collaboration space
//!
//! Each socket is split into a send task (peer events → client) and a
//! receive task (client frames → `RealtimeChannel`). Whichever ends first
//! aborts the other, then the session is removed.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{sink::SinkExt, stream::StreamExt};
use mindmap_core::realtime::{RealtimeChannel, DEFAULT_NAMESPACE};

use crate::AppState;

async fn default_namespace_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let channel = state.realtime.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, channel, DEFAULT_NAMESPACE.to_string()))
}

async fn namespace_handler(
    ws: WebSocketUpgrade,
    Path(namespace): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let channel = state.realtime.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, channel, namespace))
}

async fn handle_socket(socket: WebSocket, channel: RealtimeChannel, namespace: String) {
    let (mut sender, mut receiver) = socket.split();
    let handle = channel.connect(&namespace);
    let context = handle.context;
    let mut events = handle.events;

    // Forward peer moves to this client
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("Failed to encode realtime event: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Dispatch client frames
    let recv_channel = channel.clone();
    let recv_context = context.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    // Drag-end persistence runs detached; its outcome is only logged
                    let _ = recv_channel.handle_text(&recv_context, &text);
                }
                Message::Close(_) => break,
                Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    channel.disconnect(&context);
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/mindmap/ws", get(default_namespace_handler))
        .route("/ws/:namespace", get(namespace_handler))
        .with_state(state)
}
