//! Session Registry
//!
//! Tracks live realtime sessions per collaboration namespace. Each namespace
//! has one broadcast channel; every relayed event carries its originating
//! session id so a session never receives its own moves.
//!
//! Relay is lossy by construction: `broadcast::Sender::send` never waits, and
//! a session that falls more than `capacity` events behind skips the oldest
//! ones (only the latest position matters during a drag).

use crate::realtime::protocol::ServerEvent;
use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use uuid::Uuid;

/// Default per-namespace relay buffer
pub const DEFAULT_RELAY_CAPACITY: usize = 256;

/// Identity of one live connection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionContext {
    pub id: Uuid,
    pub namespace: String,
}

#[derive(Debug, Clone)]
struct RelayedEvent {
    origin: Uuid,
    event: ServerEvent,
}

/// Outbound event stream for one session, with its own events filtered out
pub struct SessionEvents {
    session_id: Uuid,
    rx: broadcast::Receiver<RelayedEvent>,
}

impl SessionEvents {
    /// Next event from a peer; `None` once the namespace channel is gone
    pub async fn next(&mut self) -> Option<ServerEvent> {
        loop {
            match self.rx.recv().await {
                Ok(relayed) if relayed.origin == self.session_id => continue,
                Ok(relayed) => return Some(relayed.event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(
                        session_id = %self.session_id,
                        skipped,
                        "Session lagged behind relay; dropped oldest moves"
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`next`](Self::next); `None` when nothing is queued
    pub fn try_next(&mut self) -> Option<ServerEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(relayed) if relayed.origin == self.session_id => continue,
                Ok(relayed) => return Some(relayed.event),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}

/// A freshly registered session
pub struct SessionHandle {
    pub context: SessionContext,
    pub events: SessionEvents,
}

struct Namespace {
    tx: broadcast::Sender<RelayedEvent>,
    sessions: HashSet<Uuid>,
}

/// Live sessions grouped by namespace
///
/// Safe to read during broadcast and to write during connect/disconnect. The
/// lock is never held across an `.await`.
pub struct SessionRegistry {
    namespaces: RwLock<HashMap<String, Namespace>>,
    capacity: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_RELAY_CAPACITY)
    }
}

impl SessionRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            namespaces: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Register a new session in `namespace`
    pub fn connect(&self, namespace: &str) -> SessionHandle {
        let id = Uuid::new_v4();
        let mut namespaces = self
            .namespaces
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let entry = namespaces
            .entry(namespace.to_string())
            .or_insert_with(|| Namespace {
                tx: broadcast::channel(self.capacity).0,
                sessions: HashSet::new(),
            });
        entry.sessions.insert(id);
        let rx = entry.tx.subscribe();

        SessionHandle {
            context: SessionContext {
                id,
                namespace: namespace.to_string(),
            },
            events: SessionEvents { session_id: id, rx },
        }
    }

    /// Remove a session; returns false if it was already gone
    pub fn disconnect(&self, context: &SessionContext) -> bool {
        let mut namespaces = self
            .namespaces
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let Some(entry) = namespaces.get_mut(&context.namespace) else {
            return false;
        };
        let removed = entry.sessions.remove(&context.id);
        if entry.sessions.is_empty() {
            namespaces.remove(&context.namespace);
        }
        removed
    }

    /// Relay `event` to every session in `namespace` except `origin`
    ///
    /// Never blocks. Returns the number of peer sessions the event was queued for.
    pub fn broadcast_except(&self, namespace: &str, origin: Uuid, event: ServerEvent) -> usize {
        let namespaces = self
            .namespaces
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let Some(entry) = namespaces.get(namespace) else {
            return 0;
        };
        let peers = entry.sessions.iter().filter(|id| **id != origin).count();
        if peers == 0 {
            return 0;
        }

        match entry.tx.send(RelayedEvent { origin, event }) {
            Ok(_) => peers,
            Err(_) => 0,
        }
    }

    pub fn session_count(&self, namespace: &str) -> usize {
        self.namespaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(namespace)
            .map_or(0, |entry| entry.sessions.len())
    }

    pub fn total_sessions(&self) -> usize {
        self.namespaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|entry| entry.sessions.len())
            .sum()
    }
}
