//! Relay hub engine
//!
//! This module contains the in-memory hub responsible for:
//! - tracking the set of live connections
//! - dispatching inbound events to the handler registered for their name
//! - rebroadcasting relayed payloads to every live connection
//!
//! Concurrency and usage notes:
//! - The public API is synchronous and meant to be held behind a lock
//!   (`SharedHub`) by the transport layer. Broadcasting only queues frames
//!   on per-connection channels, so the lock is never held across network
//!   I/O.
//! - Send failures are swallowed. A connection whose queue is gone is
//!   removed by the transport when its socket task ends.
//! - `close_all` is terminal: the hub refuses new connections afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{debug, error, info};
use tungstenite::protocol::frame::coding::CloseCode;
use tungstenite::protocol::{CloseFrame, Message as WsMessage};

use super::connection::{Connection, ConnectionId};
use super::envelope::EventEnvelope;
use crate::config::RouteSettings;

/// Inbound event name relayed by the default configuration.
pub const QUIZ_ELAPSED: &str = "quiz_elapsed";
/// Outbound event name the default relay route broadcasts under.
pub const MENTOR_ELAPSED: &str = "mentor_elapsed";

/// Callback invoked for an inbound event. Receives the hub, the sender's id
/// and the payload; returns the number of frames it queued.
pub type Handler = Box<dyn Fn(&Hub, &ConnectionId, &Value) -> usize + Send + Sync>;

pub type SharedHub = Arc<Mutex<Hub>>;

/// Locks a shared hub, recovering the guard if a previous holder panicked.
/// Every hub operation is a single map insert, remove or iteration, so the
/// state behind a poisoned lock is still consistent.
pub fn lock(hub: &SharedHub) -> MutexGuard<'_, Hub> {
    hub.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Close frame sent to clients when the relay shuts down.
pub fn shutdown_frame() -> CloseFrame {
    CloseFrame {
        code: CloseCode::Away,
        reason: "relay shutting down".into(),
    }
}

#[derive(Default)]
pub struct Hub {
    connections: HashMap<ConnectionId, Connection>,
    handlers: HashMap<String, Handler>,
    closing: bool,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a hub with one relay handler per configured route.
    pub fn from_routes(routes: &[RouteSettings]) -> Self {
        let mut hub = Self::new();
        for route in routes {
            hub.register_relay(&route.inbound, &route.outbound);
        }
        hub
    }

    pub fn into_shared(self) -> SharedHub {
        Arc::new(Mutex::new(self))
    }

    /// Registers `handler` for `event_name`, replacing any previous one.
    pub fn register_handler(&mut self, event_name: impl Into<String>, handler: Handler) {
        self.handlers.insert(event_name.into(), handler);
    }

    /// Relays every `inbound` event to all live connections as `outbound`,
    /// payload untouched.
    pub fn register_relay(&mut self, inbound: &str, outbound: &str) {
        let inbound_name = inbound.to_string();
        let outbound_name = outbound.to_string();
        self.register_handler(
            inbound,
            Box::new(move |hub: &Hub, from: &ConnectionId, payload: &Value| {
                info!(
                    conn_id = %from,
                    event = %inbound_name,
                    payload = %payload,
                    "Relaying event"
                );
                hub.broadcast(&outbound_name, payload)
            }),
        );
    }

    pub fn handles(&self, event_name: &str) -> bool {
        self.handlers.contains_key(event_name)
    }

    /// Registers a connection. Once `close_all` has run the connection is
    /// dropped instead and `false` is returned.
    pub fn on_connect(&mut self, connection: Connection) -> bool {
        if self.closing {
            debug!(conn_id = %connection.id, "Refused connection, relay is shutting down");
            return false;
        }
        info!(conn_id = %connection.id, peer = ?connection.peer, "Connected");
        self.connections.insert(connection.id.clone(), connection);
        true
    }

    /// Removes a connection from the live set. Unknown ids are a no-op.
    pub fn on_disconnect(&mut self, connection_id: &ConnectionId) {
        if let Some(connection) = self.connections.remove(connection_id) {
            let lifetime = chrono::Utc::now() - connection.connected_at;
            info!(
                conn_id = %connection_id,
                lifetime_ms = lifetime.num_milliseconds(),
                "Disconnected"
            );
        }
    }

    /// Dispatches an inbound event to its handler. Names without a handler
    /// are ignored without logging. Returns the number of frames queued.
    pub fn on_event(&self, from: &ConnectionId, event_name: &str, payload: &Value) -> usize {
        match self.handlers.get(event_name) {
            Some(handler) => handler(self, from, payload),
            None => 0,
        }
    }

    /// Queues `event_name` with `payload` on every live connection.
    /// Returns how many connections accepted the frame.
    pub fn broadcast(&self, event_name: &str, payload: &Value) -> usize {
        let text = match EventEnvelope::new(event_name, payload.clone()).to_json() {
            Ok(json) => json,
            Err(e) => {
                error!(event = %event_name, "Failed to serialize envelope: {e}");
                return 0;
            }
        };
        let ws_msg = WsMessage::text(text);

        let mut delivered = 0;
        for (conn_id, connection) in &self.connections {
            if connection.send(ws_msg.clone()) {
                delivered += 1;
            } else {
                debug!(conn_id = %conn_id, event = %event_name, "Dropped frame for closed connection");
            }
        }
        debug!(event = %event_name, delivered, "Broadcast queued");
        delivered
    }

    /// Queues a close frame on every live connection, empties the set and
    /// stops accepting new ones. Returns how many connections were closed.
    pub fn close_all(&mut self) -> usize {
        self.closing = true;
        let frame = shutdown_frame();
        let closed = self.connections.len();
        for (_, connection) in self.connections.drain() {
            let _ = connection.send(WsMessage::Close(Some(frame.clone())));
        }
        if closed > 0 {
            info!(closed, "Closed all connections");
        }
        closed
    }

    pub fn is_closing(&self) -> bool {
        self.closing
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.connections.contains_key(connection_id)
    }

    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.connections.keys().cloned().collect()
    }
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut events: Vec<&String> = self.handlers.keys().collect();
        events.sort();
        f.debug_struct("Hub")
            .field("connections", &self.connections.len())
            .field("handlers", &events)
            .field("closing", &self.closing)
            .finish()
    }
}
