//! Connection representation
//!
//! `Connection` models one live client channel and holds the sending side of
//! a per-connection queue. The transport drains the receiving side into the
//! socket, so queueing a frame here never blocks on network I/O.

use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::UnboundedSender;
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

pub type ConnectionId = String;

#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    pub sender: UnboundedSender<WsMessage>,
    pub peer: Option<SocketAddr>,
    pub connected_at: DateTime<Utc>,
}

impl Connection {
    /// Create a new connection around a sender channel. The `id` is assigned
    /// here and stays fixed for the lifetime of the connection.
    pub fn new(sender: UnboundedSender<WsMessage>) -> Self {
        Self {
            id: format!("conn-{}", Uuid::new_v4()),
            sender,
            peer: None,
            connected_at: Utc::now(),
        }
    }

    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    /// A connection is open while the transport still holds its queue receiver.
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Queue a frame for delivery. Returns `false` if the receiving side is gone.
    pub fn send(&self, msg: WsMessage) -> bool {
        self.sender.send(msg).is_ok()
    }
}
