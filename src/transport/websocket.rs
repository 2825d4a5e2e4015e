//! WebSocket transport
//!
//! This file implements the WebSocket server that hosts a `Hub`.
//! Responsibilities:
//! - Bind the listener and accept TCP connections until shutdown
//! - Apply the `HandshakePolicy` during the upgrade
//! - Create a `Connection` for each socket and register it with the hub
//! - Decode inbound text frames and hand them to `Hub::on_event`
//! - Drain each connection's queue into its socket on a separate task
//! - On shutdown, close every connection, release the port, and abort
//!   connection tasks that don't finish within `SHUTDOWN_GRACE`
//!
//! Cross-origin note: the default policy accepts any origin, which suits a
//! trusted network or development setup. Restrict `server.allowed_origins`
//! for anything exposed beyond that.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_tungstenite::accept_hdr_async;
use tracing::{debug, info, trace, warn};
use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tungstenite::http::StatusCode;
use tungstenite::protocol::Message as WsMessage;

use crate::config::Settings;
use crate::hub::{self, Connection, ConnectionId, EventEnvelope, Hub, SharedHub};
use crate::transport::handshake::{self, HandshakePolicy};
use crate::transport::message::InboundFrame;
use crate::utils::RelayError;

/// How long connection tasks get to finish after the close frames go out.
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

pub struct RelayServer {
    listener: TcpListener,
    hub: SharedHub,
    policy: Arc<HandshakePolicy>,
}

impl RelayServer {
    /// Binds `server.host:server.port`. Port 0 picks an ephemeral port.
    pub async fn bind(settings: &Settings, hub: SharedHub) -> Result<Self, RelayError> {
        let addr = settings.server.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| RelayError::Bind {
                addr: addr.clone(),
                source,
            })?;

        let local = listener.local_addr()?;
        info!("Relay listening on ws://{local}");

        Ok(Self {
            listener,
            hub,
            policy: Arc::new(HandshakePolicy::from_settings(settings)),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, RelayError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn hub(&self) -> SharedHub {
        self.hub.clone()
    }

    /// Accepts connections until `shutdown` resolves. Then the listener is
    /// dropped, every live connection is closed, and connection tasks still
    /// running after `SHUTDOWN_GRACE` (half-done handshakes, peers that never
    /// answer the close frame) are aborted.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let RelayServer {
            listener,
            hub,
            policy,
        } = self;
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    break;
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections.spawn(handle_connection(
                            stream,
                            peer,
                            hub.clone(),
                            policy.clone(),
                        ));
                    }
                    Err(e) => warn!("Failed to accept connection: {e}"),
                },
            }
        }

        drop(listener);
        let closed = hub::lock(&hub).close_all();

        let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
            while connections.join_next().await.is_some() {}
        })
        .await
        .is_ok();
        if !drained {
            debug!(
                remaining = connections.len(),
                "Aborting connection tasks after shutdown grace period"
            );
            connections.shutdown().await;
        }

        info!(closed, "Relay stopped");
    }
}

/// Hands a decoded envelope to the hub. Returns `None`, without logging,
/// when no handler is registered for the event name.
pub(crate) fn dispatch(
    hub: &Hub,
    conn_id: &ConnectionId,
    envelope: &EventEnvelope,
) -> Option<usize> {
    if !hub.handles(&envelope.event) {
        return None;
    }
    let delivered = hub.on_event(conn_id, &envelope.event, &envelope.data);
    trace!(conn_id = %conn_id, event = %envelope.event, delivered, "Event handled");
    Some(delivered)
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    hub: SharedHub,
    policy: Arc<HandshakePolicy>,
) {
    let admit = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        let guard = hub::lock(&hub);
        if guard.is_closing() {
            return Err(handshake::reject(
                StatusCode::SERVICE_UNAVAILABLE,
                "relay shutting down",
            ));
        }
        policy.check(request, guard.len()).map(|()| response)
    };

    let ws_stream = match accept_hdr_async(stream, admit).await {
        Ok(ws) => ws,
        Err(e) => {
            debug!(%peer, "WebSocket handshake rejected: {e}");
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let connection = Connection::new(tx).with_peer(peer);
    let conn_id = connection.id.clone();
    // The handshake can finish after shutdown has already closed the hub.
    if !hub::lock(&hub).on_connect(connection) {
        let _ = ws_sender
            .send(WsMessage::Close(Some(hub::shutdown_frame())))
            .await;
        return;
    }

    let cleanup_called = Arc::new(AtomicBool::new(false));

    let do_cleanup = {
        let hub = hub.clone();
        let conn_id = conn_id.clone();
        let cleanup_called = cleanup_called.clone();

        move || {
            if !cleanup_called.swap(true, Ordering::SeqCst) {
                hub::lock(&hub).on_disconnect(&conn_id);
            }
        }
    };

    {
        let conn_id = conn_id.clone();
        let do_cleanup = do_cleanup.clone();

        spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = ws_sender.send(msg).await {
                    debug!(conn_id = %conn_id, "Failed to write frame: {e}");
                    break;
                }
            }

            do_cleanup();
            trace!(conn_id = %conn_id, "Send loop closed");
        });
    }

    while let Some(frame) = ws_receiver.next().await {
        let msg = match frame {
            Ok(msg) => msg,
            Err(e) => {
                debug!(conn_id = %conn_id, "Read error: {e}");
                break;
            }
        };

        match msg {
            WsMessage::Text(text) => match InboundFrame::decode(text.as_str()) {
                Ok(envelope) => {
                    dispatch(&hub::lock(&hub), &conn_id, &envelope);
                }
                Err(err) => {
                    debug!(
                        conn_id = %conn_id,
                        "Ignoring malformed frame: {err} | {}",
                        text.as_str().chars().take(100).collect::<String>()
                    );
                }
            },
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    do_cleanup();
}
