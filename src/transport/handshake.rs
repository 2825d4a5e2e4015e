//! Upgrade-time admission policy: origin allow-list and connection cap.
//!
//! Runs inside the WebSocket handshake callback, so a rejected client gets a
//! plain HTTP error response and never reaches the hub.

use tungstenite::handshake::server::{ErrorResponse, Request};
use tungstenite::http::StatusCode;
use tungstenite::http::header::ORIGIN;

use crate::config::Settings;

pub const ANY_ORIGIN: &str = "*";

#[derive(Debug, Clone)]
pub struct HandshakePolicy {
    allowed_origins: Vec<String>,
    max_connections: usize,
}

impl HandshakePolicy {
    /// `max_connections == 0` means no cap.
    pub fn new(allowed_origins: Vec<String>, max_connections: usize) -> Self {
        Self {
            allowed_origins,
            max_connections,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.server.allowed_origins.clone(),
            settings.relay.max_connections,
        )
    }

    /// Browsers always send `Origin` on a WebSocket upgrade; other clients
    /// usually don't, and those are let through.
    pub fn origin_allowed(&self, origin: Option<&str>) -> bool {
        match origin {
            None => true,
            Some(origin) => self
                .allowed_origins
                .iter()
                .any(|allowed| allowed == ANY_ORIGIN || allowed == origin),
        }
    }

    pub fn at_capacity(&self, live_connections: usize) -> bool {
        self.max_connections > 0 && live_connections >= self.max_connections
    }

    pub fn check(&self, request: &Request, live_connections: usize) -> Result<(), ErrorResponse> {
        let origin = request
            .headers()
            .get(ORIGIN)
            .map(|value| value.to_str().unwrap_or_default());

        if !self.origin_allowed(origin) {
            return Err(reject(StatusCode::FORBIDDEN, "origin not allowed"));
        }
        if self.at_capacity(live_connections) {
            return Err(reject(StatusCode::SERVICE_UNAVAILABLE, "relay at capacity"));
        }
        Ok(())
    }
}

pub(crate) fn reject(status: StatusCode, reason: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(reason.to_string()));
    *response.status_mut() = status;
    response
}
