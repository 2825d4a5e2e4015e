use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tungstenite::client::IntoClientRequest;
use tungstenite::http::HeaderValue;
use tungstenite::http::header::ORIGIN;
use tungstenite::protocol::Message as WsMessage;
use url::Url;

use crate::hub::EventEnvelope;
use crate::utils::RelayError;

/// A connected relay client.
pub struct RelayClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl RelayClient {
    pub async fn connect(url: &str) -> Result<Self, RelayError> {
        Self::connect_with_origin(url, None).await
    }

    /// Connects sending an `Origin` header, the way a browser page would.
    pub async fn connect_with_origin(url: &str, origin: Option<&str>) -> Result<Self, RelayError> {
        let parsed = parse_url(url)?;
        let mut request = parsed.as_str().into_client_request()?;
        if let Some(origin) = origin {
            let value = HeaderValue::from_str(origin).map_err(|e| RelayError::InvalidUrl {
                url: url.to_string(),
                reason: format!("bad origin header: {e}"),
            })?;
            request.headers_mut().insert(ORIGIN, value);
        }

        let (stream, _response) = connect_async(request).await?;
        Ok(Self { stream })
    }

    pub async fn emit(&mut self, event: &str, data: Value) -> Result<(), RelayError> {
        let text = EventEnvelope::new(event, data).to_json()?;
        self.send_text(text).await
    }

    /// Sends a raw text frame as-is.
    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<(), RelayError> {
        self.stream.send(WsMessage::text(text.into())).await?;
        Ok(())
    }

    /// Waits for the next envelope. Control frames and text that doesn't
    /// decode are skipped. Returns `None` once the server closes the stream.
    pub async fn next_event(&mut self) -> Result<Option<EventEnvelope>, RelayError> {
        while let Some(frame) = self.stream.next().await {
            match frame? {
                WsMessage::Text(text) => {
                    if let Ok(envelope) = EventEnvelope::decode(text.as_str()) {
                        return Ok(Some(envelope));
                    }
                }
                WsMessage::Close(_) => return Ok(None),
                _ => {}
            }
        }
        Ok(None)
    }

    pub async fn close(mut self) -> Result<(), RelayError> {
        self.stream.close(None).await?;
        Ok(())
    }
}

pub(crate) fn parse_url(url: &str) -> Result<Url, RelayError> {
    let parsed = Url::parse(url).map_err(|e| RelayError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "ws" | "wss" => Ok(parsed),
        other => Err(RelayError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{other}', expected ws or wss"),
        }),
    }
}
