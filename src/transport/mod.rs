//! The `transport` module is responsible for network communication with
//! clients over WebSockets.
//!
//! It decodes the inbound frame shapes, enforces the upgrade-time admission
//! policy, and runs the server that hosts the hub: one reader loop and one
//! writer task per connection.

pub mod handshake;
pub mod message;
pub mod websocket;

pub use handshake::HandshakePolicy;
pub use message::InboundFrame;
pub use websocket::RelayServer;
