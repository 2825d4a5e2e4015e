//! The `client` module provides `RelayClient`, a small WebSocket client for
//! the relay. The CLI uses it for the `emit` and `listen` subcommands, and the
//! end-to-end tests use it to play quiz clients and the external consumer.

pub mod relay_client;
pub use relay_client::RelayClient;
