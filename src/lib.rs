//! # relayhub
//!
//! `relayhub` is a small real-time event relay built on WebSockets. Clients
//! connect, emit named events, and every recognised event is rebroadcast to
//! all connected clients under an outbound name. The stock route relays
//! `quiz_elapsed` as `mentor_elapsed`, so a backend process can follow quiz
//! timing by simply staying connected.
//!
//! ## Core Modules
//!
//! - `hub`: the live-connection set, per-event handlers, and broadcast.
//! - `transport`: the WebSocket server hosting a hub, its admission policy and frame codec.
//! - `client`: a WebSocket client for emitting events and listening to broadcasts.
//! - `config`: loading settings from defaults, `config/default.*` and the environment.
//! - `utils`: the error type and logging setup.

pub mod client;
pub mod config;
pub mod hub;
pub mod transport;
pub mod utils;

pub use client::RelayClient;
pub use hub::{EventEnvelope, Hub, SharedHub};
pub use transport::RelayServer;
pub use utils::RelayError;
