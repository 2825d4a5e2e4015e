//! The `hub` module holds the relay core: the live-connection set, the
//! per-event handler table, and broadcast.
//!
//! Nothing in here touches a socket. The transport registers a `Connection`
//! per WebSocket, feeds decoded envelopes to `Hub::on_event`, and drains each
//! connection's queue on its own task.

pub mod connection;
pub mod engine;
pub mod envelope;

pub use connection::{Connection, ConnectionId};
pub use engine::{Handler, Hub, MENTOR_ELAPSED, QUIZ_ELAPSED, SharedHub, lock, shutdown_frame};
pub use envelope::EventEnvelope;

#[cfg(test)]
mod tests;
