//! Preceptor Conversational Agent Core
//!
//! This crate manages persistent, bidirectional conversations with the remote
//! simulated-patient agent service. It is structured into submodules:
//!
//! - `frame`: the tagged JSON wire frames exchanged with the agent service.
//! - `stream`: the bidirectional stream primitive (trait + WebSocket implementation).
//! - `handshake`: the fixed exchange performed once per new connection.
//! - `turn`: the per-turn send/receive/drain state machine.
//! - `registry`: the concurrency-safe map from session id to live connection.

pub mod error;
pub mod frame;
pub mod handshake;
pub mod registry;
pub mod stream;
pub mod turn;

#[cfg(test)]
pub(crate) mod testing;

pub use error::ConvAiError;
pub use registry::{Connection, ConversationRegistry};
pub use stream::{AgentStream, RecvOutcome, StreamError, StreamOpener, WsOpener};
pub use turn::{DEFAULT_TURN_TIMEOUT, TurnReply};
