//! API Models
//!
//! Request and response payloads for the session-connection endpoints, with
//! `utoipa` annotations for the generated OpenAPI documentation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body for creating (or replacing) a session's agent connection.
#[derive(Deserialize, ToSchema, Debug)]
pub struct CreateConnectionPayload {
    /// The simulated-patient agent to converse with.
    pub agent_id: String,
    /// Pre-signed WebSocket URL for this agent, obtained out of band.
    pub signed_url: String,
    /// Ask the agent service to skip voice synthesis for this conversation.
    #[serde(default = "default_text_only")]
    pub text_only: bool,
}

fn default_text_only() -> bool {
    true
}

/// Body for one conversational turn.
#[derive(Deserialize, ToSchema, Debug)]
pub struct SendMessagePayload {
    /// The student's message to the simulated patient.
    pub text: String,
    /// Overall turn budget; defaults to 30 seconds.
    pub timeout_secs: Option<u64>,
}

/// One completed turn, as returned to the caller.
#[derive(Serialize, ToSchema, Debug)]
pub struct TurnResponse {
    /// The agent's reply text (may be empty if the reply timed out).
    pub text: String,
    /// Reply audio, base64-encoded; absent when the agent sent none.
    pub audio_base_64: Option<String>,
}

/// Liveness summary for a session's connection.
#[derive(Serialize, ToSchema, Debug)]
pub struct ConnectionStatus {
    pub connected: bool,
    /// Completed turns on the current connection; absent when disconnected.
    pub message_count: Option<u64>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub message: String,
}
