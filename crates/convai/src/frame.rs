//! Defines the JSON wire frames exchanged with the remote agent service.
//!
//! Inbound payloads are classified into [`InboundFrame`]; anything malformed
//! or carrying an unknown tag becomes [`InboundFrame::Unrecognized`] and is
//! dropped by the caller. Parsing never fails: a bad frame must not take down
//! a receive loop that still has timeout budget left.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A classified frame received from the agent service.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Keepalive probe; must be answered with a matching pong.
    Ping { event_id: u64 },
    /// A (possibly partial) text reply from the agent.
    AgentText { text: String },
    /// A chunk of reply audio, already base64-decoded.
    AudioChunk { bytes: Vec<u8> },
    /// Conversation metadata sent during the handshake. Ignored.
    Metadata,
    /// Anything malformed or unknown. Ignored.
    Unrecognized,
}

/// A frame sent to the agent service.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum OutboundFrame {
    /// Handshake initiation, carrying the conversation overrides.
    #[serde(rename = "conversation_initiation_client_data")]
    Init {
        conversation_config_override: ConversationConfigOverride,
    },
    /// Keepalive reply. `event_id` must echo the ping that prompted it.
    #[serde(rename = "pong")]
    Pong { event_id: u64 },
    /// One turn of user input.
    #[serde(rename = "user_message")]
    UserMessage { text: String },
}

#[derive(Debug, Serialize)]
pub struct ConversationConfigOverride {
    pub conversation: ConversationOverride,
}

#[derive(Debug, Serialize)]
pub struct ConversationOverride {
    pub text_only: bool,
}

impl OutboundFrame {
    pub fn init(text_only: bool) -> Self {
        Self::Init {
            conversation_config_override: ConversationConfigOverride {
                conversation: ConversationOverride { text_only },
            },
        }
    }

    pub fn pong(event_id: u64) -> Self {
        Self::Pong { event_id }
    }

    pub fn user_message(text: impl Into<String>) -> Self {
        Self::UserMessage { text: text.into() }
    }

    /// Serializes the frame to its wire representation.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// The raw shapes are deserialized separately from `InboundFrame` so that the
// rest of the crate never sees the nested envelope objects or base64 text.
#[derive(Deserialize)]
#[serde(tag = "type")]
enum RawInbound {
    #[serde(rename = "ping")]
    Ping { ping_event: PingEvent },
    #[serde(rename = "agent_response")]
    AgentResponse {
        agent_response_event: AgentResponseEvent,
    },
    #[serde(rename = "audio", alias = "audio_event")]
    Audio { audio_event: AudioEvent },
    #[serde(rename = "conversation_initiation_metadata")]
    Metadata {},
}

#[derive(Deserialize)]
struct PingEvent {
    event_id: u64,
}

#[derive(Deserialize)]
struct AgentResponseEvent {
    agent_response: String,
}

#[derive(Deserialize)]
struct AudioEvent {
    #[serde(alias = "audio")]
    audio_base_64: String,
}

/// Classifies one received text payload.
///
/// Unknown tags, malformed JSON, and undecodable audio all classify as
/// [`InboundFrame::Unrecognized`].
pub fn parse_frame(payload: &str) -> InboundFrame {
    let raw: RawInbound = match serde_json::from_str(payload) {
        Ok(raw) => raw,
        Err(err) => {
            debug!(%err, "Dropping unrecognized frame from agent service");
            return InboundFrame::Unrecognized;
        }
    };

    match raw {
        RawInbound::Ping { ping_event } => InboundFrame::Ping {
            event_id: ping_event.event_id,
        },
        RawInbound::AgentResponse {
            agent_response_event,
        } => InboundFrame::AgentText {
            text: agent_response_event.agent_response,
        },
        RawInbound::Audio { audio_event } => match BASE64.decode(&audio_event.audio_base_64) {
            Ok(bytes) => InboundFrame::AudioChunk { bytes },
            Err(err) => {
                debug!(%err, "Dropping audio frame with undecodable base64 payload");
                InboundFrame::Unrecognized
            }
        },
        RawInbound::Metadata {} => InboundFrame::Metadata,
    }
}
