//! The fixed exchange performed once per new connection, before any turn.
//!
//! The initiation frame announces the conversation overrides; the agent
//! service usually follows with metadata and an opening line from the
//! simulated patient. Some agents have no scripted greeting, so a quiet
//! handshake is not a failure.

use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ConvAiError;
use crate::frame::{InboundFrame, OutboundFrame, parse_frame};
use crate::stream::{AgentStream, RecvOutcome, StreamError};

/// How long each handshake receive waits before giving up on a greeting.
pub const HANDSHAKE_RECV_TIMEOUT: Duration = Duration::from_secs(8);

/// Sends the initiation frame and consumes frames until the agent's greeting.
///
/// Pings are answered inline and metadata is skipped; each of those restarts
/// the bounded receive. Returns `Ok(None)` when no greeting arrives in time —
/// the connection is still usable. Transport failures (including the remote
/// closing mid-handshake) propagate as [`ConvAiError::Open`].
pub async fn perform_handshake(
    stream: &mut dyn AgentStream,
    text_only: bool,
) -> Result<Option<String>, ConvAiError> {
    stream
        .send(OutboundFrame::init(text_only).encode()?)
        .await
        .map_err(ConvAiError::Open)?;

    loop {
        match stream.recv(HANDSHAKE_RECV_TIMEOUT).await {
            RecvOutcome::Text(payload) => match parse_frame(&payload) {
                InboundFrame::Ping { event_id } => {
                    stream
                        .send(OutboundFrame::pong(event_id).encode()?)
                        .await
                        .map_err(ConvAiError::Open)?;
                }
                InboundFrame::AgentText { text } => {
                    debug!("Agent greeted after handshake");
                    return Ok(Some(text));
                }
                InboundFrame::AudioChunk { .. }
                | InboundFrame::Metadata
                | InboundFrame::Unrecognized => {}
            },
            RecvOutcome::Timeout => {
                warn!("No greeting from agent within handshake window; continuing without one");
                return Ok(None);
            }
            RecvOutcome::Closed => return Err(ConvAiError::Open(StreamError::Closed)),
            RecvOutcome::Failed(err) => return Err(ConvAiError::Open(err)),
        }
    }
}
