//! The per-turn send/receive/drain state machine.
//!
//! The agent service never marks the end of a turn: a text reply may be
//! followed by trailing audio frames, and keepalive pings can arrive at any
//! time, indefinitely. Stopping at the first text frame loses that audio;
//! waiting for a terminal signal can hang on ping traffic forever. The
//! executor therefore runs two timing regimes inside one overall budget:
//! while `Collecting` it polls in short intervals until the budget runs out,
//! and after the first text frame it switches to `Draining`, a short fixed
//! window (measured from the transition, never extended) in which trailing
//! audio and further text fragments are collected opportunistically.

use std::time::Duration;
use tokio::time::Instant;

use crate::error::ConvAiError;
use crate::frame::{InboundFrame, OutboundFrame, parse_frame};
use crate::handshake::perform_handshake;
use crate::stream::{AgentStream, RecvOutcome};

/// Per-iteration receive window. Bounds the latency any single ping burst can
/// add to one polling interval.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How long to keep collecting after the first text frame.
pub const DRAIN_WINDOW: Duration = Duration::from_secs(2);

/// Default overall budget for one turn.
pub const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(30);

/// The assembled result of one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    /// All text fragments of the reply, space-joined.
    pub text: String,
    /// All audio fragments of the reply, concatenated. Empty when the agent
    /// sent none.
    pub audio: Vec<u8>,
}

pub(crate) struct DrainOutcome {
    pub reply: TurnReply,
    /// Whether anything at all arrived, pings included. Distinguishes "nothing
    /// ever arrived" from "arrived then went quiet" for the one-shot sentinel.
    pub saw_frames: bool,
}

#[derive(Clone, Copy)]
enum Phase {
    Collecting,
    Draining { until: Instant },
}

/// Sends one user message and assembles the reply.
pub async fn run_turn(
    stream: &mut dyn AgentStream,
    text: &str,
    budget: Duration,
) -> Result<TurnReply, ConvAiError> {
    Ok(send_and_drain(stream, text, budget).await?.reply)
}

/// One-shot variant: handshake, one message, drain. The caller owns the
/// stream and must close it on every exit path.
pub(crate) async fn one_shot_turn(
    stream: &mut dyn AgentStream,
    text: &str,
    text_only: bool,
    budget: Duration,
) -> Result<TurnReply, ConvAiError> {
    perform_handshake(stream, text_only).await?;
    let outcome = send_and_drain(stream, text, budget).await?;
    if !outcome.saw_frames {
        return Err(ConvAiError::NoReply);
    }
    Ok(outcome.reply)
}

pub(crate) async fn send_and_drain(
    stream: &mut dyn AgentStream,
    text: &str,
    budget: Duration,
) -> Result<DrainOutcome, ConvAiError> {
    stream
        .send(OutboundFrame::user_message(text).encode()?)
        .await
        .map_err(ConvAiError::Transport)?;
    drain_reply(stream, budget).await
}

async fn drain_reply(
    stream: &mut dyn AgentStream,
    budget: Duration,
) -> Result<DrainOutcome, ConvAiError> {
    let overall_deadline = Instant::now() + budget;
    let mut phase = Phase::Collecting;
    let mut text_parts: Vec<String> = Vec::new();
    let mut audio: Vec<u8> = Vec::new();
    let mut saw_frames = false;

    loop {
        let deadline = match phase {
            Phase::Collecting => overall_deadline,
            Phase::Draining { until } => until,
        };
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        match stream.recv(POLL_INTERVAL.min(remaining)).await {
            RecvOutcome::Text(payload) => {
                saw_frames = true;
                match parse_frame(&payload) {
                    InboundFrame::Ping { event_id } => {
                        stream
                            .send(OutboundFrame::pong(event_id).encode()?)
                            .await
                            .map_err(ConvAiError::Transport)?;
                    }
                    InboundFrame::AgentText { text } => {
                        text_parts.push(text);
                        // Multi-part replies keep accumulating, but only the
                        // first text frame starts the drain window.
                        if matches!(phase, Phase::Collecting) {
                            phase = Phase::Draining {
                                until: Instant::now() + DRAIN_WINDOW,
                            };
                        }
                    }
                    InboundFrame::AudioChunk { bytes } => audio.extend_from_slice(&bytes),
                    InboundFrame::Metadata | InboundFrame::Unrecognized => {}
                }
            }
            RecvOutcome::Timeout => {}
            RecvOutcome::Closed => break,
            RecvOutcome::Failed(err) => return Err(ConvAiError::Transport(err)),
        }
    }

    Ok(DrainOutcome {
        reply: TurnReply {
            text: text_parts.join(" "),
            audio,
        },
        saw_frames,
    })
}
