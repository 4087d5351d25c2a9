//! Error taxonomy for the conversational agent core.
//!
//! The three non-fatal receive outcomes (timeout, closed, keepalive) never
//! surface here; a turn that goes quiet yields a best-effort partial reply
//! instead of an error. The variants below are the cases a caller can act on.

use crate::stream::StreamError;

#[derive(Debug, thiserror::Error)]
pub enum ConvAiError {
    /// No usable connection exists for the session; the caller must create one.
    #[error("no active connection for session '{0}'")]
    NoActiveConnection(String),

    /// Opening the remote stream (or completing its handshake) failed.
    /// The registry is left unchanged for the session.
    #[error("failed to open agent stream")]
    Open(#[source] StreamError),

    /// The stream failed mid-turn. The connection is marked inactive and must
    /// be recreated; no retry happens here.
    #[error("agent stream failed mid-turn")]
    Transport(#[source] StreamError),

    /// An outbound frame could not be serialized.
    #[error("failed to serialize outbound frame")]
    Encode(#[from] serde_json::Error),

    /// One-shot sentinel: the overall budget elapsed without a single frame
    /// arriving, as opposed to a reply that arrived and then went quiet.
    #[error("agent sent no response before the timeout")]
    NoReply,
}
