//! The bidirectional stream primitive used to talk to the agent service.
//!
//! [`AgentStream`] is the seam the rest of the crate is written against: the
//! registry, handshake, and turn executor only ever see text payloads going
//! out and [`RecvOutcome`]s coming in. The production implementation rides a
//! `tokio-tungstenite` WebSocket; tests inject scripted implementations.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("websocket error: {0}")]
    Ws(#[from] WsError),
    #[error("connection closed by remote")]
    Closed,
}

/// The outcome of one bounded receive call.
///
/// Timeout and closed are ordinary outcomes, not errors: the drain logic
/// treats both as "the reply has gone quiet" and keeps whatever it collected.
#[derive(Debug)]
pub enum RecvOutcome {
    /// One text payload, still unparsed.
    Text(String),
    /// Nothing arrived within the allotted window.
    Timeout,
    /// The remote side closed the stream.
    Closed,
    /// The transport failed in a way that makes the stream unusable.
    Failed(StreamError),
}

/// An open bidirectional channel to the agent service.
#[async_trait]
pub trait AgentStream: Send {
    /// Sends one text payload.
    async fn send(&mut self, payload: String) -> Result<(), StreamError>;

    /// Receives the next text payload, waiting at most `timeout`.
    async fn recv(&mut self, timeout: Duration) -> RecvOutcome;

    /// Closes the channel. Closing an already-closed channel is not an error.
    async fn close(&mut self) -> Result<(), StreamError>;
}

/// Opens [`AgentStream`]s. Injected into the registry so tests can substitute
/// scripted streams for real sockets.
#[async_trait]
pub trait StreamOpener: Send + Sync {
    async fn open(&self, url: &str) -> Result<Box<dyn AgentStream>, StreamError>;
}

/// Production [`AgentStream`] over a (possibly TLS) WebSocket.
pub struct WsStream {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl AgentStream for WsStream {
    async fn send(&mut self, payload: String) -> Result<(), StreamError> {
        self.inner.send(Message::Text(payload.into())).await?;
        Ok(())
    }

    async fn recv(&mut self, timeout: Duration) -> RecvOutcome {
        let deadline = Instant::now() + timeout;
        // Non-text frames don't consume the caller's budget beyond the time
        // they took to arrive, so loop until the deadline.
        loop {
            match tokio::time::timeout_at(deadline, self.inner.next()).await {
                Err(_) => return RecvOutcome::Timeout,
                Ok(None) => return RecvOutcome::Closed,
                Ok(Some(Ok(Message::Text(payload)))) => {
                    return RecvOutcome::Text(payload.to_string());
                }
                Ok(Some(Ok(Message::Close(_)))) => return RecvOutcome::Closed,
                // tungstenite answers protocol-level pings itself.
                Ok(Some(Ok(_))) => continue,
                Ok(Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed))) => {
                    return RecvOutcome::Closed;
                }
                Ok(Some(Err(err))) => return RecvOutcome::Failed(err.into()),
            }
        }
    }

    async fn close(&mut self) -> Result<(), StreamError> {
        match self.inner.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Production [`StreamOpener`] that dials the agent service over WebSocket.
#[derive(Debug, Clone, Default)]
pub struct WsOpener;

#[async_trait]
impl StreamOpener for WsOpener {
    async fn open(&self, url: &str) -> Result<Box<dyn AgentStream>, StreamError> {
        let (inner, _response) = connect_async(url).await?;
        Ok(Box::new(WsStream { inner }))
    }
}
