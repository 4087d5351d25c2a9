//! The concurrency-safe map from session id to live agent connection.
//!
//! The registry is the sole owner of every socket. Membership mutations
//! (create, close) happen under one mutex so that replace-if-exists is atomic
//! and two concurrent creations for the same session cannot both install an
//! entry. Turn I/O runs on a per-connection socket mutex with the registry
//! lock released, so a long receive never blocks other sessions.
//!
//! Concurrent turns on the *same* session are not serialized or rejected
//! here; the wire protocol is strictly request/response per session and
//! callers must sequence their own turns.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::error::ConvAiError;
use crate::handshake::perform_handshake;
use crate::stream::{AgentStream, StreamOpener};
use crate::turn::{TurnReply, one_shot_turn, run_turn};

/// One live session with the agent service.
pub struct Connection {
    pub session_id: String,
    pub agent_id: String,
    pub signed_url: String,
    pub created_at: DateTime<Utc>,
    message_count: AtomicU64,
    is_active: AtomicBool,
    socket: Mutex<Box<dyn AgentStream>>,
}

impl Connection {
    /// Completed turns on this connection.
    pub fn message_count(&self) -> u64 {
        self.message_count.load(Ordering::SeqCst)
    }

    /// False once the connection has faulted or been replaced. Never flips
    /// back to true; a faulted session must be recreated.
    pub fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }

    fn deactivate(&self) {
        self.is_active.store(false, Ordering::SeqCst);
    }
}

/// Registry of persistent agent connections, keyed by application session id.
///
/// Constructed once at startup and injected into handlers; there is no global
/// instance.
pub struct ConversationRegistry<O: StreamOpener> {
    opener: O,
    /// Base WebSocket endpoint used for one-shot conversations with public
    /// agents (persistent connections receive a pre-signed URL instead).
    agent_ws_url: String,
    connections: Mutex<HashMap<String, Arc<Connection>>>,
}

impl<O: StreamOpener> ConversationRegistry<O> {
    pub fn new(opener: O, agent_ws_url: impl Into<String>) -> Self {
        Self {
            opener,
            agent_ws_url: agent_ws_url.into(),
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Opens a new connection for `session_id`, replacing (and closing) any
    /// existing one first.
    ///
    /// A handshake that times out without a greeting is logged and kept: the
    /// agent may simply have nothing to say yet. Open and handshake transport
    /// failures propagate and leave no entry behind for the session.
    #[instrument(skip(self, signed_url))]
    pub async fn create_connection(
        &self,
        session_id: &str,
        agent_id: &str,
        signed_url: &str,
        text_only: bool,
    ) -> Result<(), ConvAiError> {
        let mut connections = self.connections.lock().await;

        // Replace-not-merge: the old socket is closed before the new one is
        // stored, and close failures never abort the replacement.
        if let Some(old) = connections.remove(session_id) {
            info!("Replacing existing connection for session");
            old.deactivate();
            let mut socket = old.socket.lock().await;
            if let Err(err) = socket.close().await {
                warn!(%err, "Ignoring close failure while replacing connection");
            }
        }

        let mut stream = self
            .opener
            .open(signed_url)
            .await
            .map_err(ConvAiError::Open)?;

        match perform_handshake(stream.as_mut(), text_only).await {
            Ok(Some(greeting)) => info!(%greeting, "Agent session ready"),
            Ok(None) => {}
            Err(err) => {
                if let Err(close_err) = stream.close().await {
                    warn!(%close_err, "Ignoring close failure after failed handshake");
                }
                return Err(err);
            }
        }

        connections.insert(
            session_id.to_string(),
            Arc::new(Connection {
                session_id: session_id.to_string(),
                agent_id: agent_id.to_string(),
                signed_url: signed_url.to_string(),
                created_at: Utc::now(),
                message_count: AtomicU64::new(0),
                is_active: AtomicBool::new(true),
                socket: Mutex::new(stream),
            }),
        );
        Ok(())
    }

    /// True iff an entry exists for the session and is still usable.
    pub async fn has_connection(&self, session_id: &str) -> bool {
        self.connections
            .lock()
            .await
            .get(session_id)
            .is_some_and(|connection| connection.is_active())
    }

    /// The live connection record for a session, if any.
    pub async fn connection(&self, session_id: &str) -> Option<Arc<Connection>> {
        self.connections.lock().await.get(session_id).cloned()
    }

    /// Removes and closes the session's connection. Idempotent: a missing or
    /// already-closed session is a no-op, and a failed close never prevents
    /// removal.
    #[instrument(skip(self))]
    pub async fn close_connection(&self, session_id: &str) {
        let removed = self.connections.lock().await.remove(session_id);
        if let Some(connection) = removed {
            connection.deactivate();
            let mut socket = connection.socket.lock().await;
            if let Err(err) = socket.close().await {
                warn!(%err, "Ignoring close failure for removed connection");
            }
        }
    }

    /// Runs one turn on the session's connection: sends the user message and
    /// drains the reply within `timeout`.
    ///
    /// Fails with [`ConvAiError::NoActiveConnection`] (and no side effects)
    /// when the session has no usable connection. A transport failure
    /// mid-turn deactivates the connection; timeouts and remote closes yield
    /// whatever was collected.
    #[instrument(skip(self, text))]
    pub async fn send_message(
        &self,
        session_id: &str,
        text: &str,
        timeout: Duration,
    ) -> Result<TurnReply, ConvAiError> {
        let connection = self
            .connections
            .lock()
            .await
            .get(session_id)
            .cloned()
            .filter(|connection| connection.is_active())
            .ok_or_else(|| ConvAiError::NoActiveConnection(session_id.to_string()))?;

        // Registry lock is released here; only this connection's socket is
        // held for the duration of the turn.
        let result = {
            let mut socket = connection.socket.lock().await;
            run_turn(socket.as_mut(), text, timeout).await
        };

        match result {
            Ok(reply) => {
                connection.message_count.fetch_add(1, Ordering::SeqCst);
                Ok(reply)
            }
            Err(err) => {
                if matches!(err, ConvAiError::Transport(_)) {
                    connection.deactivate();
                }
                Err(err)
            }
        }
    }

    /// Stateless variant for callers without a persistent connection: opens a
    /// conversation with the public agent, handshakes, runs one turn, and
    /// closes the stream on every exit path.
    #[instrument(skip(self, text))]
    pub async fn send_once(
        &self,
        agent_id: &str,
        text: &str,
        timeout: Duration,
    ) -> Result<TurnReply, ConvAiError> {
        let url = format!("{}?agent_id={agent_id}", self.agent_ws_url);
        let mut stream = self.opener.open(&url).await.map_err(ConvAiError::Open)?;

        let result = one_shot_turn(stream.as_mut(), text, true, timeout).await;

        if let Err(err) = stream.close().await {
            warn!(%err, "Ignoring close failure after one-shot turn");
        }
        result
    }
}
