//! Scripted [`AgentStream`] fakes for protocol tests.
//!
//! A `ScriptedStream` plays back a fixed sequence of receive outcomes under
//! tokio's paused clock, so tests can assert on both behavior and elapsed
//! virtual time without touching a real socket.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::stream::{AgentStream, RecvOutcome, StreamError, StreamOpener};

/// One step of a scripted remote endpoint.
pub(crate) enum Step {
    /// Deliver this raw payload immediately.
    Frame(String),
    /// Stay silent for one full receive window.
    Timeout,
    /// Close the stream.
    Closed,
    /// Fail the transport.
    Fail,
}

pub(crate) struct ScriptedStream {
    script: VecDeque<Step>,
    label: &'static str,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
    events: Option<Arc<Mutex<Vec<String>>>>,
}

impl ScriptedStream {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            script: script.into(),
            label: "stream",
            sent: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
            events: None,
        }
    }

    /// A stream that records its open/close lifecycle into a shared log.
    pub fn with_events(
        label: &'static str,
        script: Vec<Step>,
        events: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        Self {
            events: Some(events),
            label,
            ..Self::new(script)
        }
    }

    pub fn sent_handle(&self) -> Arc<Mutex<Vec<String>>> {
        self.sent.clone()
    }

    pub fn closed_handle(&self) -> Arc<AtomicBool> {
        self.closed.clone()
    }

    pub fn sent_payloads(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentStream for ScriptedStream {
    async fn send(&mut self, payload: String) -> Result<(), StreamError> {
        self.sent.lock().unwrap().push(payload);
        Ok(())
    }

    async fn recv(&mut self, timeout: Duration) -> RecvOutcome {
        match self.script.pop_front() {
            Some(Step::Frame(payload)) => RecvOutcome::Text(payload),
            Some(Step::Timeout) | None => {
                tokio::time::sleep(timeout).await;
                RecvOutcome::Timeout
            }
            Some(Step::Closed) => RecvOutcome::Closed,
            Some(Step::Fail) => {
                RecvOutcome::Failed(StreamError::Ws(WsError::Io(std::io::Error::other(
                    "injected transport failure",
                ))))
            }
        }
    }

    async fn close(&mut self) -> Result<(), StreamError> {
        self.closed.store(true, Ordering::SeqCst);
        if let Some(events) = &self.events {
            events.lock().unwrap().push(format!("close {}", self.label));
        }
        Ok(())
    }
}

/// Hands out pre-built scripted streams in order, logging each open.
pub(crate) struct ScriptedOpener {
    queue: Mutex<VecDeque<ScriptedStream>>,
    pub events: Arc<Mutex<Vec<String>>>,
}

impl ScriptedOpener {
    pub fn new(streams: Vec<ScriptedStream>) -> Self {
        Self::with_events(streams, Arc::new(Mutex::new(Vec::new())))
    }

    /// Shares one event log between the opener and its streams, so tests can
    /// assert on open/close ordering.
    pub fn with_events(streams: Vec<ScriptedStream>, events: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            queue: Mutex::new(streams.into()),
            events,
        }
    }
}

#[async_trait]
impl StreamOpener for ScriptedOpener {
    async fn open(&self, url: &str) -> Result<Box<dyn AgentStream>, StreamError> {
        self.events.lock().unwrap().push(format!("open {url}"));
        match self.queue.lock().unwrap().pop_front() {
            Some(stream) => Ok(Box::new(stream)),
            None => Err(StreamError::Ws(WsError::Io(std::io::Error::other(
                "no scripted stream left",
            )))),
        }
    }
}

pub(crate) fn ping(event_id: u64) -> String {
    format!(r#"{{"type":"ping","ping_event":{{"event_id":{event_id}}}}}"#)
}

pub(crate) fn text(message: &str) -> String {
    format!(r#"{{"type":"agent_response","agent_response_event":{{"agent_response":"{message}"}}}}"#)
}

pub(crate) fn audio(base64_payload: &str) -> String {
    format!(r#"{{"type":"audio","audio_event":{{"audio_base_64":"{base64_payload}"}}}}"#)
}

pub(crate) fn greeting() -> String {
    text("Hello doctor, what brings you to see me today?")
}
