//! Observer interface for listener and session activity.
//!
//! Sessions and the listener never touch presentation state directly. They
//! report [`SessionEvent`]s to an injected [`EventSink`], which may log them,
//! print them as JSON lines, or forward them anywhere else. Sinks are shared
//! by every session task, so implementations must be `Send + Sync`.

use std::sync::Mutex;

use serde::Serialize;

use crate::control::write_stdout_json;

/// Something observable happened on the listener or in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    ListenerStarted { address: String, questions: usize },
    ClientConnected { peer: String },
    AnswerRecorded {
        peer: String,
        /// 1-indexed question number.
        question_number: usize,
        correct: bool,
    },
    SessionFinished { peer: String, score: usize, total: usize },
    SessionAborted { peer: String, reason: String },
    AcceptFailed { error: String },
    ListenerStopped,
}

/// Receiver of [`SessionEvent`]s.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &SessionEvent);
}

/// Logs events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &SessionEvent) {
        match event {
            SessionEvent::ListenerStarted { address, questions } => {
                tracing::info!(%address, questions, "Server started");
            }
            SessionEvent::ClientConnected { peer } => {
                tracing::info!(%peer, "New client connected");
            }
            SessionEvent::AnswerRecorded {
                peer,
                question_number,
                correct,
            } => {
                tracing::debug!(%peer, question_number, correct, "Answer recorded");
            }
            SessionEvent::SessionFinished { peer, score, total } => {
                tracing::info!(%peer, score, total, "Client finished quiz");
            }
            SessionEvent::SessionAborted { peer, reason } => {
                tracing::warn!(%peer, %reason, "Session ended early");
            }
            SessionEvent::AcceptFailed { error } => {
                tracing::warn!(%error, "Error accepting client connection");
            }
            SessionEvent::ListenerStopped => {
                tracing::info!("Server stopped");
            }
        }
    }
}

/// Prints each event as one JSON object per stdout line.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonLinesSink;

impl EventSink for JsonLinesSink {
    fn emit(&self, event: &SessionEvent) {
        if let Err(e) = write_stdout_json(event) {
            tracing::error!("Failed to write event line: {}", e);
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &SessionEvent) {}
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &SessionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Forwards every event to each inner sink in turn.
pub struct FanoutSink {
    sinks: Vec<std::sync::Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<std::sync::Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: &SessionEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
