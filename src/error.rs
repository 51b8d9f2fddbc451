//! Error types for quizwire.

use thiserror::Error;

/// Everything that can go wrong while loading, serving, or playing a quiz.
#[derive(Debug, Error)]
pub enum QuizError {
    /// Socket or file I/O failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Status or event line could not be serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Listener could not bind to the configured address.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Question source contained no valid questions.
    #[error("no valid questions found in {source_name}")]
    NoQuestions { source_name: String },

    /// Question failed validation (empty text, no options, bad answer).
    #[error("invalid question: {0}")]
    InvalidQuestion(String),

    /// Peer sent something that is not a valid frame.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Peer sent a line longer than the allowed maximum.
    #[error("line exceeds maximum length of {limit} bytes")]
    LineTooLong { limit: usize },

    /// Peer went away before the quiz finished.
    #[error("connection closed")]
    ConnectionClosed,

    /// Outbound queue stayed full past the send timeout.
    #[error("outbound queue full: peer is not reading")]
    BackpressureTimeout,
}

pub type Result<T> = std::result::Result<T, QuizError>;
