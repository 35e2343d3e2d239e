use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinError;

use crate::protocol_objects::Message;

#[derive(Error, Debug)]
pub enum RealtimeError {
    #[error("Failed to connect to WebSocket: {0}")]
    ConnectionError(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    #[error("Failed to serialize message to JSON: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("WebSocket connection closed unexpectedly")]
    ConnectionClosed,

    #[error("Client is not connected")]
    NotConnected,

    #[error("Gave up reconnecting after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    #[error("Failed to send message through MPSC channel: {0}")]
    MpscSendError(#[from] Box<tokio::sync::mpsc::error::SendError<Message>>),

    #[error("Url must be a valid WebSocket URL or HTTP URL string: {url}")]
    InvalidUrl { url: String },

    #[error("Invalid connection configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Missing required environment variable {name}")]
    MissingEnv { name: String },

    #[error("Session validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Session validation timed out after {0:?}")]
    ValidationTimeout(Duration),

    #[error("Request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("HTTP transport error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Session expired; sign in again")]
    SessionExpired,

    #[error("Request aborted")]
    Aborted,

    #[error("Task panicked or was cancelled: {0}")]
    TaskPanic(#[from] JoinError),

    #[error("Multiple tasks failed ({} errors): {}", errors.len(), .errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    MultipleTaskErrors { errors: Vec<RealtimeError> },
}

impl RealtimeError {
    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        RealtimeError::InvalidConfig {
            reason: reason.into(),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for RealtimeError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        RealtimeError::ConnectionError(Box::new(err))
    }
}

impl From<tokio::sync::mpsc::error::SendError<Message>> for RealtimeError {
    fn from(err: tokio::sync::mpsc::error::SendError<Message>) -> Self {
        RealtimeError::MpscSendError(Box::new(err))
    }
}
