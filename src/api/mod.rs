pub mod client;
pub mod types;

use std::fmt;

use async_trait::async_trait;

use crate::core::types::Transcript;

pub use client::HttpTranscriptClient;

/// Errors that can occur while fetching a transcript.
/// `Unauthorized` and `NotFound` are terminal for the session; nothing is retried here.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Client misconfigured (bad base URL).
    Config(String),
    /// The actor must re-authenticate (HTTP 401/403).
    Unauthorized,
    /// The conversation does not exist or the actor is not a member (HTTP 404).
    NotFound,
    /// Network-level failure (timeout, DNS, connection refused).
    Network(String),
    /// Any other non-success response.
    Api { status: u16, message: String },
    /// The response body was not a transcript.
    Parse(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Config(msg) => write!(f, "config error: {msg}"),
            FetchError::Unauthorized => write!(f, "not authorized for this conversation"),
            FetchError::NotFound => write!(f, "conversation not found"),
            FetchError::Network(msg) => write!(f, "network error: {msg}"),
            FetchError::Api { status, message } => {
                write!(f, "API error (HTTP {status}): {message}")
            }
            FetchError::Parse(msg) => write!(f, "parse error: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// One-shot transcript retrieval for a conversation.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetches participants, historical messages, and the resolved current actor.
    async fn fetch_transcript(&self, conversation_id: &str) -> Result<Transcript, FetchError>;
}
