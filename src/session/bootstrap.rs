//! # Session Bootstrap
//!
//! Opening a conversation happens in two steps so the runtime can drop a fetch
//! that went stale while it was in flight:
//!
//! ```text
//! fetch(id)         → Transcript     (suspends on the network; may be discarded)
//! establish(t)      → ActiveSession  (store seeded with history, then channel opened)
//! bootstrap(id)     = fetch + establish
//! ```
//!
//! The store is initialized before the channel is opened, so every historical
//! message precedes every live one.

use std::collections::HashSet;
use std::fmt;

use log::{debug, info, warn};

use crate::api::{FetchError, TranscriptSource};
use crate::core::action::{Action, Effect, update};
use crate::core::state::ChatState;
use crate::core::store::StoreError;
use crate::core::types::Transcript;
use crate::session::SessionSettings;
use crate::transport::{Transport, TransportError, TransportHandle};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// The conversation id was empty.
    InvalidConversationId,
    /// The actor must re-authenticate. Terminal.
    Unauthorized,
    /// The conversation does not exist or the actor is not a member. Terminal.
    NotFound,
    /// Any other fetch failure.
    Fetch(FetchError),
    Store(StoreError),
    Transport(TransportError),
}

impl SessionError {
    /// Fatal errors mean the caller should leave the chat view, not retry.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::InvalidConversationId | SessionError::Unauthorized | SessionError::NotFound
        )
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::InvalidConversationId => write!(f, "conversation id is empty"),
            SessionError::Unauthorized => write!(f, "not authorized for this conversation"),
            SessionError::NotFound => write!(f, "conversation not found"),
            SessionError::Fetch(e) => write!(f, "transcript fetch failed: {e}"),
            SessionError::Store(e) => write!(f, "message store error: {e}"),
            SessionError::Transport(e) => write!(f, "transport error: {e}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<FetchError> for SessionError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::Unauthorized => SessionError::Unauthorized,
            FetchError::NotFound => SessionError::NotFound,
            other => SessionError::Fetch(other),
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(error: StoreError) -> Self {
        SessionError::Store(error)
    }
}

impl From<TransportError> for SessionError {
    fn from(error: TransportError) -> Self {
        SessionError::Transport(error)
    }
}

/// An open conversation: its state plus the channel feeding it.
pub struct ActiveSession {
    pub state: ChatState,
    pub handle: TransportHandle,
}

impl ActiveSession {
    pub fn conversation_id(&self) -> &str {
        &self.state.conversation.id
    }

    /// Runs the reducer and carries out `Transmit` on the channel.
    pub fn apply(&mut self, action: Action) -> Effect {
        let effect = update(&mut self.state, action);
        if let Effect::Transmit(ref content) = effect {
            if self.handle.send(content.clone()) {
                debug!("Sent {} chars on {}", content.len(), self.conversation_id());
            } else {
                warn!("Send on {} dropped by transport", self.conversation_id());
                self.state.status_message = "Message not sent".to_string();
            }
        }
        effect
    }

    /// Closes the channel and cancels the typing deadline.
    pub fn teardown(mut self) {
        info!("Tearing down conversation {}", self.conversation_id());
        self.handle.close();
        update(&mut self.state, Action::Close);
    }
}

/// Trims the id and rejects empty ones.
pub fn validate_conversation_id(conversation_id: &str) -> Result<&str, SessionError> {
    let trimmed = conversation_id.trim();
    if trimmed.is_empty() {
        return Err(SessionError::InvalidConversationId);
    }
    Ok(trimmed)
}

/// Drops the current actor and duplicate ids from the participant list.
pub fn resolve_participants(transcript: &mut Transcript) {
    let actor_id = transcript.actor.id.clone();
    let mut seen = HashSet::new();
    transcript
        .conversation
        .participants
        .retain(|p| p.id != actor_id && seen.insert(p.id.clone()));
}

/// Fetches the transcript for `conversation_id`. Exactly one request per call.
pub async fn fetch(
    source: &dyn TranscriptSource,
    conversation_id: &str,
) -> Result<Transcript, SessionError> {
    let conversation_id = validate_conversation_id(conversation_id)?;
    info!("Bootstrapping conversation {}", conversation_id);

    let mut transcript = source.fetch_transcript(conversation_id).await?;
    if transcript.conversation.id != conversation_id {
        return Err(SessionError::Fetch(FetchError::Parse(format!(
            "asked for conversation {} but got {}",
            conversation_id, transcript.conversation.id
        ))));
    }
    resolve_participants(&mut transcript);
    debug!(
        "Transcript for {}: {} messages, actor {}",
        conversation_id,
        transcript.messages.len(),
        transcript.actor.id
    );
    Ok(transcript)
}

/// Seeds the state with the transcript's history, then opens the channel.
pub async fn establish(
    transcript: Transcript,
    transport: &dyn Transport,
    settings: &SessionSettings,
) -> Result<ActiveSession, SessionError> {
    let mut state = ChatState::from_transcript(transcript, settings.typing_timeout)?;
    let handle = transport
        .connect(&state.conversation.id, &state.actor)
        .await?;
    state.connection = handle.connection_state();
    info!(
        "Conversation {} open on {} ({} messages, {})",
        state.conversation.id,
        transport.name(),
        state.store.len(),
        state.connection.label()
    );
    Ok(ActiveSession { state, handle })
}

/// Fetch and establish in one go.
pub async fn bootstrap(
    source: &dyn TranscriptSource,
    transport: &dyn Transport,
    conversation_id: &str,
    settings: &SessionSettings,
) -> Result<ActiveSession, SessionError> {
    let transcript = fetch(source, conversation_id).await?;
    establish(transcript, transport, settings).await
}
