//! # Chat State
//!
//! Everything one open conversation owns. Presentation state lives in the
//! front-end, not here.
//!
//! ```text
//! ChatState
//! ├── conversation: Conversation    // id, group name, other participants
//! ├── actor: Actor                  // who we are in this conversation
//! ├── store: MessageStore           // ordered, de-duplicated messages
//! ├── typing: TypingDebouncer       // local composing flag + deadline
//! ├── search: SearchIndex           // query, matches, current match
//! ├── connection: ConnectionState   // mirror of the adapter's state
//! └── status_message: String        // last notable thing that happened
//! ```
//!
//! State changes only happen through `update(state, action)` in action.rs.

use std::time::Duration;

use crate::core::store::{MessageStore, StoreError};
use crate::core::search::SearchIndex;
use crate::core::typing::TypingDebouncer;
use crate::core::types::{Actor, ConnectionState, Conversation, Message, Transcript};

#[derive(Debug, Clone)]
pub struct ChatState {
    pub conversation: Conversation,
    pub actor: Actor,
    pub store: MessageStore,
    pub typing: TypingDebouncer,
    pub search: SearchIndex,
    /// Written only from `ConnectionChanged` actions, which the adapter emits.
    pub connection: ConnectionState,
    pub status_message: String,
}

impl ChatState {
    pub fn new(conversation: Conversation, actor: Actor, typing_timeout: Duration) -> Self {
        let store = MessageStore::new(conversation.id.clone());
        Self {
            conversation,
            actor,
            store,
            typing: TypingDebouncer::new(typing_timeout),
            search: SearchIndex::new(),
            connection: ConnectionState::Connecting,
            status_message: String::new(),
        }
    }

    /// Builds the state for a freshly fetched transcript, history already in the store.
    pub fn from_transcript(
        transcript: Transcript,
        typing_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let Transcript {
            conversation,
            messages,
            actor,
        } = transcript;
        let mut state = Self::new(conversation, actor, typing_timeout);
        let kept = state.store.initialize(messages)?;
        state.status_message = format!("Loaded {} messages", kept);
        Ok(state)
    }

    pub fn messages(&self) -> &[Message] {
        self.store.all()
    }

    pub fn can_send(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    /// Drops every timer and local UI-only state. Called on teardown.
    pub fn reset_local(&mut self) {
        self.typing.cancel();
        self.search.clear();
    }
}
