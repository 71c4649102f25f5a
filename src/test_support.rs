//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::api::{FetchError, TranscriptSource};
use crate::core::state::ChatState;
use crate::core::store::MessageStore;
use crate::core::typing::DEFAULT_TYPING_TIMEOUT;
use crate::core::types::{Actor, Conversation, Message, MessageId, Participant, Transcript};

/// A message in conversation `c1` with a fixed timestamp.
pub fn message(id: &str, sender: &str, content: &str) -> Message {
    Message {
        id: MessageId::new(id),
        sender_id: sender.to_string(),
        content: content.to_string(),
        conversation_id: "c1".to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
    }
}

pub fn actor() -> Actor {
    Actor {
        id: "me".to_string(),
        name: Some("Me".to_string()),
    }
}

pub fn conversation() -> Conversation {
    Conversation {
        id: "c1".to_string(),
        name: None,
        participants: vec![Participant {
            id: "u2".to_string(),
            name: Some("Ada".to_string()),
        }],
    }
}

pub fn transcript(messages: Vec<Message>) -> Transcript {
    Transcript {
        conversation: conversation(),
        messages,
        actor: actor(),
    }
}

/// An initialized store for conversation `c1`.
pub fn store_with(history: Vec<Message>) -> MessageStore {
    let mut store = MessageStore::new("c1");
    store.initialize(history).unwrap();
    store
}

/// Creates a test state for `c1` with an empty, initialized history.
pub fn test_state() -> ChatState {
    ChatState::from_transcript(transcript(Vec::new()), DEFAULT_TYPING_TIMEOUT).unwrap()
}

/// In-memory transcript source keyed by conversation id. Unknown ids are `NotFound`.
#[derive(Default)]
pub struct StaticTranscripts {
    transcripts: HashMap<String, Transcript>,
    pub fetches: Mutex<Vec<String>>,
}

impl StaticTranscripts {
    pub fn with(mut self, transcript: Transcript) -> Self {
        self.transcripts
            .insert(transcript.conversation.id.clone(), transcript);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }
}

#[async_trait]
impl TranscriptSource for StaticTranscripts {
    async fn fetch_transcript(&self, conversation_id: &str) -> Result<Transcript, FetchError> {
        self.fetches
            .lock()
            .unwrap()
            .push(conversation_id.to_string());
        self.transcripts
            .get(conversation_id)
            .cloned()
            .ok_or(FetchError::NotFound)
    }
}
