//! # Message Store
//!
//! The ordered, duplicate-free message sequence of one conversation.
//!
//! ```text
//! initialize(history)      append(live) ...
//!        │                      │
//!        ▼                      ▼
//! [ h1, h2, h3 ][ l1, l2, l3 ...]      messages: Vec<Message>
//!                                      seen:     HashSet<MessageId>
//! ```
//!
//! History always precedes live messages: `initialize` runs once, before any
//! `append`. Live messages keep arrival order; timestamps are never used to sort.
//! Positions are stable because nothing is ever removed or reordered.

use std::collections::HashSet;
use std::fmt;

use log::{debug, warn};

use crate::core::types::{Message, MessageId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// `initialize` was already called for this session.
    AlreadyInitialized,
    /// A live message was appended before the history arrived.
    LiveBeforeHistory,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::AlreadyInitialized => write!(f, "message history already initialized"),
            StoreError::LiveBeforeHistory => {
                write!(f, "live messages arrived before the message history")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Outcome of [`MessageStore::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appended {
    /// Stored at this position.
    At(usize),
    /// A message with the same id is already stored.
    Duplicate,
    /// The message belongs to another conversation.
    ForeignConversation,
}

#[derive(Debug, Clone)]
pub struct MessageStore {
    conversation_id: String,
    messages: Vec<Message>,
    seen: HashSet<MessageId>,
    initialized: bool,
}

impl MessageStore {
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            messages: Vec::new(),
            seen: HashSet::new(),
            initialized: false,
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Seeds the store with the historical transcript. Returns how many messages were kept.
    pub fn initialize(&mut self, history: Vec<Message>) -> Result<usize, StoreError> {
        if self.initialized {
            return Err(StoreError::AlreadyInitialized);
        }
        if !self.messages.is_empty() {
            return Err(StoreError::LiveBeforeHistory);
        }
        self.initialized = true;

        let total = history.len();
        for message in history {
            if message.conversation_id != self.conversation_id {
                warn!(
                    "Dropping historical message {} from conversation {}",
                    message.id, message.conversation_id
                );
                continue;
            }
            if !self.seen.insert(message.id.clone()) {
                warn!("Dropping duplicate historical message {}", message.id);
                continue;
            }
            self.messages.push(message);
        }
        debug!(
            "Store for {} initialized with {}/{} messages",
            self.conversation_id,
            self.messages.len(),
            total
        );
        Ok(self.messages.len())
    }

    /// Appends a live message at the tail.
    pub fn append(&mut self, message: Message) -> Appended {
        if message.conversation_id != self.conversation_id {
            warn!(
                "Dropping message {} addressed to conversation {}",
                message.id, message.conversation_id
            );
            return Appended::ForeignConversation;
        }
        if self.seen.contains(&message.id) {
            debug!("Dropping redelivered message {}", message.id);
            return Appended::Duplicate;
        }
        self.seen.insert(message.id.clone());
        self.messages.push(message);
        Appended::At(self.messages.len() - 1)
    }

    /// Read-only view of the sequence.
    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, position: usize) -> Option<&Message> {
        self.messages.get(position)
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::message;

    fn ids(store: &MessageStore) -> Vec<&str> {
        store.all().iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_history_precedes_live_messages() {
        let mut store = MessageStore::new("c1");
        let kept = store
            .initialize(vec![
                message("m1", "u2", "hi"),
                message("m2", "me", "hello"),
                message("m3", "u2", "how are you"),
            ])
            .unwrap();
        assert_eq!(kept, 3);

        assert_eq!(store.append(message("m4", "me", "fine")), Appended::At(3));
        assert_eq!(store.append(message("m5", "u2", "great")), Appended::At(4));
        assert_eq!(ids(&store), vec!["m1", "m2", "m3", "m4", "m5"]);
    }

    #[test]
    fn test_live_order_is_arrival_order_not_timestamp() {
        let mut store = MessageStore::new("c1");
        store.initialize(Vec::new()).unwrap();
        let mut late = message("late", "u2", "sent later");
        late.created_at = late.created_at + chrono::Duration::minutes(5);
        let early = message("early", "u2", "sent earlier");

        store.append(late);
        store.append(early);
        assert_eq!(ids(&store), vec!["late", "early"]);
    }

    #[test]
    fn test_redelivered_history_is_dropped() {
        let mut store = MessageStore::new("c1");
        store.initialize(vec![message("m1", "u2", "hi")]).unwrap();
        assert_eq!(store.append(message("m1", "u2", "hi")), Appended::Duplicate);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_duplicate_live_message_is_dropped() {
        let mut store = MessageStore::new("c1");
        store.initialize(Vec::new()).unwrap();
        store.append(message("m4", "u2", "once"));
        assert_eq!(store.append(message("m4", "u2", "once")), Appended::Duplicate);
        assert_eq!(ids(&store), vec!["m4"]);
    }

    #[test]
    fn test_foreign_conversation_is_dropped() {
        let mut store = MessageStore::new("c1");
        store.initialize(Vec::new()).unwrap();
        let mut stray = message("m9", "u2", "wrong room");
        stray.conversation_id = "c2".into();
        assert_eq!(store.append(stray), Appended::ForeignConversation);
        assert!(store.is_empty());
    }

    #[test]
    fn test_initialize_skips_duplicates_within_history() {
        let mut store = MessageStore::new("c1");
        let kept = store
            .initialize(vec![message("m1", "u2", "a"), message("m1", "u2", "a")])
            .unwrap();
        assert_eq!(kept, 1);
    }

    #[test]
    fn test_initialize_only_once() {
        let mut store = MessageStore::new("c1");
        store.initialize(Vec::new()).unwrap();
        assert_eq!(
            store.initialize(vec![message("m1", "u2", "a")]),
            Err(StoreError::AlreadyInitialized)
        );
    }

    #[test]
    fn test_initialize_after_live_is_rejected() {
        let mut store = MessageStore::new("c1");
        store.append(message("m4", "u2", "early bird"));
        assert_eq!(
            store.initialize(vec![message("m1", "u2", "a")]),
            Err(StoreError::LiveBeforeHistory)
        );
        assert!(!store.is_initialized());
    }
}
