use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a message, unique within its conversation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A chat message. Created by the transcript fetch or by an inbound transport event,
/// never mutated afterwards.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub sender_id: String,
    pub content: String,
    pub conversation_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// The identity the session acts as. Resolved by the transcript fetch.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// An open conversation. `participants` never contains the current actor.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub id: String,
    pub name: Option<String>,
    pub participants: Vec<Participant>,
}

impl Conversation {
    /// Group name if there is one, otherwise the other participants' names.
    pub fn title(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }
        if self.participants.is_empty() {
            return "Untitled".to_string();
        }
        self.participants
            .iter()
            .map(|p| p.name.as_deref().unwrap_or(&p.id))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Name to show next to a message from `sender_id`.
    pub fn display_name<'a>(&'a self, sender_id: &'a str, actor: &Actor) -> &'a str {
        if sender_id == actor.id {
            return "You";
        }
        self.participants
            .iter()
            .find(|p| p.id == sender_id)
            .and_then(|p| p.name.as_deref())
            .unwrap_or(sender_id)
    }
}

/// Everything the one-shot transcript fetch resolves for a conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub conversation: Conversation,
    pub messages: Vec<Message>,
    pub actor: Actor,
}

/// Connectivity of the real-time channel. Owned by the transport adapter.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Connecting,
    Connected,
    Disconnected,
}

impl ConnectionState {
    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
        }
    }
}
