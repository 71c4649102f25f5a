//! Wire types for the transcript endpoint.
//!
//! ```json
//! {
//!   "chat": { "id": "c1", "name": null, "participants": [{ "id": "u2", "name": "Ada" }] },
//!   "messages": [{ "id": "m1", "senderId": "u2", "content": "hi",
//!                  "conversationId": "c1", "createdAt": "2024-05-01T10:00:00Z" }],
//!   "currentUser": { "id": "me", "name": "Me" }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::core::types::{Actor, Conversation, Message, Participant, Transcript};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptResponse {
    pub chat: ChatInfo,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub current_user: UserInfo,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub participants: Vec<UserInfo>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl From<UserInfo> for Participant {
    fn from(user: UserInfo) -> Self {
        Participant {
            id: user.id,
            name: user.name,
        }
    }
}

impl From<UserInfo> for Actor {
    fn from(user: UserInfo) -> Self {
        Actor {
            id: user.id,
            name: user.name,
        }
    }
}

impl From<TranscriptResponse> for Transcript {
    fn from(response: TranscriptResponse) -> Self {
        Transcript {
            conversation: Conversation {
                id: response.chat.id,
                name: response.chat.name,
                participants: response
                    .chat
                    .participants
                    .into_iter()
                    .map(Participant::from)
                    .collect(),
            },
            messages: response.messages,
            actor: response.current_user.into(),
        }
    }
}
