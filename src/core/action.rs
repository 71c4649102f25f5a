//! # Actions
//!
//! Everything that can happen to an open conversation becomes an `Action`.
//! User types? That's `Action::InputChanged`.
//! The channel delivers a message? That's `Action::InboundMessage(message)`.
//!
//! The `update()` function takes the current state and an action,
//! mutates the state, and returns the `Effect` the event loop must carry out.
//! No side effects here. I/O happens in the session runtime.
//!
//! ```text
//! State + Action  →  update()  →  New State + Effect
//! ```
//!
//! Actions for one conversation are applied one at a time from a single queue,
//! so store, typing, and search never see concurrent mutation.

use log::{debug, info};
use tokio::time::Instant;

use crate::core::state::ChatState;
use crate::core::store::Appended;
use crate::core::types::{ConnectionState, Message};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A live message arrived on the real-time channel.
    InboundMessage(Message),
    /// The adapter reported a connectivity change.
    ConnectionChanged(ConnectionState),
    /// The local input box changed.
    InputChanged { text: String, at: Instant },
    /// The typing deadline elapsed.
    TypingTimeout { at: Instant },
    /// The user sends the composed text.
    Send(String),
    SetQuery(String),
    NextMatch,
    PreviousMatch,
    Close,
}

/// What the event loop has to do after an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Hand the content to the transport. It becomes visible once echoed back.
    Transmit(String),
    /// A message was stored at this position.
    MessageAdded(usize),
    ConnectionChanged(ConnectionState),
    /// Query, matches, or current match changed.
    SearchChanged,
    Close,
}

pub fn update(state: &mut ChatState, action: Action) -> Effect {
    match action {
        Action::InboundMessage(message) => match state.store.append(message) {
            Appended::At(position) => {
                state.search.observe_append(position, &state.store);
                Effect::MessageAdded(position)
            }
            Appended::Duplicate | Appended::ForeignConversation => Effect::None,
        },
        Action::ConnectionChanged(connection) => {
            if state.connection == connection {
                return Effect::None;
            }
            info!(
                "Conversation {} is {}",
                state.conversation.id,
                connection.label()
            );
            state.connection = connection;
            state.status_message = match connection {
                ConnectionState::Connecting => "Connecting...".to_string(),
                ConnectionState::Connected => "Connected".to_string(),
                ConnectionState::Disconnected => "Disconnected, sending disabled".to_string(),
            };
            Effect::ConnectionChanged(connection)
        }
        Action::InputChanged { text, at } => {
            state.typing.on_input(&text, at);
            Effect::None
        }
        Action::TypingTimeout { at } => {
            state.typing.poll(at);
            Effect::None
        }
        Action::Send(content) => {
            state.typing.on_send();
            if content.trim().is_empty() {
                return Effect::None;
            }
            if !state.can_send() {
                debug!(
                    "Send ignored while {}: {} chars",
                    state.connection.label(),
                    content.len()
                );
                state.status_message = "Not connected, message not sent".to_string();
                return Effect::None;
            }
            Effect::Transmit(content)
        }
        Action::SetQuery(query) => {
            state.search.set_query(&query, &state.store);
            Effect::SearchChanged
        }
        Action::NextMatch => {
            if state.search.match_count() == 0 {
                return Effect::None;
            }
            state.search.next();
            Effect::SearchChanged
        }
        Action::PreviousMatch => {
            if state.search.match_count() == 0 {
                return Effect::None;
            }
            state.search.previous();
            Effect::SearchChanged
        }
        Action::Close => {
            state.reset_local();
            Effect::Close
        }
    }
}
