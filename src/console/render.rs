//! Turns session events into printable lines.

use chrono::Local;
use log::debug;

use crate::core::types::{Actor, Conversation, Message};
use crate::session::{SearchSnapshot, SessionEvent};

/// What the console remembers about the open conversation.
#[derive(Debug, Default)]
pub struct View {
    conversation: Option<Conversation>,
    actor: Option<Actor>,
}

impl View {
    pub fn conversation(&self) -> Option<&Conversation> {
        self.conversation.as_ref()
    }

    pub fn render(&mut self, event: &SessionEvent) -> Vec<String> {
        match event {
            SessionEvent::Opened {
                conversation,
                actor,
                history,
                connection,
            } => {
                let mut lines = vec![format!(
                    "── {} ({} messages, {}) ──",
                    conversation.title(),
                    history.len(),
                    connection.label()
                )];
                lines.extend(
                    history
                        .iter()
                        .map(|m| format_message(m, conversation, actor)),
                );
                self.conversation = Some(conversation.clone());
                self.actor = Some(actor.clone());
                lines
            }
            SessionEvent::Message(message) => match (&self.conversation, &self.actor) {
                (Some(conversation), Some(actor)) => {
                    vec![format_message(message, conversation, actor)]
                }
                _ => Vec::new(),
            },
            SessionEvent::Search(snapshot) => vec![self.format_search(snapshot)],
            SessionEvent::Status(status) => vec![format!("* {status}")],
            SessionEvent::Failed {
                conversation_id,
                error,
            } => {
                let mut lines = vec![format!("! could not open {conversation_id:?}: {error}")];
                if error.is_fatal() {
                    lines.push("  use /open <id> to pick another conversation".to_string());
                }
                lines
            }
            SessionEvent::Closed { conversation_id } => {
                self.conversation = None;
                self.actor = None;
                vec![format!("── closed {conversation_id} ──")]
            }
            // Both also show up as a status line or in the prompt.
            SessionEvent::Connection(_) | SessionEvent::Composing(_) => {
                debug!("Not rendered: {:?}", event);
                Vec::new()
            }
        }
    }

    fn format_search(&self, snapshot: &SearchSnapshot) -> String {
        if snapshot.query.is_empty() {
            return "search cleared".to_string();
        }
        let (Some(index), Some(current)) = (snapshot.current_index, &snapshot.current) else {
            return format!("no matches for {:?}", snapshot.query);
        };
        let line = match (&self.conversation, &self.actor) {
            (Some(conversation), Some(actor)) => format_message(current, conversation, actor),
            _ => current.content.clone(),
        };
        format!("match {}/{}: {}", index + 1, snapshot.match_count, line)
    }
}

/// `[HH:MM] Name: content`, with the actor shown as "You".
pub fn format_message(message: &Message, conversation: &Conversation, actor: &Actor) -> String {
    format!(
        "[{}] {}: {}",
        message.created_at.with_timezone(&Local).format("%H:%M"),
        conversation.display_name(&message.sender_id, actor),
        message.content
    )
}

/// Prompt prefix showing the open conversation and whether we are composing.
pub fn prompt(view: &View, composing: bool) -> String {
    match view.conversation() {
        Some(conversation) if composing => format!("{}*> ", conversation.title()),
        Some(conversation) => format!("{}> ", conversation.title()),
        None => "> ".to_string(),
    }
}
