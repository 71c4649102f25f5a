//! In-process transport.
//!
//! Behaves like the server side of the real channel: every send is stored
//! with a fresh id and echoed back to the sender. [`LoopbackRemote`] plays the
//! other participants and the network: it can deliver messages and flip the
//! connection state of the most recently opened channel.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use tokio::sync::{mpsc, watch};

use crate::core::config::DEFAULT_EVENT_BUFFER;
use crate::core::types::{Actor, ConnectionState, Message, MessageId};
use crate::transport::{Transport, TransportError, TransportEvent, TransportHandle};

/// The adapter-side ends of the current channel, shared with the remote.
struct Link {
    conversation_id: String,
    events: mpsc::Sender<TransportEvent>,
    state: Arc<watch::Sender<ConnectionState>>,
}

#[derive(Default)]
struct Shared {
    current: Mutex<Option<Link>>,
    opened: AtomicUsize,
}

pub struct LoopbackTransport {
    shared: Arc<Shared>,
    capacity: usize,
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            capacity: DEFAULT_EVENT_BUFFER,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Control surface for the most recently opened channel.
    pub fn remote(&self) -> LoopbackRemote {
        LoopbackRemote {
            shared: self.shared.clone(),
        }
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    fn name(&self) -> &str {
        "loopback"
    }

    async fn connect(
        &self,
        conversation_id: &str,
        actor: &Actor,
    ) -> Result<TransportHandle, TransportError> {
        let (handle, adapter) = TransportHandle::channel(conversation_id, self.capacity);
        let mut outbound = adapter.outbound;
        let events = adapter.events;
        let state = Arc::new(adapter.state);

        self.shared.opened.fetch_add(1, Ordering::SeqCst);
        {
            let mut current = self
                .shared
                .current
                .lock()
                .map_err(|_| TransportError::Connect("loopback state poisoned".into()))?;
            *current = Some(Link {
                conversation_id: conversation_id.to_string(),
                events: events.clone(),
                state: state.clone(),
            });
        }

        state.send_replace(ConnectionState::Connected);
        let _ = events.try_send(TransportEvent::Connection(ConnectionState::Connected));

        let conversation_id = conversation_id.to_string();
        let sender_id = actor.id.clone();
        let task = tokio::spawn(async move {
            while let Some(out) = outbound.recv().await {
                let echo = Message {
                    id: MessageId::new(uuid::Uuid::new_v4().to_string()),
                    sender_id: sender_id.clone(),
                    content: out.content,
                    conversation_id: conversation_id.clone(),
                    created_at: Utc::now(),
                };
                debug!("Loopback echo {} on {}", echo.id, conversation_id);
                if events.send(TransportEvent::Message(echo)).await.is_err() {
                    break;
                }
            }
            state.send_replace(ConnectionState::Disconnected);
        });
        Ok(handle.with_task(task))
    }
}

/// Plays the far side of a loopback channel.
#[derive(Clone)]
pub struct LoopbackRemote {
    shared: Arc<Shared>,
}

impl LoopbackRemote {
    /// Delivers a message to the current channel. Returns false if there is none
    /// or it has been closed.
    pub async fn deliver(&self, message: Message) -> bool {
        let Some(events) = self.current_events() else {
            return false;
        };
        events.send(TransportEvent::Message(message)).await.is_ok()
    }

    /// Changes the connection state of the current channel.
    pub async fn set_state(&self, connection: ConnectionState) -> bool {
        let link = {
            let Ok(current) = self.shared.current.lock() else {
                return false;
            };
            current
                .as_ref()
                .map(|link| (link.events.clone(), link.state.clone()))
        };
        let Some((events, state)) = link else {
            return false;
        };
        state.send_replace(connection);
        events
            .send(TransportEvent::Connection(connection))
            .await
            .is_ok()
    }

    /// Conversation of the most recently opened channel.
    pub fn current_conversation(&self) -> Option<String> {
        let current = self.shared.current.lock().ok()?;
        current.as_ref().map(|link| link.conversation_id.clone())
    }

    /// Whether the current channel is still held open by a session.
    pub fn is_open(&self) -> bool {
        self.current_events().is_some_and(|events| !events.is_closed())
    }

    /// How many channels have been opened in total.
    pub fn opened(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }

    fn current_events(&self) -> Option<mpsc::Sender<TransportEvent>> {
        let current = self.shared.current.lock().ok()?;
        current.as_ref().map(|link| link.events.clone())
    }
}
