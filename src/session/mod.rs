//! # Session Runtime
//!
//! Owns at most one open conversation and serializes everything that can
//! touch it: front-end commands, transcript fetch results, channel events, and
//! the typing deadline all come through one `select!` loop.
//!
//! ```text
//!   Command ───┐
//!   fetch ─────┤                ┌───────────────┐
//!   channel ───┼──▶ select! ──▶ │ ActiveSession │ ──▶ SessionEvent
//!   deadline ──┘                │   update()    │
//!                               └───────────────┘
//! ```
//!
//! Opening a conversation tears down the previous one first and bumps a
//! generation counter. A fetch that completes for an older generation is
//! discarded, so a slow response can never resurrect a conversation the user
//! already left.

pub mod bootstrap;

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::api::TranscriptSource;
use crate::core::action::{Action, Effect};
use crate::core::config::{DEFAULT_EVENT_BUFFER, ResolvedConfig};
use crate::core::state::ChatState;
use crate::core::typing::DEFAULT_TYPING_TIMEOUT;
use crate::core::types::{Actor, ConnectionState, Conversation, Message, Transcript};
use crate::transport::{Transport, TransportEvent};

pub use bootstrap::{ActiveSession, SessionError};

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub typing_timeout: Duration,
    /// Capacity of the command and event queues.
    pub event_buffer: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            typing_timeout: DEFAULT_TYPING_TIMEOUT,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl From<&ResolvedConfig> for SessionSettings {
    fn from(config: &ResolvedConfig) -> Self {
        Self {
            typing_timeout: config.typing_timeout,
            event_buffer: config.event_buffer,
        }
    }
}

/// What a front-end can ask of the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Open a conversation, closing the current one. Ignored if already open or opening.
    Open(String),
    /// The input box now holds this text.
    Input(String),
    Send(String),
    /// Set the search query. An empty query clears the search.
    Search(String),
    NextMatch,
    PreviousMatch,
    /// Close the current conversation without opening another.
    Close,
    Shutdown,
}

/// Search state as the front-end needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSnapshot {
    pub query: String,
    pub match_count: usize,
    /// Position within the matches, `None` when there are none.
    pub current_index: Option<usize>,
    pub current: Option<Message>,
}

impl SearchSnapshot {
    fn of(state: &ChatState) -> Self {
        Self {
            query: state.search.query().to_string(),
            match_count: state.search.match_count(),
            current_index: state.search.current_index(),
            current: state.search.current_match(&state.store).cloned(),
        }
    }
}

/// What the runtime reports back to the front-end.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A conversation is open and its history loaded.
    Opened {
        conversation: Conversation,
        actor: Actor,
        history: Vec<Message>,
        connection: ConnectionState,
    },
    /// A live message was appended.
    Message(Message),
    Connection(ConnectionState),
    /// The local actor started or stopped composing.
    Composing(bool),
    Search(SearchSnapshot),
    Status(String),
    Failed {
        conversation_id: String,
        error: SessionError,
    },
    Closed {
        conversation_id: String,
    },
}

type FetchResult = (u64, String, Result<Transcript, SessionError>);

pub struct SessionRuntime {
    transcripts: Arc<dyn TranscriptSource>,
    transport: Arc<dyn Transport>,
    settings: SessionSettings,
    active: Option<ActiveSession>,
    /// Conversation whose transcript is being fetched.
    pending: Option<String>,
    generation: u64,
    fetch_tx: mpsc::Sender<FetchResult>,
    fetch_rx: mpsc::Receiver<FetchResult>,
}

impl SessionRuntime {
    pub fn new(
        transcripts: Arc<dyn TranscriptSource>,
        transport: Arc<dyn Transport>,
        settings: SessionSettings,
    ) -> Self {
        let (fetch_tx, fetch_rx) = mpsc::channel(4);
        Self {
            transcripts,
            transport,
            settings,
            active: None,
            pending: None,
            generation: 0,
            fetch_tx,
            fetch_rx,
        }
    }

    /// Spawns the runtime on its own task, returning the command sender and event receiver.
    pub fn spawn(self) -> (mpsc::Sender<Command>, mpsc::Receiver<SessionEvent>, JoinHandle<()>) {
        let capacity = self.settings.event_buffer.max(1);
        let (command_tx, command_rx) = mpsc::channel(capacity);
        let (event_tx, event_rx) = mpsc::channel(capacity);
        let task = tokio::spawn(self.run(command_rx, event_tx));
        (command_tx, event_rx, task)
    }

    /// Runs until `Shutdown` or until every command sender is dropped.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        events: mpsc::Sender<SessionEvent>,
    ) {
        info!(
            "Session runtime started on {} transport",
            self.transport.name()
        );
        loop {
            let deadline = self
                .active
                .as_ref()
                .and_then(|session| session.state.typing.deadline());

            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        debug!("Command channel closed");
                        break;
                    };
                    if !self.handle_command(command, &events).await {
                        break;
                    }
                }
                Some((generation, conversation_id, result)) = self.fetch_rx.recv() => {
                    self.finish_open(generation, conversation_id, result, &events).await;
                }
                event = next_transport_event(&mut self.active) => {
                    self.handle_transport_event(event, &events).await;
                }
                _ = typing_deadline(deadline) => {
                    self.dispatch(Action::TypingTimeout { at: Instant::now() }, &events).await;
                }
            }
        }
        self.close_current(&events).await;
        info!("Session runtime stopped");
    }

    /// Returns false when the runtime should stop.
    async fn handle_command(
        &mut self,
        command: Command,
        events: &mpsc::Sender<SessionEvent>,
    ) -> bool {
        match command {
            Command::Open(conversation_id) => self.open(conversation_id, events).await,
            Command::Input(text) => {
                self.dispatch(
                    Action::InputChanged {
                        text,
                        at: Instant::now(),
                    },
                    events,
                )
                .await
            }
            Command::Send(content) => self.dispatch(Action::Send(content), events).await,
            Command::Search(query) => self.dispatch(Action::SetQuery(query), events).await,
            Command::NextMatch => self.dispatch(Action::NextMatch, events).await,
            Command::PreviousMatch => self.dispatch(Action::PreviousMatch, events).await,
            Command::Close => self.close_current(events).await,
            Command::Shutdown => {
                info!("Shutdown requested");
                return false;
            }
        }
        true
    }

    async fn open(&mut self, conversation_id: String, events: &mpsc::Sender<SessionEvent>) {
        let conversation_id = match bootstrap::validate_conversation_id(&conversation_id) {
            Ok(id) => id.to_string(),
            Err(error) => {
                warn!("Refusing to open {:?}: {}", conversation_id, error);
                emit(
                    events,
                    SessionEvent::Failed {
                        conversation_id: conversation_id.clone(),
                        error,
                    },
                )
                .await;
                return;
            }
        };

        let already_open = self
            .active
            .as_ref()
            .is_some_and(|session| session.conversation_id() == conversation_id);
        if already_open || self.pending.as_deref() == Some(conversation_id.as_str()) {
            debug!("Conversation {} already open, ignoring", conversation_id);
            return;
        }

        self.close_current(events).await;
        self.generation += 1;
        self.pending = Some(conversation_id.clone());

        let generation = self.generation;
        let source = self.transcripts.clone();
        let results = self.fetch_tx.clone();
        tokio::spawn(async move {
            let result = bootstrap::fetch(source.as_ref(), &conversation_id).await;
            let _ = results.send((generation, conversation_id, result)).await;
        });
    }

    async fn finish_open(
        &mut self,
        generation: u64,
        conversation_id: String,
        result: Result<Transcript, SessionError>,
        events: &mpsc::Sender<SessionEvent>,
    ) {
        if generation != self.generation {
            info!("Discarding stale transcript for {}", conversation_id);
            return;
        }
        self.pending = None;

        let opened = match result {
            Ok(transcript) => {
                bootstrap::establish(transcript, self.transport.as_ref(), &self.settings).await
            }
            Err(error) => Err(error),
        };
        match opened {
            Ok(session) => {
                let state = &session.state;
                emit(
                    events,
                    SessionEvent::Opened {
                        conversation: state.conversation.clone(),
                        actor: state.actor.clone(),
                        history: state.messages().to_vec(),
                        connection: state.connection,
                    },
                )
                .await;
                self.active = Some(session);
            }
            Err(error) => {
                warn!("Failed to open {}: {}", conversation_id, error);
                emit(
                    events,
                    SessionEvent::Failed {
                        conversation_id,
                        error,
                    },
                )
                .await;
            }
        }
    }

    async fn handle_transport_event(
        &mut self,
        event: Option<TransportEvent>,
        events: &mpsc::Sender<SessionEvent>,
    ) {
        let action = match event {
            Some(TransportEvent::Message(message)) => Action::InboundMessage(message),
            Some(TransportEvent::Connection(connection)) => Action::ConnectionChanged(connection),
            None => {
                debug!("Channel stopped");
                Action::ConnectionChanged(ConnectionState::Disconnected)
            }
        };
        self.dispatch(action, events).await;
    }

    /// Applies an action to the open conversation and publishes what changed.
    async fn dispatch(&mut self, action: Action, events: &mpsc::Sender<SessionEvent>) {
        let Some(session) = self.active.as_mut() else {
            debug!("No open conversation, dropping {:?}", action);
            return;
        };

        let was_composing = session.state.typing.is_composing();
        let previous_status = session.state.status_message.clone();
        let effect = session.apply(action);
        let state = &session.state;

        let mut out = Vec::new();
        if state.typing.is_composing() != was_composing {
            out.push(SessionEvent::Composing(state.typing.is_composing()));
        }
        match effect {
            Effect::MessageAdded(position) => {
                if let Some(message) = state.store.get(position) {
                    out.push(SessionEvent::Message(message.clone()));
                }
                if state.search.matches().last() == Some(&position) {
                    out.push(SessionEvent::Search(SearchSnapshot::of(state)));
                }
            }
            Effect::ConnectionChanged(connection) => {
                out.push(SessionEvent::Connection(connection));
            }
            Effect::SearchChanged => out.push(SessionEvent::Search(SearchSnapshot::of(state))),
            Effect::Transmit(_) | Effect::Close | Effect::None => {}
        }
        if state.status_message != previous_status {
            out.push(SessionEvent::Status(state.status_message.clone()));
        }

        for event in out {
            emit(events, event).await;
        }
    }

    /// Tears down the open conversation and cancels any fetch in flight.
    async fn close_current(&mut self, events: &mpsc::Sender<SessionEvent>) {
        if let Some(conversation_id) = self.pending.take() {
            debug!("Cancelling fetch for {}", conversation_id);
            self.generation += 1;
        }
        if let Some(session) = self.active.take() {
            let conversation_id = session.conversation_id().to_string();
            session.teardown();
            emit(events, SessionEvent::Closed { conversation_id }).await;
        }
    }
}

async fn emit(events: &mpsc::Sender<SessionEvent>, event: SessionEvent) {
    if events.send(event).await.is_err() {
        debug!("Front-end gone, event dropped");
    }
}

/// Next event from the open channel. Pending forever when there is nothing to read.
async fn next_transport_event(active: &mut Option<ActiveSession>) -> Option<TransportEvent> {
    match active {
        Some(session) if !session.handle.is_drained() => session.handle.next_event().await,
        _ => std::future::pending().await,
    }
}

async fn typing_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
