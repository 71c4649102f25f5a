use std::fmt;

use async_trait::async_trait;
use log::debug;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::core::types::{Actor, ConnectionState, Message};

/// Errors that can occur while opening a real-time channel.
/// Losing an open channel is not an error; it is a `ConnectionState` change.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The channel URL could not be built. Not retryable.
    InvalidUrl(String),
    /// The adapter could not be started.
    Connect(String),
    /// The adapter was already shut down.
    Closed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::InvalidUrl(msg) => write!(f, "invalid channel URL: {msg}"),
            TransportError::Connect(msg) => write!(f, "connect error: {msg}"),
            TransportError::Closed => write!(f, "transport closed"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Something the adapter delivers to the session loop.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Message(Message),
    Connection(ConnectionState),
}

/// Outbound send request. Only the content travels; the server fills in the rest
/// and echoes the stored message back to every participant, the sender included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub content: String,
}

/// The adapter-side ends of a handle's channels.
pub struct AdapterChannels {
    pub outbound: mpsc::Receiver<OutboundMessage>,
    pub events: mpsc::Sender<TransportEvent>,
    pub state: watch::Sender<ConnectionState>,
}

impl AdapterChannels {
    /// Publishes a state change both to the watch and to the event queue.
    /// Returns false if the session side has gone away.
    pub async fn report(&self, state: ConnectionState) -> bool {
        if *self.state.borrow() == state {
            return true;
        }
        self.state.send_replace(state);
        self.events
            .send(TransportEvent::Connection(state))
            .await
            .is_ok()
    }
}

/// A live channel bound to one conversation.
///
/// The handle is the subscription: inbound events arrive through `next_event()`
/// on a bounded queue, and `close()` (or dropping the handle) closes that queue
/// and stops the adapter task.
pub struct TransportHandle {
    conversation_id: String,
    outbound: Option<mpsc::Sender<OutboundMessage>>,
    events: mpsc::Receiver<TransportEvent>,
    state: watch::Receiver<ConnectionState>,
    task: Option<JoinHandle<()>>,
    drained: bool,
}

impl TransportHandle {
    /// Creates a handle plus the adapter-side channel ends. `capacity` bounds both queues.
    pub fn channel(conversation_id: impl Into<String>, capacity: usize) -> (Self, AdapterChannels) {
        let capacity = capacity.max(1);
        let (outbound_tx, outbound_rx) = mpsc::channel(capacity);
        let (events_tx, events_rx) = mpsc::channel(capacity);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let handle = Self {
            conversation_id: conversation_id.into(),
            outbound: Some(outbound_tx),
            events: events_rx,
            state: state_rx,
            task: None,
            drained: false,
        };
        let adapter = AdapterChannels {
            outbound: outbound_rx,
            events: events_tx,
            state: state_tx,
        };
        (handle, adapter)
    }

    /// Attaches the adapter task so `close()` can stop it.
    pub fn with_task(mut self, task: JoinHandle<()>) -> Self {
        self.task = Some(task);
        self
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Fire-and-forget send. Returns false (and does nothing) unless connected.
    pub fn send(&self, content: impl Into<String>) -> bool {
        if !self.is_connected() {
            return false;
        }
        let Some(outbound) = self.outbound.as_ref() else {
            return false;
        };
        match outbound.try_send(OutboundMessage {
            content: content.into(),
        }) {
            Ok(()) => true,
            Err(e) => {
                debug!("Outbound send to {} dropped: {}", self.conversation_id, e);
                false
            }
        }
    }

    /// Next inbound event, or `None` once the adapter has stopped and the queue is empty.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        if self.drained {
            return None;
        }
        let event = self.events.recv().await;
        if event.is_none() {
            self.drained = true;
        }
        event
    }

    /// True once `next_event()` has returned `None`.
    pub fn is_drained(&self) -> bool {
        self.drained
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    /// Closes the channel: no more sends, no more deliveries, adapter task stopped.
    pub fn close(&mut self) {
        if self.outbound.take().is_some() {
            debug!("Closing channel for {}", self.conversation_id);
        }
        self.events.close();
        self.drained = true;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for TransportHandle {
    fn drop(&mut self) {
        self.close();
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Returns the name of the transport.
    fn name(&self) -> &str;

    /// Opens a channel for `conversation_id` acting as `actor`.
    ///
    /// Returns immediately with the handle in `Connecting`; connectivity changes
    /// arrive later as `TransportEvent::Connection`.
    async fn connect(
        &self,
        conversation_id: &str,
        actor: &Actor,
    ) -> Result<TransportHandle, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::message;

    #[tokio::test]
    async fn test_send_is_noop_until_connected() {
        let (handle, mut adapter) = TransportHandle::channel("c1", 4);
        assert_eq!(handle.connection_state(), ConnectionState::Connecting);
        assert!(!handle.send("too early"));
        assert!(adapter.outbound.try_recv().is_err());

        assert!(adapter.report(ConnectionState::Connected).await);
        assert!(handle.send("hello"));
        assert_eq!(adapter.outbound.recv().await.unwrap().content, "hello");
    }

    #[tokio::test]
    async fn test_report_queues_state_changes_once() {
        let (mut handle, adapter) = TransportHandle::channel("c1", 4);
        adapter.report(ConnectionState::Connected).await;
        adapter.report(ConnectionState::Connected).await;
        adapter.report(ConnectionState::Disconnected).await;
        drop(adapter);

        let mut events = Vec::new();
        while let Some(event) = handle.next_event().await {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                TransportEvent::Connection(ConnectionState::Connected),
                TransportEvent::Connection(ConnectionState::Disconnected),
            ]
        );
        assert!(handle.is_drained());
        assert!(!handle.is_connected());
    }

    #[tokio::test]
    async fn test_close_stops_delivery() {
        let (mut handle, adapter) = TransportHandle::channel("c1", 4);
        adapter.report(ConnectionState::Connected).await;
        handle.close();
        assert!(!handle.send("after close"));
        assert!(
            adapter
                .events
                .send(TransportEvent::Message(message("m1", "u2", "late")))
                .await
                .is_err()
        );
        assert_eq!(handle.next_event().await, None);
    }

    #[tokio::test]
    async fn test_close_aborts_adapter_task() {
        let (handle, _adapter) = TransportHandle::channel("c1", 4);
        let (alive_tx, alive_rx) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let _alive = alive_tx;
            std::future::pending::<()>().await;
        });
        let mut handle = handle.with_task(task);
        handle.close();
        // the sender is dropped only when the aborted task is torn down
        assert!(alive_rx.await.is_err());
    }
}
