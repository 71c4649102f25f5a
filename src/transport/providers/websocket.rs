//! WebSocket channel for one conversation.
//!
//! The socket URL carries the conversation and actor as query parameters:
//! `ws://host/ws?conversationId=c1&userId=me`. Frames are JSON:
//!
//! - outbound: `{"type":"message","conversationId":"c1","content":"..."}`
//! - inbound: a message object, bare or wrapped as `{"type":"message","message":{...}}`.
//!   Frames that are neither are ignored.
//!
//! A lost connection is retried following the [`ReconnectPolicy`]. When the
//! retries run out the adapter stays `Disconnected` and stops.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::core::config::DEFAULT_EVENT_BUFFER;
use crate::core::types::{Actor, ConnectionState, Message};
use crate::transport::{
    AdapterChannels, OutboundMessage, ReconnectPolicy, Transport, TransportError, TransportEvent,
    TransportHandle,
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// Wire Frames
// ============================================================================

#[derive(Serialize, Debug)]
#[serde(tag = "type", rename = "message")]
struct OutboundFrame<'a> {
    #[serde(rename = "conversationId")]
    conversation_id: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum InboundFrame {
    Envelope { message: Message },
    Bare(Message),
}

fn encode_outbound(conversation_id: &str, outbound: &OutboundMessage) -> Option<String> {
    serde_json::to_string(&OutboundFrame {
        conversation_id,
        content: &outbound.content,
    })
    .ok()
}

fn decode_inbound(text: &str) -> Option<Message> {
    match serde_json::from_str::<InboundFrame>(text).ok()? {
        InboundFrame::Envelope { message } | InboundFrame::Bare(message) => Some(message),
    }
}

// ============================================================================
// Transport
// ============================================================================

pub struct WebSocketTransport {
    url: String,
    token: Option<String>,
    policy: ReconnectPolicy,
    capacity: usize,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            url: url.into(),
            token,
            policy: ReconnectPolicy::default(),
            capacity: DEFAULT_EVENT_BUFFER,
        }
    }

    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Capacity of the inbound and outbound queues.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    fn channel_url(&self, conversation_id: &str, actor: &Actor) -> Result<Url, TransportError> {
        let mut url = Url::parse(&self.url)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {e}", self.url)))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(TransportError::InvalidUrl(format!(
                "{}: expected ws:// or wss://",
                self.url
            )));
        }
        url.query_pairs_mut()
            .append_pair("conversationId", conversation_id)
            .append_pair("userId", &actor.id);
        Ok(url)
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    fn name(&self) -> &str {
        "websocket"
    }

    async fn connect(
        &self,
        conversation_id: &str,
        actor: &Actor,
    ) -> Result<TransportHandle, TransportError> {
        let url = self.channel_url(conversation_id, actor)?;
        info!("Opening channel for {} at {}", conversation_id, self.url);
        let (handle, adapter) = TransportHandle::channel(conversation_id, self.capacity);
        let channel = Channel {
            url,
            token: self.token.clone(),
            policy: self.policy.clone(),
            conversation_id: conversation_id.to_string(),
        };
        let task = tokio::spawn(channel.run(adapter));
        Ok(handle.with_task(task))
    }
}

// ============================================================================
// Channel Task
// ============================================================================

struct Channel {
    url: Url,
    token: Option<String>,
    policy: ReconnectPolicy,
    conversation_id: String,
}

/// Why a connected socket stopped pumping.
enum PumpExit {
    /// The handle was closed or dropped.
    SessionClosed,
    ConnectionLost,
}

impl Channel {
    async fn run(self, mut adapter: AdapterChannels) {
        let mut attempt = 0u32;
        loop {
            match self.open().await {
                Ok(socket) => {
                    attempt = 0;
                    if !adapter.report(ConnectionState::Connected).await {
                        return;
                    }
                    info!("Channel for {} connected", self.conversation_id);
                    match self.pump(socket, &mut adapter).await {
                        PumpExit::SessionClosed => {
                            debug!("Channel for {} closed by session", self.conversation_id);
                            return;
                        }
                        PumpExit::ConnectionLost => {
                            warn!("Channel for {} lost connection", self.conversation_id);
                        }
                    }
                }
                Err(e) => {
                    warn!("Channel for {} failed to connect: {}", self.conversation_id, e);
                }
            }
            if !adapter.report(ConnectionState::Disconnected).await {
                return;
            }

            attempt += 1;
            let Some(delay) = self.policy.next_delay(attempt) else {
                warn!(
                    "Channel for {} giving up after {} attempts",
                    self.conversation_id,
                    attempt - 1
                );
                return;
            };
            info!(
                "Reconnecting {} in {:?} (attempt {}/{})",
                self.conversation_id, delay, attempt, self.policy.max_retries
            );
            tokio::time::sleep(delay).await;
            if !adapter.report(ConnectionState::Connecting).await {
                return;
            }
        }
    }

    async fn open(&self) -> Result<Socket, String> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| e.to_string())?;
        if let Some(ref token) = self.token {
            let value =
                HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| e.to_string())?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }
        let (socket, response) = connect_async(request).await.map_err(|e| e.to_string())?;
        debug!("Handshake for {}: HTTP {}", self.conversation_id, response.status());
        Ok(socket)
    }

    async fn pump(&self, socket: Socket, adapter: &mut AdapterChannels) -> PumpExit {
        let (mut sink, mut stream) = socket.split();
        loop {
            tokio::select! {
                outbound = adapter.outbound.recv() => {
                    let Some(outbound) = outbound else {
                        let _ = sink.send(WsMessage::Close(None)).await;
                        return PumpExit::SessionClosed;
                    };
                    let Some(frame) = encode_outbound(&self.conversation_id, &outbound) else {
                        warn!("Failed to encode outbound message");
                        continue;
                    };
                    if let Err(e) = sink.send(WsMessage::Text(frame)).await {
                        warn!("Send on {} failed: {}", self.conversation_id, e);
                        return PumpExit::ConnectionLost;
                    }
                }
                inbound = stream.next() => match inbound {
                    Some(Ok(WsMessage::Text(text))) => match decode_inbound(&text) {
                        Some(message) => {
                            if adapter.events.send(TransportEvent::Message(message)).await.is_err() {
                                return PumpExit::SessionClosed;
                            }
                        }
                        None => debug!("Ignoring frame on {}: {}", self.conversation_id, text),
                    },
                    Some(Ok(WsMessage::Close(_))) | None => return PumpExit::ConnectionLost,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("Read on {} failed: {}", self.conversation_id, e);
                        return PumpExit::ConnectionLost;
                    }
                },
            }
        }
    }
}
