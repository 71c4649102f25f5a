//! # Real-time Transport
//!
//! One channel per open conversation. The session loop only ever sees a
//! [`TransportHandle`]: a bounded inbound event queue, a connection state it can
//! read, and a fire-and-forget `send`.
//!
//! ```text
//!   Transport::connect(conversation, actor)
//!            │
//!            ▼
//!   ┌──────────────────┐  TransportEvent (bounded)   ┌──────────────────┐
//!   │  adapter task    │ ──────────────────────────▶ │ TransportHandle  │
//!   │ (ws / loopback)  │ ◀────────────────────────── │  (session side)  │
//!   └──────────────────┘     OutboundMessage         └──────────────────┘
//!            │                                              ▲
//!            └──────── watch<ConnectionState> ──────────────┘
//! ```

pub mod adapter;
pub mod providers;
pub mod reconnect;

pub use adapter::{
    AdapterChannels, OutboundMessage, Transport, TransportError, TransportEvent, TransportHandle,
};
pub use providers::{LoopbackRemote, LoopbackTransport, WebSocketTransport};
pub use reconnect::ReconnectPolicy;
