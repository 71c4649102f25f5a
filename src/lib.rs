//! wellchat library exports for testing

use clap::ValueEnum;

pub mod api;
pub mod console;
pub mod core;
pub mod session;
pub mod transport;

#[cfg(test)]
pub mod test_support;

#[derive(Clone, Debug, Default, ValueEnum)]
pub enum TransportKind {
    #[default]
    #[value(name = "websocket")]
    WebSocket,
    /// Echoes sends locally. Transcripts still come from the API.
    Loopback,
}
