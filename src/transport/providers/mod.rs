pub mod loopback;
pub mod websocket;

pub use loopback::{LoopbackRemote, LoopbackTransport};
pub use websocket::WebSocketTransport;
