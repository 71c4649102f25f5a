//! # Core Chat Logic
//!
//! State and rules for one open conversation. Nothing in here touches HTTP,
//! sockets, or the terminal; the session runtime feeds it actions and carries
//! out the effects it returns.
//!
//! ```text
//!   Action ──▶ update(&mut ChatState) ──▶ Effect
//!                   │
//!                   ├── MessageStore     ordered, de-duplicated history + live
//!                   ├── SearchIndex      positions into the store, kept current
//!                   ├── TypingDebouncer  composing flag, one deadline
//!                   └── ConnectionState  mirror of the adapter
//! ```
//!
//! ## Modules
//!
//! - [`types`]: messages, conversations, participants, connection state
//! - [`store`]: the ordered, de-duplicated message sequence
//! - [`typing`]: the composing debouncer
//! - [`search`]: in-session search with wraparound navigation
//! - [`state`]: `ChatState`, everything one open conversation owns
//! - [`action`]: the `Action` enum and the `update()` reducer
//! - [`config`]: settings resolution

pub mod action;
pub mod config;
pub mod search;
pub mod state;
pub mod store;
pub mod types;
pub mod typing;
