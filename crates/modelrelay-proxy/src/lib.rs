//! HTTP adapter for modelrelay.
//!
//! Accepts chat-completion requests on `/v1/chat/completions`, forwards them
//! to a single OpenAI-compatible upstream and falls back through an ordered
//! list of models when an attempt fails. Streaming responses are relayed as
//! they arrive; everything else is buffered and replayed.
//!
//! The decisions (planning, timeouts, status classification) live in
//! `modelrelay-core`; this crate does the I/O.

#![deny(unsafe_code)]

pub mod dispatch;
pub mod emit;
pub mod error;
pub mod headers;
pub mod inbound;
pub mod retry;
pub mod server;
pub mod state;
pub mod target;
pub mod transport;

pub use error::{AttemptError, Cancelled, RelayError};
pub use inbound::InboundRequest;
pub use retry::relay;
pub use server::{CHAT_COMPLETIONS_PATH, router, serve};
pub use state::RelayState;
pub use transport::TransportTemplate;
