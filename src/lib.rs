//! Client SDK for the ChatLink embedded chat widget.
//!
//! The crate maintains a single logical chat session against a remote
//! WebSocket endpoint: it establishes the connection, detects failures,
//! reconnects with capped exponential backoff up to a hard attempt ceiling,
//! and sends periodic heartbeats while connected. Consumers observe the
//! connection status and receive inbound messages without ever touching the
//! transport directly.
//!
//! # Layers
//!
//! - [`ws`]: the generic connection manager (state machine, backoff,
//!   heartbeat). Message parsing is pluggable via [`ws::MessageParser`].
//! - [`chat`]: the widget-facing facade wired to the chat wire format
//!   (`message`/`ping`/`pong` JSON frames).
//!
//! # Example
//!
//! ```rust, no_run
//! use chatlink_client_sdk::chat::Client;
//! use futures::StreamExt as _;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = Client::default();
//!
//!     let stream = client.messages();
//!     let mut stream = Box::pin(stream);
//!
//!     client.send("Hi, I'd like to talk about invoice automation.");
//!
//!     while let Some(event) = stream.next().await {
//!         println!("reply: {:?}", event?);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod error;
pub mod ws;

use crate::error::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Timestamp in milliseconds since [`std::time::UNIX_EPOCH`], the unit used
/// by every wire frame.
pub(crate) type TimestampMs = i64;

pub(crate) fn now_ms() -> TimestampMs {
    chrono::Utc::now().timestamp_millis()
}
