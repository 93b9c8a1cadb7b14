//! Widget-facing chat client.
//!
//! This module binds the generic [`crate::ws`] connection manager to the
//! chat wire format: outbound `message` frames, heartbeat `ping` frames
//! tagged with the session id, and inbound JSON objects of which `pong`
//! acknowledgements are filtered before they reach the widget.
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
//!     let mut stream = Box::pin(client.messages());
//!
//!     client.send("hello");
//!     while let Some(event) = stream.next().await {
//!         println!("{:?}", event?);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod types;

pub use client::{ChatParser, Client, DEFAULT_ENDPOINT};
pub use types::{ChatEvent, ClientFrame};
