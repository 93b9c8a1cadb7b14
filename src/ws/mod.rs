//! Core WebSocket infrastructure.
//!
//! This module provides the generic connection manager: a single-transport
//! state machine with capped exponential reconnection, a connect timeout per
//! attempt, and a heartbeat while open. The wire format a concrete service
//! speaks is plugged in via [`MessageParser`].
//!
//! # Architecture
//!
//! - [`ConnectionManager`]: WebSocket connection handler with heartbeat and reconnection
//! - [`MessageParser`]: Trait for parsing incoming WebSocket messages
//!
//! # Example
//!
//! ```ignore
//! // Define your message type
//! #[derive(Clone, Debug, Deserialize)]
//! struct MyMessage { /* ... */ }
//!
//! let connection = ConnectionManager::new(endpoint, config, SimpleParser);
//! connection.start();
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod traits;

pub use connection::{ConnectionManager, ConnectionState};
pub use error::WsError;
pub use traits::MessageParser;
