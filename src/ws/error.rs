#![expect(
    clippy::module_name_repetitions,
    reason = "Error types include the module name to indicate their scope"
)]

use std::error::Error as StdError;
use std::fmt;

/// WebSocket error variants.
#[non_exhaustive]
#[derive(Debug)]
pub enum WsError {
    /// Error connecting to or communicating with the chat endpoint
    Connection(tokio_tungstenite::tungstenite::Error),
    /// Error parsing an inbound frame
    MessageParse(serde_json::Error),
    /// The connection was closed by the remote endpoint
    ConnectionClosed,
    /// The connection attempt did not reach open within the connect timeout
    ConnectTimeout,
    /// Every reconnection attempt was used up; the session is terminally failed
    RetriesExhausted {
        /// Number of consecutive failed attempts
        attempts: u32,
    },
    /// Message stream lagged and missed inbound messages
    Lagged {
        /// Number of messages that were missed
        count: u64,
    },
}

impl fmt::Display for WsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(e) => write!(f, "WebSocket connection error: {e}"),
            Self::MessageParse(e) => write!(f, "Failed to parse inbound frame: {e}"),
            Self::ConnectionClosed => write!(f, "WebSocket connection closed"),
            Self::ConnectTimeout => write!(f, "WebSocket connection attempt timed out"),
            Self::RetriesExhausted { attempts } => {
                write!(f, "Gave up reconnecting after {attempts} failed attempts")
            }
            Self::Lagged { count } => write!(f, "Message stream lagged, missed {count} messages"),
        }
    }
}

impl StdError for WsError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Connection(e) => Some(e),
            Self::MessageParse(e) => Some(e),
            _ => None,
        }
    }
}

// Integration with main Error type
impl From<WsError> for crate::error::Error {
    fn from(e: WsError) -> Self {
        crate::error::Error::with_source(crate::error::Kind::WebSocket, e)
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for crate::error::Error {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        crate::error::Error::with_source(crate::error::Kind::WebSocket, WsError::Connection(e))
    }
}
