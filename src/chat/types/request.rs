use serde::Serialize;

use crate::TimestampMs;

/// Outbound wire frames, tagged by `type`.
///
/// The other outbound frame, the heartbeat ping, is owned by the connection
/// manager itself (`ws::connection`), since it is part of the manager's
/// liveness contract rather than something the widget sends.
///
/// Serialized shape:
///
/// ```json
/// {"type":"message","content":"...","timestamp":1735689600000}
/// ```
#[non_exhaustive]
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientFrame {
    /// A user chat message
    Message {
        /// Message text as typed by the visitor
        content: String,
        /// Client-side send time in epoch milliseconds
        timestamp: TimestampMs,
    },
}

impl ClientFrame {
    /// Build a user message frame stamped with the current time.
    #[must_use]
    pub fn message<S: Into<String>>(content: S) -> Self {
        Self::Message {
            content: content.into(),
            timestamp: crate::now_ms(),
        }
    }
}
