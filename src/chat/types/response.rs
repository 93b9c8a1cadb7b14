use serde::Deserialize;
use serde_json::{Map, Value};

use crate::Result;
use crate::ws::WsError;

/// An inbound frame from the chat endpoint.
///
/// The server may send any JSON object; the fields the widget cares about
/// are pulled out, everything else is preserved in `extra`.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize)]
pub struct ChatEvent {
    /// Frame type tag, when present (`pong`, `message`, ...)
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,
    /// Message text for chat replies
    #[serde(default)]
    pub content: Option<String>,
    /// Whether the reply came from the bot rather than a human agent
    #[serde(rename = "isBot", default)]
    pub is_bot: Option<bool>,
    /// Remaining fields of the frame
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatEvent {
    /// Whether this frame acknowledges a heartbeat ping.
    #[must_use]
    pub fn is_heartbeat_ack(&self) -> bool {
        self.event_type.as_deref() == Some("pong")
    }
}

/// Parse one inbound frame.
///
/// Heartbeat acknowledgements are logged and filtered out; they never reach
/// the widget. Anything that is not a JSON object fails with
/// [`WsError::MessageParse`], which the connection manager logs and drops
/// without touching the connection state.
pub(crate) fn parse_events(bytes: &[u8]) -> Result<Vec<ChatEvent>> {
    let event: ChatEvent = serde_json::from_slice(bytes).map_err(WsError::MessageParse)?;

    if event.is_heartbeat_ack() {
        tracing::debug!("heartbeat acknowledged");
        return Ok(Vec::new());
    }

    Ok(vec![event])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_reply_parses_recognized_fields() {
        let frame = br#"{"type":"message","content":"How can I help?","isBot":true,"agentId":7}"#;

        let events = parse_events(frame).unwrap();
        assert_eq!(events.len(), 1);

        let event = &events[0];
        assert_eq!(event.event_type.as_deref(), Some("message"));
        assert_eq!(event.content.as_deref(), Some("How can I help?"));
        assert_eq!(event.is_bot, Some(true));
        assert_eq!(event.extra["agentId"], 7);
    }

    #[test]
    fn pong_is_filtered_out() {
        let frame = br#"{"type":"pong","timestamp":1735689600000}"#;

        let events = parse_events(frame).unwrap();
        assert!(events.is_empty(), "heartbeat acks must not reach consumers");
    }

    #[test]
    fn object_without_type_tag_is_forwarded() {
        let frame = br#"{"unread":3}"#;

        let events = parse_events(frame).unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].event_type.is_none());
        assert_eq!(events[0].extra["unread"], 3);
    }

    #[test]
    fn non_json_frame_is_a_parse_error() {
        let result = parse_events(b"not json");
        assert!(result.is_err(), "free text is not a valid frame");
    }
}
