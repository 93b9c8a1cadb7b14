//! Core traits for generic WebSocket infrastructure.

use serde::de::DeserializeOwned;

/// Message parser trait for converting raw frames to messages.
///
/// This is the seam between the transport-facing connection manager and the
/// wire format a concrete service speaks. A parser may filter frames that
/// consumers should never see (heartbeat acknowledgements, for example) by
/// returning an empty vec.
///
/// # Example
///
/// ```ignore
/// pub struct SimpleParser;
///
/// impl MessageParser<MyMessage> for SimpleParser {
///     fn parse(&self, bytes: &[u8]) -> crate::Result<Vec<MyMessage>> {
///         let msg: MyMessage = serde_json::from_slice(bytes)?;
///         Ok(vec![msg])
///     }
/// }
/// ```
pub trait MessageParser<M: DeserializeOwned>: Send + Sync + 'static {
    /// Parse an inbound frame into zero or more messages.
    ///
    /// Returning `Err` means the frame was malformed; the connection manager
    /// logs and drops it without affecting the connection.
    fn parse(&self, bytes: &[u8]) -> crate::Result<Vec<M>>;
}
