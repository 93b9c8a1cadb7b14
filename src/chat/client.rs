use std::sync::Arc;

use async_stream::try_stream;
use futures::Stream;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use url::Url;
use uuid::Uuid;

use super::types::request::ClientFrame;
use super::types::response::{ChatEvent, parse_events};
use crate::Result;
use crate::error::Error;
use crate::ws::config::Config;
use crate::ws::connection::{ConnectionManager, ConnectionState};
use crate::ws::error::WsError;

/// Default chat endpoint, used by [`Client::default`] when the embedding
/// page does not configure one.
pub const DEFAULT_ENDPOINT: &str = "wss://chat.chatlink.io/ws";

/// Parses inbound chat frames and filters heartbeat acknowledgements.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default)]
pub struct ChatParser;

impl crate::ws::traits::MessageParser<ChatEvent> for ChatParser {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<ChatEvent>> {
        parse_events(bytes)
    }
}

/// Widget-facing chat client.
///
/// Thin facade over [`ConnectionManager`] wired to the chat wire format.
/// Cloning the client shares the underlying session; construct a new client
/// to start a fresh session (which also rotates the session id).
///
/// # Examples
///
/// ```rust, no_run
/// use chatlink_client_sdk::chat::Client;
/// use futures::StreamExt as _;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = Client::default();
///
///     let stream = client.messages();
///     let mut stream = Box::pin(stream);
///
///     if !client.send("hello") {
///         // Not connected yet; the widget keeps the draft and retries
///         // after observing an open status.
///     }
///
///     while let Some(event) = stream.next().await {
///         println!("reply: {:?}", event?);
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    /// Endpoint the session targets
    endpoint: String,
    /// Connection manager owning the transport
    connection: ConnectionManager<ChatEvent, ChatParser>,
}

impl Default for Client {
    fn default() -> Self {
        Self::connect(DEFAULT_ENDPOINT, Config::default())
            .expect("chat client with default endpoint should succeed")
    }
}

impl Client {
    /// Create a client and start connecting to the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `endpoint` is not a valid `ws://` or
    /// `wss://` URL. Connectivity problems are not errors here; they surface
    /// through the status subscription as the reconnection policy runs.
    pub fn connect(endpoint: &str, config: Config) -> Result<Self> {
        let url = Url::parse(endpoint)?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::validation(format!(
                "endpoint must use the ws or wss scheme, got {}",
                url.scheme()
            )));
        }

        let connection = ConnectionManager::new(endpoint.to_owned(), config, ChatParser);
        connection.start();

        Ok(Self {
            inner: Arc::new(ClientInner {
                endpoint: endpoint.to_owned(),
                connection,
            }),
        })
    }

    /// Send a chat message.
    ///
    /// Returns `true` only if the connection is open and the frame was handed
    /// to the transport. The SDK never queues undelivered messages; the
    /// widget keeps the user's unsent input for manual retry.
    pub fn send(&self, content: &str) -> bool {
        self.inner.connection.send(&ClientFrame::message(content))
    }

    /// Stream of inbound chat events.
    ///
    /// Each call returns an independent stream. Heartbeat acknowledgements
    /// are already filtered out. If the consumer falls behind far enough to
    /// miss events, the stream yields a [`WsError::Lagged`] error and keeps
    /// going.
    pub fn messages(&self) -> impl Stream<Item = Result<ChatEvent>> + use<> {
        let mut rx = self.inner.connection.subscribe();

        try_stream! {
            loop {
                match rx.recv().await {
                    Ok(event) => yield event,
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!("chat message stream lagged, missed {n} messages");
                        Err(WsError::Lagged { count: n })?;
                    }
                    Err(RecvError::Closed) => {
                        break;
                    }
                }
            }
        }
    }

    /// Get the current connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.inner.connection.state()
    }

    /// Subscribe to connection state changes.
    ///
    /// The UI layer drives its status text ("Reconnecting…", "Connection
    /// lost") from this.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection.state_receiver()
    }

    /// The session id correlating this conversation across reconnects.
    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.inner.connection.session_id()
    }

    /// The endpoint this client targets.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    /// Tear the session down.
    ///
    /// Safe to call repeatedly; the widget calls this on unmount. A closed
    /// client does not reconnect.
    pub fn close(&self) {
        self.inner.connection.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_rejects_non_websocket_scheme() {
        let result = Client::connect("https://chat.chatlink.io/ws", Config::default());

        let error = result.err().unwrap();
        assert_eq!(error.kind(), crate::error::Kind::Validation);
    }

    #[test]
    fn connect_rejects_unparseable_endpoint() {
        let result = Client::connect("not a url", Config::default());
        assert!(result.is_err(), "garbage endpoints must not connect");
    }
}
