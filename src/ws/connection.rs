#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

use std::fmt::Debug;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use backoff::backoff::Backoff as _;
use futures::{SinkExt as _, StreamExt as _};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{interval, sleep, timeout};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::config::Config;
use super::error::WsError;
use super::traits::MessageParser;
use crate::Result;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Broadcast channel capacity for incoming messages.
const BROADCAST_CAPACITY: usize = 1024;

/// Broadcast channel capacity for status transition events.
const STATUS_CAPACITY: usize = 64;

/// Connection state tracking.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,
    /// Attempting to connect
    Connecting,
    /// Successfully connected
    Open {
        /// When the connection was established
        since: Instant,
    },
    /// Waiting out the backoff delay before the next attempt
    Reconnecting {
        /// Number of consecutive failed attempts so far
        attempt: u32,
    },
    /// Every reconnection attempt was used up; terminal until the manager is
    /// recreated
    Failed,
}

impl ConnectionState {
    /// Check if the connection is currently open.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open { .. })
    }

    /// Status label for UI bindings ("Reconnecting…" badges and the like).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open { .. } => "open",
            Self::Reconnecting { .. } => "reconnecting",
            Self::Failed => "failed",
        }
    }
}

/// Publishes state transitions to both the current-state watch channel and
/// the ordered event broadcast.
///
/// A watch channel alone coalesces transitions under a slow reader, so the
/// event broadcast is what subscribers use when they need every transition
/// in order. After cancellation only the final `Disconnected` transition may
/// be published; a late wakeup of the connection loop cannot resurrect the
/// session.
#[derive(Clone)]
struct StatusPublisher {
    state_tx: watch::Sender<ConnectionState>,
    events_tx: broadcast::Sender<ConnectionState>,
    cancel: CancellationToken,
}

impl StatusPublisher {
    fn publish(&self, next: ConnectionState) {
        if self.cancel.is_cancelled() && next != ConnectionState::Disconnected {
            return;
        }
        let changed = self.state_tx.send_if_modified(|state| {
            if *state == next {
                false
            } else {
                *state = next;
                true
            }
        });
        if changed {
            _ = self.events_tx.send(next);
        }
    }
}

/// Everything the connection loop takes ownership of when it starts.
struct LoopContext<P> {
    endpoint: String,
    config: Config,
    parser: P,
    sender_rx: mpsc::UnboundedReceiver<String>,
}

/// Manages the chat WebSocket connection lifecycle, reconnection, and
/// heartbeat.
///
/// One manager owns one logical session: a session id is generated at
/// construction and stays stable across every reconnect attempt, so the
/// server can correlate heartbeats and diagnostics across drops. The manager
/// owns the only transport handle; at most one connection attempt is in
/// flight at a time.
///
/// Lifecycle: [`start`](Self::start) spawns the connection loop (idempotent,
/// effective once per manager). Failures are recovered with exponential
/// backoff up to `max_attempts`, after which the state becomes
/// [`ConnectionState::Failed`] and stays there; recovering from a failed
/// session means constructing a new manager. [`stop`](Self::stop) tears
/// everything down and is safe from any state.
///
/// # Type Parameters
///
/// - `M`: Message type that implements [`DeserializeOwned`] among other "helper" types
/// - `P`: Parser type that implements [`MessageParser<M>`]
///
/// # Example
///
/// ```ignore
/// let connection = ConnectionManager::new("wss://chat.example.com/ws".to_owned(), config, parser);
/// connection.start();
///
/// let mut rx = connection.subscribe();
/// while let Ok(msg) = rx.recv().await {
///     println!("Received: {:?}", msg);
/// }
/// ```
pub struct ConnectionManager<M, P>
where
    M: DeserializeOwned + Debug + Clone + Send + 'static,
    P: MessageParser<M>,
{
    /// Stable identity of this chat session across reconnects
    session_id: Uuid,
    /// Watch channel receiver for the current state
    state_rx: watch::Receiver<ConnectionState>,
    /// Publisher for state transitions
    status: StatusPublisher,
    /// Sender channel for outgoing frames
    sender_tx: mpsc::UnboundedSender<String>,
    /// Broadcast sender for incoming messages
    broadcast_tx: broadcast::Sender<M>,
    /// Cancellation token shared with the connection loop
    cancel: CancellationToken,
    /// Loop inputs, consumed by the first effective `start()`
    loop_ctx: Arc<Mutex<Option<LoopContext<P>>>>,
}

impl<M, P> Clone for ConnectionManager<M, P>
where
    M: DeserializeOwned + Debug + Clone + Send + 'static,
    P: MessageParser<M>,
{
    fn clone(&self) -> Self {
        Self {
            session_id: self.session_id,
            state_rx: self.state_rx.clone(),
            status: self.status.clone(),
            sender_tx: self.sender_tx.clone(),
            broadcast_tx: self.broadcast_tx.clone(),
            cancel: self.cancel.clone(),
            loop_ctx: Arc::clone(&self.loop_ctx),
        }
    }
}

impl<M, P> ConnectionManager<M, P>
where
    M: DeserializeOwned + Debug + Clone + Send + 'static,
    P: MessageParser<M>,
{
    /// Create a new connection manager.
    ///
    /// No I/O happens here; the session id is generated and the channels are
    /// wired up. Call [`start`](Self::start) to begin connecting.
    #[must_use]
    pub fn new(endpoint: String, config: Config, parser: P) -> Self {
        let (sender_tx, sender_rx) = mpsc::unbounded_channel();
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (events_tx, _) = broadcast::channel(STATUS_CAPACITY);
        let cancel = CancellationToken::new();

        Self {
            session_id: Uuid::new_v4(),
            state_rx,
            status: StatusPublisher {
                state_tx,
                events_tx,
                cancel: cancel.clone(),
            },
            sender_tx,
            broadcast_tx,
            cancel,
            loop_ctx: Arc::new(Mutex::new(Some(LoopContext {
                endpoint,
                config,
                parser,
                sender_rx,
            }))),
        }
    }

    /// Start the connection loop.
    ///
    /// Idempotent: only the first call spawns anything; while the loop is
    /// already connecting or connected, further calls are no-ops and produce
    /// no duplicate transport handle or status notification. Once the loop
    /// has terminated (explicit [`stop`](Self::stop) or a terminal
    /// [`ConnectionState::Failed`]), `start` stays a no-op; recovery requires
    /// a fresh manager.
    pub fn start(&self) {
        let ctx = self
            .loop_ctx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(ctx) = ctx else {
            tracing::debug!(session_id = %self.session_id, "start() called on an already started manager");
            return;
        };
        if self.cancel.is_cancelled() {
            return;
        }

        let session_id = self.session_id;
        let broadcast_tx = self.broadcast_tx.clone();
        let status = self.status.clone();
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            Self::connection_loop(ctx, session_id, broadcast_tx, status, cancel).await;
        });
    }

    /// Main connection loop with automatic reconnection.
    async fn connection_loop(
        ctx: LoopContext<P>,
        session_id: Uuid,
        broadcast_tx: broadcast::Sender<M>,
        status: StatusPublisher,
        cancel: CancellationToken,
    ) {
        let LoopContext {
            endpoint,
            config,
            parser,
            mut sender_rx,
        } = ctx;

        let mut attempt = 0_u32;
        let mut backoff: backoff::ExponentialBackoff = config.reconnect.clone().into();

        loop {
            // Frames submitted while the previous connection was tearing down
            // are dropped, never replayed into a fresh connection.
            while sender_rx.try_recv().is_ok() {}

            status.publish(ConnectionState::Connecting);
            tracing::info!(%session_id, attempt, %endpoint, "connection_attempt");

            let connected = tokio::select! {
                () = cancel.cancelled() => return,
                result = timeout(config.connect_timeout, connect_async(&endpoint)) => result,
            };

            match connected {
                Ok(Ok((ws_stream, _))) => {
                    attempt = 0;
                    backoff.reset();
                    status.publish(ConnectionState::Open {
                        since: Instant::now(),
                    });
                    tracing::info!(%session_id, "connection_open");

                    let result = Self::handle_connection(
                        ws_stream,
                        &mut sender_rx,
                        &broadcast_tx,
                        &parser,
                        session_id,
                        config.heartbeat_interval,
                        &cancel,
                    )
                    .await;

                    if cancel.is_cancelled() {
                        return;
                    }
                    if let Err(e) = result {
                        tracing::warn!(%session_id, error = %e, "connection_lost");
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!(%session_id, attempt, error = %e, "connection_error");
                }
                Err(_elapsed) => {
                    let e = WsError::ConnectTimeout;
                    tracing::warn!(%session_id, attempt, error = %e, "connection_error");
                }
            }

            if cancel.is_cancelled() {
                return;
            }
            status.publish(ConnectionState::Disconnected);

            attempt = attempt.saturating_add(1);
            if let Some(max) = config.reconnect.max_attempts
                && attempt >= max
            {
                status.publish(ConnectionState::Failed);
                let e = WsError::RetriesExhausted { attempts: attempt };
                tracing::error!(%session_id, attempts = attempt, error = %e, "retries_exhausted");
                return;
            }

            status.publish(ConnectionState::Reconnecting { attempt });

            if let Some(delay) = backoff.next_backoff() {
                tracing::debug!(%session_id, attempt, ?delay, "reconnect_scheduled");
                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = sleep(delay) => {}
                }
            }
        }
    }

    /// Handle an active WebSocket connection until it drops or is stopped.
    async fn handle_connection(
        ws_stream: WsStream,
        sender_rx: &mut mpsc::UnboundedReceiver<String>,
        broadcast_tx: &broadcast::Sender<M>,
        parser: &P,
        session_id: Uuid,
        heartbeat_interval: Duration,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let (mut write, mut read) = ws_stream.split();

        // Heartbeat frames travel through their own channel so the single
        // writer half stays owned by this loop.
        let (ping_tx, mut ping_rx) = mpsc::unbounded_channel();
        let heartbeat_handle = tokio::spawn(heartbeat_loop(
            ping_tx,
            session_id,
            heartbeat_interval,
        ));

        let result = loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    _ = write.send(Message::Close(None)).await;
                    break Ok(());
                }

                // Handle incoming frames
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            match parser.parse(text.as_bytes()) {
                                Ok(messages) => {
                                    for message in messages {
                                        tracing::trace!(%session_id, ?message, "inbound message");
                                        _ = broadcast_tx.send(message);
                                    }
                                }
                                Err(e) => {
                                    tracing::warn!(%session_id, frame = %text, error = %e, "dropping malformed inbound frame");
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            break Err(WsError::ConnectionClosed.into());
                        }
                        Some(Err(e)) => {
                            break Err(e.into());
                        }
                        Some(Ok(_)) => {
                            // Ignore binary frames and protocol-level ping/pong.
                        }
                    }
                }

                // Handle outgoing frames from send()
                Some(text) = sender_rx.recv() => {
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        break Err(e.into());
                    }
                }

                // Handle heartbeat pings; a failed write tears the
                // connection down through the normal failure path
                Some(json) = ping_rx.recv() => {
                    if let Err(e) = write.send(Message::Text(json.into())).await {
                        break Err(e.into());
                    }
                }
            }
        };

        heartbeat_handle.abort();
        result
    }

    /// Send a frame to the chat endpoint.
    ///
    /// Returns `true` only if the connection is currently open and the frame
    /// was handed to the transport writer. Returns `false` otherwise; frames
    /// are never buffered for a later connection, so a caller that wants
    /// at-least-once delivery keeps its own copy and retries after observing
    /// [`ConnectionState::Open`].
    pub fn send<R: Serialize>(&self, request: &R) -> bool {
        if !self.state_rx.borrow().is_open() {
            return false;
        }
        let Ok(json) = serde_json::to_string(request) else {
            return false;
        };
        self.sender_tx.send(json).is_ok()
    }

    /// Tear the session down.
    ///
    /// Cancels the connection loop, any pending reconnect timer, and the
    /// heartbeat, closes the transport, and leaves the state at
    /// [`ConnectionState::Disconnected`]. Safe to call repeatedly and from
    /// any state; no reconnection is scheduled afterwards.
    pub fn stop(&self) {
        self.cancel.cancel();
        self.status.publish(ConnectionState::Disconnected);
    }

    /// The stable identity of this session, echoed in every heartbeat.
    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Get the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Subscribe to incoming messages.
    ///
    /// Each call returns a new independent receiver. Multiple subscribers can
    /// receive messages concurrently without blocking each other.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<M> {
        self.broadcast_tx.subscribe()
    }

    /// Subscribe to the current connection state.
    ///
    /// The watch channel always holds the latest state; intermediate
    /// transitions may be coalesced. Use [`status_events`](Self::status_events)
    /// when every transition matters.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Subscribe to status transition events.
    ///
    /// Every transition is delivered, in the order it occurred. This is what
    /// a UI layer uses to drive "Reconnecting…" / "Connection lost" toasts.
    #[must_use]
    pub fn status_events(&self) -> broadcast::Receiver<ConnectionState> {
        self.status.events_tx.subscribe()
    }
}

/// Heartbeat loop that emits a ping frame every interval while the
/// connection is open.
///
/// The frame is tagged with the session id and an epoch-ms timestamp so the
/// server can correlate liveness across reconnects. The task is aborted by
/// `handle_connection` when the connection goes away.
async fn heartbeat_loop(ping_tx: mpsc::UnboundedSender<String>, session_id: Uuid, period: Duration) {
    let mut ticker = interval(period);
    // The first tick of a tokio interval completes immediately; consume it
    // so no ping can precede the Open notification seen by subscribers.
    ticker.tick().await;

    loop {
        ticker.tick().await;

        tracing::trace!(%session_id, "heartbeat ping");
        if ping_tx.send(ping_frame(session_id)).is_err() {
            // Frame loop has terminated
            break;
        }
    }
}

/// Wire shape of the heartbeat ping:
/// `{"type":"ping","timestamp":epoch_ms,"sessionId":"..."}`.
fn ping_frame(session_id: Uuid) -> String {
    serde_json::json!({
        "type": "ping",
        "timestamp": crate::now_ms(),
        "sessionId": session_id,
    })
    .to_string()
}
