#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Do not need additional syntax for setting up tests"
)]
#![allow(
    unused,
    reason = "Not every test binary exercises every helper on the mock server"
)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt as _, StreamExt as _};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

/// Mock chat WebSocket server.
///
/// Accepts any number of sequential client connections, fans outbound
/// messages to all of them, funnels every text frame a client sends into a
/// single channel, and can forcibly drop all live connections to simulate a
/// network failure.
pub struct MockWsServer {
    addr: SocketAddr,
    /// Broadcast messages to ALL connected clients
    message_tx: broadcast::Sender<String>,
    /// Tells live connection tasks to drop their socket
    drop_tx: broadcast::Sender<()>,
    /// Receives text frames from clients
    frame_rx: mpsc::UnboundedReceiver<String>,
    /// Number of accepted WebSocket connections so far
    accepted: Arc<AtomicUsize>,
}

impl MockWsServer {
    /// Start a mock server on a random port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        Self::serve(listener)
    }

    /// Start a mock server on a specific address.
    pub async fn start_on(addr: SocketAddr) -> Self {
        let listener = TcpListener::bind(addr).await.unwrap();
        Self::serve(listener)
    }

    fn serve(listener: TcpListener) -> Self {
        let addr = listener.local_addr().unwrap();

        let (message_tx, _) = broadcast::channel::<String>(100);
        let (drop_tx, _) = broadcast::channel::<()>(4);
        let (frame_tx, frame_rx) = mpsc::unbounded_channel::<String>();
        let accepted = Arc::new(AtomicUsize::new(0));

        let broadcast_tx = message_tx.clone();
        let drop_signal = drop_tx.clone();
        let accepted_counter = Arc::clone(&accepted);

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };

                let Ok(ws_stream) = tokio_tungstenite::accept_async(stream).await else {
                    continue;
                };
                accepted_counter.fetch_add(1, Ordering::SeqCst);

                let (mut write, mut read) = ws_stream.split();
                let frames = frame_tx.clone();
                let mut msg_rx = broadcast_tx.subscribe();
                let mut drop_rx = drop_signal.subscribe();

                // Spawn a task to handle this connection
                tokio::spawn(async move {
                    loop {
                        tokio::select! {
                            // Simulated network failure: drop the socket
                            _ = drop_rx.recv() => break,

                            // Handle incoming frames from the client
                            msg = read.next() => {
                                match msg {
                                    Some(Ok(Message::Text(text))) => {
                                        drop(frames.send(text.to_string()));
                                    }
                                    Some(Ok(_)) => {}
                                    _ => break,
                                }
                            }

                            // Handle outgoing messages to the client
                            msg = msg_rx.recv() => {
                                match msg {
                                    Ok(text) => {
                                        if write.send(Message::Text(text.into())).await.is_err() {
                                            break;
                                        }
                                    }
                                    Err(_) => break,
                                }
                            }
                        }
                    }
                });
            }
        });

        Self {
            addr,
            message_tx,
            drop_tx,
            frame_rx,
            accepted,
        }
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Send a message to all connected clients.
    pub fn send(&self, message: &str) {
        drop(self.message_tx.send(message.to_owned()));
    }

    /// Drop every live connection, simulating a network failure.
    pub fn drop_connections(&self) {
        drop(self.drop_tx.send(()));
    }

    /// Number of WebSocket connections accepted so far.
    pub fn accepted_connections(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Receive the next text frame a client sent, as parsed JSON.
    pub async fn recv_frame(&mut self) -> Option<serde_json::Value> {
        let text = timeout(Duration::from_secs(2), self.frame_rx.recv())
            .await
            .ok()
            .flatten()?;
        serde_json::from_str(&text).ok()
    }

    /// Receive frames until one matches the given `type` tag.
    pub async fn recv_frame_of_type(&mut self, frame_type: &str) -> Option<serde_json::Value> {
        loop {
            let frame = self.recv_frame().await?;
            if frame["type"] == frame_type {
                return Some(frame);
            }
        }
    }

    /// True if no frame arrives within the given window.
    pub async fn quiet_for(&mut self, window: Duration) -> bool {
        timeout(window, self.frame_rx.recv()).await.is_err()
    }
}

/// Bind and immediately release a local port, yielding an address that will
/// refuse connections until something else binds it.
pub async fn unbound_local_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
