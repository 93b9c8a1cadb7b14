//! Minimal chat session walkthrough.
//!
//! Connects to a chat endpoint, watches the connection status, sends one
//! message once the connection opens, and prints replies for a short while.
//!
//! Run against a local endpoint with tracing enabled:
//! ```sh
//! RUST_LOG=debug CHATLINK_ENDPOINT=ws://localhost:8080/ws cargo run --example chat
//! ```

use std::time::Duration;

use chatlink_client_sdk::chat::{Client, DEFAULT_ENDPOINT};
use chatlink_client_sdk::ws::config::Config;
use futures::StreamExt as _;
use tokio::time::timeout;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let endpoint =
        std::env::var("CHATLINK_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_owned());

    let client = Client::connect(&endpoint, Config::default())?;
    info!(endpoint = %client.endpoint(), session_id = %client.session_id(), "connecting");

    // Watch the status the way the widget UI does.
    let mut state_rx = client.state_receiver();
    let status_watcher = tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let state = *state_rx.borrow_and_update();
            info!(status = state.as_str(), "status change");
        }
    });

    // Wait for the connection to open, then send a message.
    let mut open_rx = client.state_receiver();
    match timeout(Duration::from_secs(10), open_rx.wait_for(|s| s.is_open())).await {
        Ok(Ok(_)) => {
            let sent = client.send("Hi! What does an automation assessment involve?");
            info!(sent, "message submitted");
        }
        _ => warn!("connection did not open within 10s; message not sent"),
    }

    // Print replies for a little while.
    let mut stream = Box::pin(client.messages());
    while let Ok(Some(event)) = timeout(Duration::from_secs(15), stream.next()).await {
        match event {
            Ok(event) => info!(
                content = event.content.as_deref().unwrap_or("<no content>"),
                is_bot = ?event.is_bot,
                "reply"
            ),
            Err(e) => warn!(error = %e, "stream error"),
        }
    }

    client.close();
    status_watcher.abort();
    Ok(())
}
