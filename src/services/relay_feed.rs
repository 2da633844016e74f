//! EMDR relay subscriber
//!
//! Connects to every configured relay over WebSocket and forwards each
//! payload frame into the ingestion channel. Relays are independent; one
//! going away only affects its own connection, which is retried forever.

use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Why a connection loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionEnd {
    /// Relay closed or errored, try again
    Reconnect,
    /// Consumer is gone, stop for good
    ConsumerClosed,
}

pub struct RelaySubscriber {
    relays: Vec<String>,
    sink: mpsc::Sender<Vec<u8>>,
}

impl RelaySubscriber {
    pub fn new(relays: Vec<String>, sink: mpsc::Sender<Vec<u8>>) -> Self {
        Self { relays, sink }
    }

    /// Spawn one connection task per relay
    pub fn start(self) -> Vec<JoinHandle<()>> {
        if self.relays.is_empty() {
            warn!("No relays to subscribe to");
            return Vec::new();
        }

        info!(relays = self.relays.len(), "Starting relay subscriber");

        self.relays
            .into_iter()
            .enumerate()
            .map(|(conn_id, relay)| {
                let sink = self.sink.clone();
                tokio::spawn(async move {
                    run_connection(conn_id, relay, sink).await;
                })
            })
            .collect()
    }
}

/// Run a single relay connection with auto-reconnect
async fn run_connection(conn_id: usize, relay: String, sink: mpsc::Sender<Vec<u8>>) {
    loop {
        info!(conn_id, relay = %relay, "Connecting to relay");

        match connect_and_forward(conn_id, &relay, &sink).await {
            Ok(ConnectionEnd::ConsumerClosed) => {
                info!(conn_id, "Ingestion channel closed, stopping relay connection");
                return;
            }
            Ok(ConnectionEnd::Reconnect) => {
                info!(conn_id, "Relay connection closed");
            }
            Err(e) => {
                error!(conn_id, relay = %relay, error = %e, "Relay connection error");
            }
        }

        if sink.is_closed() {
            return;
        }

        info!(conn_id, delay = ?RECONNECT_DELAY, "Reconnecting to relay");
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

async fn connect_and_forward(
    conn_id: usize,
    relay: &str,
    sink: &mpsc::Sender<Vec<u8>>,
) -> Result<ConnectionEnd, Box<dyn std::error::Error + Send + Sync>> {
    let (ws_stream, _) = connect_async(relay).await?;
    let (mut write, mut read) = ws_stream.split();

    info!(conn_id, relay = %relay, "Connected to relay");

    loop {
        tokio::select! {
            msg = read.next() => {
                let payload = match msg {
                    Some(Ok(Message::Binary(data))) => data,
                    Some(Ok(Message::Text(text))) => text.into_bytes(),
                    Some(Ok(Message::Ping(data))) => {
                        write.send(Message::Pong(data)).await?;
                        continue;
                    }
                    Some(Ok(Message::Close(_))) => {
                        debug!(conn_id, "Received close frame");
                        return Ok(ConnectionEnd::Reconnect);
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(e.into()),
                    None => {
                        debug!(conn_id, "Relay stream ended");
                        return Ok(ConnectionEnd::Reconnect);
                    }
                };

                if sink.send(payload).await.is_err() {
                    return Ok(ConnectionEnd::ConsumerClosed);
                }
            }

            _ = sink.closed() => {
                return Ok(ConnectionEnd::ConsumerClosed);
            }
        }
    }
}
