//! Connection manager: owns the single WebSocket session to the camera
//! server, pumps inbound frames into the topic store, and supervises
//! unconditional reconnection.

mod backoff;


pub use backoff::{BackoffIter, BackoffSchedule};

use crate::config::CamsyncConfig;
use crate::error::Result;
use crate::protocol::{
    self, ReadyState, Update, CONNECTION_TOPIC, PAYLOAD_CONNECTED, PAYLOAD_DISCONNECTED,
};
use crate::store::TopicStore;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct ConnState {
    store: Arc<TopicStore>,
    ready_tx: watch::Sender<ReadyState>,
    cancel: CancellationToken,
}

pub struct ConnectionManager {
    url: Url,
    shared: Arc<ConnState>,
    outbound_tx: mpsc::Sender<Update>,
    outbound_rx: Mutex<Option<mpsc::Receiver<Update>>>,
    schedule: BackoffSchedule,
}

impl ConnectionManager {
    pub fn new(config: &CamsyncConfig, store: Arc<TopicStore>) -> Result<Self> {
        let url = protocol::ws_url(&config.server.origin)?;
        let (outbound_tx, outbound_rx) = mpsc::channel(config.system.outbound_queue_capacity);
        let (ready_tx, _) = watch::channel(ReadyState::Closed);

        Ok(Self {
            url,
            shared: Arc::new(ConnState {
                store,
                ready_tx,
                cancel: CancellationToken::new(),
            }),
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            schedule: BackoffSchedule::from_config(&config.connection),
        })
    }

    /// Start the supervision task. A manager runs at most one; repeat
    /// calls return `None`.
    pub fn spawn(&self) -> Option<JoinHandle<()>> {
        let Some(outbound_rx) = self.outbound_rx.lock().take() else {
            warn!("Connection manager already spawned");
            return None;
        };

        let shared = Arc::clone(&self.shared);
        let url = self.url.clone();
        let schedule = self.schedule.clone();

        Some(tokio::spawn(run(shared, url, schedule, outbound_rx)))
    }

    /// Forward an update to the server. A silent no-op unless the
    /// connection is open; nothing is queued for later delivery.
    pub fn send(&self, update: Update) {
        if !self.ready_state().is_open() {
            debug!(
                "Dropping outbound update for '{}': connection not open",
                update.topic
            );
            return;
        }

        if let Err(e) = self.outbound_tx.try_send(update) {
            warn!("Dropping outbound update: {}", e);
        }
    }

    pub fn ready_state(&self) -> ReadyState {
        *self.shared.ready_tx.borrow()
    }

    /// Observe ready-state transitions.
    pub fn watch_ready(&self) -> watch::Receiver<ReadyState> {
        self.shared.ready_tx.subscribe()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Stop the supervision task and close the socket. In-flight sends
    /// are not guaranteed delivered.
    pub fn shutdown(&self) {
        self.shared.cancel.cancel();
    }

    #[cfg(test)]
    pub(crate) fn force_ready(&self, state: ReadyState) {
        self.shared.ready_tx.send_replace(state);
    }

    #[cfg(test)]
    pub(crate) fn take_outbound(&self) -> Option<mpsc::Receiver<Update>> {
        self.outbound_rx.lock().take()
    }
}

/// Supervision loop: connect, run the session until it drops, mark the
/// disconnect, back off, repeat. Reconnection is unconditional; only
/// cancellation ends the loop.
async fn run(
    shared: Arc<ConnState>,
    url: Url,
    schedule: BackoffSchedule,
    mut outbound_rx: mpsc::Receiver<Update>,
) {
    let mut delays = schedule.delays();

    loop {
        if shared.cancel.is_cancelled() {
            break;
        }

        shared.ready_tx.send_replace(ReadyState::Connecting);
        debug!("Connecting to {}", url);

        let connect = tokio::select! {
            _ = shared.cancel.cancelled() => break,
            result = connect_async(url.as_str()) => result,
        };

        match connect {
            Ok((stream, _)) => {
                info!("Connected to {}", url);
                session(&shared, stream, &mut outbound_rx).await;
                // A successful session resets the backoff sequence
                delays = schedule.delays();
            }
            Err(e) => {
                warn!("Connection to {} failed: {}", url, e);
            }
        }

        shared.ready_tx.send_replace(ReadyState::Closed);
        shared.store.set(
            CONNECTION_TOPIC,
            serde_json::Value::String(PAYLOAD_DISCONNECTED.to_string()),
        );

        if shared.cancel.is_cancelled() {
            break;
        }

        // The schedule never exhausts; reconnection is unconditional
        if let Some(delay) = delays.next() {
            debug!("Reconnecting in {:?}", delay);
            tokio::select! {
                _ = shared.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    shared.ready_tx.send_replace(ReadyState::Closed);
    debug!("Connection manager stopped");
}

/// One connected session. Returns when the server closes, the transport
/// errors, or the manager is cancelled.
async fn session(
    shared: &Arc<ConnState>,
    stream: WsStream,
    outbound_rx: &mut mpsc::Receiver<Update>,
) {
    let (mut sink, mut inbound) = stream.split();

    shared.store.set(
        CONNECTION_TOPIC,
        serde_json::Value::String(PAYLOAD_CONNECTED.to_string()),
    );
    shared.ready_tx.send_replace(ReadyState::Open);

    // The sentinel is written before the outbound queue is drained, so
    // no other client-initiated message can precede it on the wire.
    match Update::sentinel().to_text() {
        Ok(text) => {
            if let Err(e) = sink.send(Message::Text(text)).await {
                warn!("Failed to send state snapshot request: {}", e);
                return;
            }
        }
        Err(e) => {
            warn!("Failed to encode state snapshot request: {}", e);
            return;
        }
    }

    loop {
        tokio::select! {
            _ = shared.cancel.cancelled() => {
                shared.ready_tx.send_replace(ReadyState::Closing);
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
            message = inbound.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        shared.store.apply_incoming(&text);
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Server closed the connection");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Binary, ping and pong frames carry no topic state
                    }
                    Some(Err(e)) => {
                        warn!("Transport error: {}", e);
                        break;
                    }
                    None => {
                        info!("Connection stream ended");
                        break;
                    }
                }
            }
            outbound = outbound_rx.recv() => {
                let Some(update) = outbound else { break };
                match update.to_text() {
                    Ok(text) => {
                        if let Err(e) = sink.send(Message::Text(text)).await {
                            warn!("Failed to send update for '{}': {}", update.topic, e);
                            break;
                        }
                        debug!("Published update for '{}'", update.topic);
                    }
                    Err(e) => {
                        warn!("Failed to encode update for '{}': {}", update.topic, e);
                    }
                }
            }
        }
    }
}
