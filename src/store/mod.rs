//! In-memory mapping from topic to the most recently observed payload.
//!
//! The store is the single shared state container of the crate: inbound
//! frames, bootstrap seeds, and local publishes all land here, and every
//! consumer reads through it. Change notification rides a broadcast
//! channel so subscribers never block writers.

mod stats;

#[cfg(test)]
mod tests;

pub use stats::{StoreStats, StoreStatsSnapshot};

use crate::bootstrap::ConfigSnapshot;
use crate::error::{CamsyncError, Result};
use crate::protocol::Update;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

/// Longest prefix of a malformed frame included in the warning log.
const MALFORMED_SAMPLE_LEN: usize = 128;

pub struct TopicStore {
    topics: RwLock<HashMap<String, Value>>,
    changes: broadcast::Sender<Update>,
    stats: StoreStats,
    bootstrapped: AtomicBool,
}

impl TopicStore {
    /// Create a store whose change feed holds up to `capacity` pending
    /// notifications per subscriber.
    pub fn new(capacity: usize) -> Arc<Self> {
        let (changes, _) = broadcast::channel(capacity);
        Arc::new(Self {
            topics: RwLock::new(HashMap::new()),
            changes,
            stats: StoreStats::new(),
            bootstrapped: AtomicBool::new(false),
        })
    }

    /// Last-known payload for a topic, if any update has been observed.
    pub fn get(&self, topic: &str) -> Option<Value> {
        self.topics.read().get(topic).cloned()
    }

    /// Local write. Used for optimistic publishes and synthetic updates
    /// (e.g. the connection-status topic); never forwarded to the server.
    pub fn set<T: Into<String>>(&self, topic: T, payload: Value) {
        let update = Update::new(topic, payload, false);
        self.stats.local_publishes.fetch_add(1, Ordering::Relaxed);
        self.insert(update);
    }

    /// Parse one inbound text frame and replace the entry for its topic.
    ///
    /// Malformed frames never panic and never mutate the store; they are
    /// logged and counted rather than silently swallowed. Returns the
    /// applied update, or `None` if the frame was dropped.
    pub fn apply_incoming(&self, text: &str) -> Option<Update> {
        let update = match Update::from_text(text) {
            Ok(update) => update,
            Err(e) => {
                self.stats.malformed_dropped.fetch_add(1, Ordering::Relaxed);
                let sample: String = text.chars().take(MALFORMED_SAMPLE_LEN).collect();
                warn!("Dropping malformed frame ({}): {:?}", e, sample);
                return None;
            }
        };

        trace!("Applying update for topic '{}'", update.topic);
        self.stats.updates_applied.fetch_add(1, Ordering::Relaxed);
        self.insert(update.clone());
        Some(update)
    }

    /// Seed per-camera toggle topics from a configuration snapshot.
    ///
    /// Applies at most once per store instance; a second call is a no-op
    /// so that repeated evaluation of the same loaded config cannot stomp
    /// newer server-pushed state. Returns the number of entries written.
    pub fn bootstrap_from_config(&self, snapshot: &ConfigSnapshot) -> usize {
        if self.bootstrapped.swap(true, Ordering::SeqCst) {
            debug!("Store already bootstrapped; ignoring repeat config snapshot");
            return 0;
        }

        let updates = snapshot.initial_updates();
        let count = updates.len();

        for update in updates {
            self.stats.bootstrap_writes.fetch_add(1, Ordering::Relaxed);
            self.insert(update);
        }

        debug!("Bootstrapped {} topic entries from config snapshot", count);
        count
    }

    /// Subscribe to payload changes for a single topic.
    pub fn subscribe<T: Into<String>>(&self, topic: T) -> TopicSubscription {
        TopicSubscription {
            receiver: self.changes.subscribe(),
            topic: topic.into(),
        }
    }

    /// Raw change feed across all topics.
    pub fn changes(&self) -> broadcast::Receiver<Update> {
        self.changes.subscribe()
    }

    /// Copy of the full topic map.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.topics.read().clone()
    }

    pub fn stats(&self) -> StoreStatsSnapshot {
        self.stats.snapshot()
    }

    fn insert(&self, update: Update) {
        self.topics
            .write()
            .insert(update.topic.clone(), update.payload.clone());

        // No subscribers is fine; the store does not care who listens.
        let _ = self.changes.send(update);
    }
}

/// Receiver filtered down to a single topic.
pub struct TopicSubscription {
    receiver: broadcast::Receiver<Update>,
    topic: String,
}

impl TopicSubscription {
    /// Receive the next payload published for this topic.
    ///
    /// A lagged receiver skips ahead rather than erroring: the store only
    /// promises last-value semantics, so missed intermediate payloads are
    /// already stale.
    pub async fn recv(&mut self) -> Result<Value> {
        loop {
            match self.receiver.recv().await {
                Ok(update) => {
                    if update.topic == self.topic {
                        return Ok(update.payload);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Subscription for '{}' lagged by {} updates", self.topic, n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(CamsyncError::channel_closed(format!(
                        "store change feed (topic '{}')",
                        self.topic
                    )));
                }
            }
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}
