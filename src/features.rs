//! Typed per-feature handles over the topic store and connection manager.
//!
//! Every handle is the same thin shape: one read topic, optionally one
//! write topic. Values sent through a handle are not validated client
//! side; the server rejects commands it does not understand.

use crate::connection::ConnectionManager;
use crate::protocol::{self, Update, PAYLOAD_ON};
use crate::store::{TopicStore, TopicSubscription};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Per-camera boolean toggles exposed over `{camera}/{feature}/state` and
/// `{camera}/{feature}/set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleKind {
    Detect,
    Recordings,
    Snapshots,
    Audio,
    Autotracking,
    ImproveContrast,
}

impl ToggleKind {
    pub fn feature_name(&self) -> &'static str {
        match self {
            ToggleKind::Detect => "detect",
            ToggleKind::Recordings => "recordings",
            ToggleKind::Snapshots => "snapshots",
            ToggleKind::Audio => "audio",
            ToggleKind::Autotracking => "ptz_autotracker",
            ToggleKind::ImproveContrast => "improve_contrast",
        }
    }
}

/// Per-camera numeric motion tuning values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuningKind {
    MotionThreshold,
    MotionContourArea,
}

impl TuningKind {
    pub fn feature_name(&self) -> &'static str {
        match self {
            TuningKind::MotionThreshold => "motion_threshold",
            TuningKind::MotionContourArea => "motion_contour_area",
        }
    }
}

/// Aggregate topics whose payload is itself a JSON-encoded string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Events,
    Reviews,
    Stats,
    CameraActivity,
}

impl AggregateKind {
    pub fn topic(&self) -> &'static str {
        match self {
            AggregateKind::Events => "events",
            AggregateKind::Reviews => "reviews",
            AggregateKind::Stats => "stats",
            AggregateKind::CameraActivity => "camera_activity",
        }
    }
}

/// Read/write handle for one camera feature.
pub struct CameraFeature {
    store: Arc<TopicStore>,
    connection: Arc<ConnectionManager>,
    read_topic: String,
    write_topic: String,
}

impl CameraFeature {
    pub(crate) fn new(
        store: Arc<TopicStore>,
        connection: Arc<ConnectionManager>,
        camera: &str,
        feature: &str,
    ) -> Self {
        Self {
            store,
            connection,
            read_topic: protocol::state_topic(camera, feature),
            write_topic: protocol::set_topic(camera, feature),
        }
    }

    /// Current store value for the read topic; `None` before the first
    /// update arrives.
    pub fn payload(&self) -> Option<Value> {
        self.store.get(&self.read_topic)
    }

    /// Convenience for toggle features: whether the payload is `"ON"`.
    pub fn is_on(&self) -> bool {
        matches!(self.payload(), Some(Value::String(s)) if s == PAYLOAD_ON)
    }

    pub fn subscribe(&self) -> TopicSubscription {
        self.store.subscribe(self.read_topic.clone())
    }

    /// Publish a value to the write topic. Dropped silently while the
    /// connection is not open.
    pub fn send(&self, value: Value, retain: bool) {
        self.connection
            .send(Update::new(self.write_topic.clone(), value, retain));
    }

    /// Publish an `"ON"`/`"OFF"` toggle command.
    pub fn send_toggle(&self, enabled: bool) {
        self.connection
            .send(Update::toggle(self.write_topic.clone(), enabled));
    }

    pub fn read_topic(&self) -> &str {
        &self.read_topic
    }

    pub fn write_topic(&self) -> &str {
        &self.write_topic
    }
}

/// Write-only handle for command topics (PTZ, restart).
pub struct CommandFeature {
    connection: Arc<ConnectionManager>,
    write_topic: String,
}

impl CommandFeature {
    pub(crate) fn new(connection: Arc<ConnectionManager>, write_topic: String) -> Self {
        Self {
            connection,
            write_topic,
        }
    }

    pub fn send(&self, value: Value, retain: bool) {
        self.connection
            .send(Update::new(self.write_topic.clone(), value, retain));
    }

    pub fn write_topic(&self) -> &str {
        &self.write_topic
    }
}

/// Read-only handle for aggregate topics. The wire payload is a JSON
/// document encoded as a string, so reads go through a second parse.
pub struct AggregateFeature {
    store: Arc<TopicStore>,
    topic: &'static str,
}

impl AggregateFeature {
    pub(crate) fn new(store: Arc<TopicStore>, kind: AggregateKind) -> Self {
        Self {
            store,
            topic: kind.topic(),
        }
    }

    /// Raw payload as stored, without the second parse.
    pub fn payload(&self) -> Option<Value> {
        self.store.get(self.topic)
    }

    /// Decoded payload. A payload that is not a parseable JSON string
    /// reads as `None`; the failure is logged, not raised.
    pub fn parsed(&self) -> Option<Value> {
        match self.store.get(self.topic)? {
            Value::String(text) => match serde_json::from_str(&text) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Aggregate topic '{}' payload failed to parse: {}", self.topic, e);
                    None
                }
            },
            // Some servers push the document directly rather than encoded
            value => Some(value),
        }
    }

    pub fn subscribe(&self) -> TopicSubscription {
        self.store.subscribe(self.topic)
    }

    pub fn topic(&self) -> &str {
        self.topic
    }
}
