//! Initial-state bootstrap triggers and per-camera activity reads.
//!
//! The server replies to the `onConnect` sentinel with a full state dump,
//! including the aggregate `camera_activity` topic. The tracker re-requests
//! that dump on attach and whenever the consumer regains focus, collapsing
//! rapid duplicate triggers into a single request.

use crate::config::BootstrapConfig;
use crate::connection::ConnectionManager;
use crate::features::{AggregateFeature, AggregateKind};
use crate::protocol::Update;
use crate::store::TopicStore;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

pub struct ActivityTracker {
    connection: Arc<ConnectionManager>,
    activity: AggregateFeature,
    config: BootstrapConfig,
    last_request: Mutex<Option<Instant>>,
}

impl ActivityTracker {
    pub(crate) fn new(
        store: Arc<TopicStore>,
        connection: Arc<ConnectionManager>,
        config: BootstrapConfig,
    ) -> Self {
        Self {
            connection,
            activity: AggregateFeature::new(store, AggregateKind::CameraActivity),
            config,
            last_request: Mutex::new(None),
        }
    }

    /// Request a full state snapshot on attach. Returns whether a sentinel
    /// was actually published (the debounce window may suppress it).
    pub fn attach(&self) -> bool {
        self.request_snapshot()
    }

    /// Focus-regained trigger. Publishes one additional sentinel per call
    /// when revalidate-on-focus is enabled; a no-op otherwise.
    pub fn refresh(&self) -> bool {
        if !self.config.revalidate_on_focus {
            return false;
        }
        self.request_snapshot()
    }

    /// Per-camera slice of the `camera_activity` payload. Stays `None`
    /// for as long as the server has not replied; there is no timeout and
    /// no retry here.
    pub fn camera_activity(&self, camera: &str) -> Option<Value> {
        self.activity.parsed()?.get(camera).cloned()
    }

    fn request_snapshot(&self) -> bool {
        // A sentinel sent while the socket is not open goes nowhere, so
        // it must not consume the debounce window either.
        if !self.connection.ready_state().is_open() {
            debug!("Snapshot request skipped: connection not open");
            return false;
        }

        let mut last = self.last_request.lock();

        if let Some(at) = *last {
            if at.elapsed() < self.config.refresh_debounce() {
                debug!("Snapshot request suppressed by debounce window");
                return false;
            }
        }

        *last = Some(Instant::now());
        drop(last);

        self.connection.send(Update::sentinel());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CamsyncConfig;
    use crate::protocol::{ReadyState, SENTINEL_TOPIC};
    use serde_json::json;
    use tokio::sync::mpsc::error::TryRecvError;

    struct Fixture {
        store: Arc<TopicStore>,
        connection: Arc<ConnectionManager>,
        outbound: tokio::sync::mpsc::Receiver<Update>,
    }

    fn fixture(config: &CamsyncConfig) -> Fixture {
        let store = TopicStore::new(config.system.store_channel_capacity);
        let connection =
            Arc::new(ConnectionManager::new(config, Arc::clone(&store)).unwrap());
        let outbound = connection.take_outbound().unwrap();
        connection.force_ready(ReadyState::Open);
        Fixture {
            store,
            connection,
            outbound,
        }
    }

    fn tracker(config: &CamsyncConfig, fx: &Fixture) -> ActivityTracker {
        ActivityTracker::new(
            Arc::clone(&fx.store),
            Arc::clone(&fx.connection),
            config.bootstrap.clone(),
        )
    }

    #[test]
    fn test_attach_publishes_one_sentinel() {
        let config = CamsyncConfig::default();
        let mut fx = fixture(&config);
        let tracker = tracker(&config, &fx);

        assert!(tracker.attach());

        let sent = fx.outbound.try_recv().unwrap();
        assert_eq!(sent.topic, SENTINEL_TOPIC);
        assert!(matches!(fx.outbound.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_rapid_double_trigger_collapses() {
        let config = CamsyncConfig::default();
        let mut fx = fixture(&config);
        let tracker = tracker(&config, &fx);

        assert!(tracker.attach());
        assert!(!tracker.refresh());

        fx.outbound.try_recv().unwrap();
        assert!(matches!(fx.outbound.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_refresh_outside_debounce_sends_again() {
        let mut config = CamsyncConfig::default();
        config.bootstrap.refresh_debounce_ms = 0;
        let mut fx = fixture(&config);
        let tracker = tracker(&config, &fx);

        assert!(tracker.attach());
        assert!(tracker.refresh());

        fx.outbound.try_recv().unwrap();
        fx.outbound.try_recv().unwrap();
        assert!(matches!(fx.outbound.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_trigger_while_disconnected_does_not_consume_debounce() {
        let config = CamsyncConfig::default();
        let store = TopicStore::new(config.system.store_channel_capacity);
        let connection =
            Arc::new(ConnectionManager::new(&config, Arc::clone(&store)).unwrap());
        let mut outbound = connection.take_outbound().unwrap();
        let tracker = ActivityTracker::new(
            Arc::clone(&store),
            Arc::clone(&connection),
            config.bootstrap.clone(),
        );

        // Connection starts closed: nothing leaves, nothing is recorded
        assert!(!tracker.attach());
        assert!(matches!(outbound.try_recv(), Err(TryRecvError::Empty)));

        // The next trigger after the socket opens goes straight out,
        // even though it falls inside the previous call's would-be window
        connection.force_ready(ReadyState::Open);
        assert!(tracker.refresh());
        assert_eq!(outbound.try_recv().unwrap().topic, SENTINEL_TOPIC);
    }

    #[test]
    fn test_refresh_disabled_by_config() {
        let mut config = CamsyncConfig::default();
        config.bootstrap.revalidate_on_focus = false;
        let mut fx = fixture(&config);
        let tracker = tracker(&config, &fx);

        assert!(!tracker.refresh());
        assert!(matches!(fx.outbound.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_activity_stays_none_without_server_reply() {
        let config = CamsyncConfig::default();
        let fx = fixture(&config);
        let tracker = tracker(&config, &fx);

        tracker.attach();
        assert_eq!(tracker.camera_activity("front"), None);
    }

    #[test]
    fn test_activity_slice_by_camera_name() {
        let config = CamsyncConfig::default();
        let fx = fixture(&config);
        let tracker = tracker(&config, &fx);

        fx.store.apply_incoming(
            r#"{"topic":"camera_activity","payload":"{\"front\":{\"motion\":true},\"yard\":{\"motion\":false}}","retain":false}"#,
        );

        assert_eq!(
            tracker.camera_activity("front"),
            Some(json!({"motion": true}))
        );
        assert_eq!(tracker.camera_activity("garage"), None);
    }
}
