//! Client assembly: one topic store, one connection manager, and the
//! accessors that hand out per-feature handles.

use crate::activity::ActivityTracker;
use crate::bootstrap::ConfigSnapshot;
use crate::config::CamsyncConfig;
use crate::connection::ConnectionManager;
use crate::error::Result;
use crate::features::{
    AggregateFeature, AggregateKind, CameraFeature, CommandFeature, ToggleKind, TuningKind,
};
use crate::protocol::{ReadyState, Update};
use crate::store::{StoreStatsSnapshot, TopicStore};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

pub struct CamsyncClient {
    config: CamsyncConfig,
    store: Arc<TopicStore>,
    connection: Arc<ConnectionManager>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CamsyncClient {
    /// Wire up the store and connection manager without touching the
    /// network. Call [`start`](Self::start) to connect.
    pub fn new(config: CamsyncConfig) -> Result<Self> {
        let store = TopicStore::new(config.system.store_channel_capacity);
        let connection = Arc::new(ConnectionManager::new(&config, Arc::clone(&store))?);

        Ok(Self {
            config,
            store,
            connection,
            task: Mutex::new(None),
        })
    }

    /// Start the connection supervision task. Idempotent; the manager
    /// enforces a single live connection per client instance.
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.is_none() {
            if let Some(handle) = self.connection.spawn() {
                info!("Camsync client started against {}", self.connection.url());
                *task = Some(handle);
            }
        }
    }

    /// Seed toggle topics from a previously fetched server config
    /// snapshot. Returns the number of entries written.
    pub fn bootstrap(&self, snapshot: &ConfigSnapshot) -> usize {
        self.store.bootstrap_from_config(snapshot)
    }

    pub fn toggle(&self, camera: &str, kind: ToggleKind) -> CameraFeature {
        self.camera_feature(camera, kind.feature_name())
    }

    pub fn tuning(&self, camera: &str, kind: TuningKind) -> CameraFeature {
        self.camera_feature(camera, kind.feature_name())
    }

    /// PTZ command channel for one camera (write-only).
    pub fn ptz(&self, camera: &str) -> CommandFeature {
        CommandFeature::new(Arc::clone(&self.connection), format!("{}/ptz", camera))
    }

    /// Server restart command (write-only).
    pub fn restart(&self) -> CommandFeature {
        CommandFeature::new(Arc::clone(&self.connection), "restart".to_string())
    }

    pub fn aggregate(&self, kind: AggregateKind) -> AggregateFeature {
        AggregateFeature::new(Arc::clone(&self.store), kind)
    }

    pub fn activity_tracker(&self) -> ActivityTracker {
        ActivityTracker::new(
            Arc::clone(&self.store),
            Arc::clone(&self.connection),
            self.config.bootstrap.clone(),
        )
    }

    /// Publish a raw update. Silent no-op while disconnected.
    pub fn send(&self, update: Update) {
        self.connection.send(update);
    }

    pub fn store(&self) -> &Arc<TopicStore> {
        &self.store
    }

    pub fn ready_state(&self) -> ReadyState {
        self.connection.ready_state()
    }

    pub fn watch_ready(&self) -> watch::Receiver<ReadyState> {
        self.connection.watch_ready()
    }

    pub fn stats(&self) -> StoreStatsSnapshot {
        self.store.stats()
    }

    pub fn config(&self) -> &CamsyncConfig {
        &self.config
    }

    /// Cancel the supervision task and wait for it to stop.
    pub async fn shutdown(&self) {
        self.connection.shutdown();
        let task = self.task.lock().take();
        if let Some(handle) = task {
            let _ = handle.await;
        }
        info!("Camsync client stopped");
    }

    fn camera_feature(&self, camera: &str, feature: &str) -> CameraFeature {
        CameraFeature::new(
            Arc::clone(&self.store),
            Arc::clone(&self.connection),
            camera,
            feature,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> CamsyncClient {
        CamsyncClient::new(CamsyncConfig::default()).unwrap()
    }

    #[test]
    fn test_client_starts_disconnected() {
        let client = client();
        assert_eq!(client.ready_state(), ReadyState::Closed);
    }

    #[test]
    fn test_feature_accessors_share_one_store() {
        let client = client();

        client
            .store()
            .apply_incoming(r#"{"topic":"cam1/detect/state","payload":"ON","retain":false}"#);

        let detect = client.toggle("cam1", ToggleKind::Detect);
        assert!(detect.is_on());

        let threshold = client.tuning("cam1", TuningKind::MotionThreshold);
        assert_eq!(threshold.read_topic(), "cam1/motion_threshold/state");
        assert_eq!(threshold.payload(), None);
    }

    #[test]
    fn test_command_topics() {
        let client = client();
        assert_eq!(client.ptz("front").write_topic(), "front/ptz");
        assert_eq!(client.restart().write_topic(), "restart");
    }

    #[test]
    fn test_bootstrap_through_client() {
        let client = client();
        let snapshot: ConfigSnapshot = serde_json::from_value(json!({
            "cameras": { "front": { "record": { "enabled": true } } }
        }))
        .unwrap();

        assert_eq!(client.bootstrap(&snapshot), 5);
        assert!(client.toggle("front", ToggleKind::Recordings).is_on());
        // Second load is a guarded no-op
        assert_eq!(client.bootstrap(&snapshot), 0);
    }

    #[tokio::test]
    async fn test_shutdown_without_start() {
        let client = client();
        client.shutdown().await;
        assert_eq!(client.ready_state(), ReadyState::Closed);
    }
}
