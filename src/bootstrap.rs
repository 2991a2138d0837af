//! Serde model of the camera server's configuration snapshot.
//!
//! The snapshot is fetched out-of-band (the HTTP layer is not part of this
//! crate); callers hand the deserialized object to
//! [`TopicStore::bootstrap_from_config`](crate::store::TopicStore::bootstrap_from_config)
//! to seed initial toggle states before the first server push arrives.

use crate::protocol::{self, Update};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfigSnapshot {
    #[serde(default)]
    pub cameras: HashMap<String, CameraConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub detect: FeatureToggle,
    #[serde(default)]
    pub record: FeatureToggle,
    #[serde(default)]
    pub snapshots: FeatureToggle,
    #[serde(default)]
    pub audio: FeatureToggle,
    #[serde(default)]
    pub onvif: OnvifConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OnvifConfig {
    #[serde(default)]
    pub autotracking: FeatureToggle,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FeatureToggle {
    #[serde(default)]
    pub enabled: bool,
}

impl ConfigSnapshot {
    /// Synthesize one toggle update per camera per feature, mirroring what
    /// the server would push for each `{camera}/{feature}/state` topic.
    ///
    /// The `record` config section feeds the `recordings` topic; the two
    /// names differ on the wire.
    pub fn initial_updates(&self) -> Vec<Update> {
        let mut updates = Vec::with_capacity(self.cameras.len() * 5);

        for (name, camera) in &self.cameras {
            updates.push(Update::toggle(
                protocol::state_topic(name, "detect"),
                camera.detect.enabled,
            ));
            updates.push(Update::toggle(
                protocol::state_topic(name, "recordings"),
                camera.record.enabled,
            ));
            updates.push(Update::toggle(
                protocol::state_topic(name, "snapshots"),
                camera.snapshots.enabled,
            ));
            updates.push(Update::toggle(
                protocol::state_topic(name, "audio"),
                camera.audio.enabled,
            ));
            updates.push(Update::toggle(
                protocol::state_topic(name, "ptz_autotracker"),
                camera.onvif.autotracking.enabled,
            ));
        }

        updates
    }
}
