pub mod activity;
pub mod bootstrap;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod features;
pub mod protocol;
pub mod store;

pub use activity::ActivityTracker;
pub use bootstrap::{CameraConfig, ConfigSnapshot, FeatureToggle};
pub use client::CamsyncClient;
pub use config::CamsyncConfig;
pub use connection::{BackoffSchedule, ConnectionManager};
pub use error::{CamsyncError, Result};
pub use features::{
    AggregateFeature, AggregateKind, CameraFeature, CommandFeature, ToggleKind, TuningKind,
};
pub use protocol::{ReadyState, Update};
pub use store::{StoreStats, StoreStatsSnapshot, TopicStore, TopicSubscription};
