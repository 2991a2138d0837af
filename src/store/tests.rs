use super::*;
use crate::bootstrap::ConfigSnapshot;
use serde_json::json;

fn store() -> Arc<TopicStore> {
    TopicStore::new(32)
}

#[test]
fn test_apply_incoming_replaces_topic_value() {
    let store = store();

    let applied = store.apply_incoming(r#"{"topic":"cam1/detect/state","payload":"ON","retain":false}"#);
    assert!(applied.is_some());
    assert_eq!(store.get("cam1/detect/state"), Some(json!("ON")));

    store.apply_incoming(r#"{"topic":"cam1/detect/state","payload":"OFF","retain":false}"#);
    assert_eq!(store.get("cam1/detect/state"), Some(json!("OFF")));
    assert_eq!(store.stats().updates_applied, 2);
}

#[test]
fn test_malformed_frame_does_not_mutate_store() {
    let store = store();
    store.set("cam1/detect/state", json!("ON"));
    let before = store.snapshot();

    assert!(store.apply_incoming("not json at all").is_none());
    assert!(store.apply_incoming(r#"{"topic":"x"}"#).is_none());
    assert!(store.apply_incoming("").is_none());

    assert_eq!(store.snapshot(), before);
    assert_eq!(store.stats().malformed_dropped, 3);
    assert_eq!(store.stats().updates_applied, 0);
}

#[test]
fn test_unknown_topic_reads_none() {
    let store = store();
    assert_eq!(store.get("backyard/detect/state"), None);
}

#[test]
fn test_bootstrap_seeds_toggle_topics() {
    let store = store();
    let snapshot: ConfigSnapshot = serde_json::from_value(json!({
        "cameras": {
            "front": {
                "record": { "enabled": true },
                "detect": { "enabled": false }
            }
        }
    }))
    .unwrap();

    let written = store.bootstrap_from_config(&snapshot);
    assert_eq!(written, 5);
    assert_eq!(store.get("front/recordings/state"), Some(json!("ON")));
    assert_eq!(store.get("front/detect/state"), Some(json!("OFF")));
    assert_eq!(store.stats().bootstrap_writes, 5);
}

#[test]
fn test_bootstrap_applies_only_once() {
    let store = store();
    let snapshot: ConfigSnapshot = serde_json::from_value(json!({
        "cameras": { "front": { "detect": { "enabled": true } } }
    }))
    .unwrap();

    assert_eq!(store.bootstrap_from_config(&snapshot), 5);

    // Server state arriving after bootstrap must survive a repeat call
    store.apply_incoming(r#"{"topic":"front/detect/state","payload":"OFF","retain":false}"#);
    assert_eq!(store.bootstrap_from_config(&snapshot), 0);
    assert_eq!(store.get("front/detect/state"), Some(json!("OFF")));
}

#[tokio::test]
async fn test_subscription_delivers_matching_topic_only() {
    let store = store();
    let mut sub = store.subscribe("cam1/detect/state");

    store.set("cam2/detect/state", json!("OFF"));
    store.set("cam1/detect/state", json!("ON"));

    let payload = sub.recv().await.unwrap();
    assert_eq!(payload, json!("ON"));
}

#[tokio::test]
async fn test_subscription_sees_incoming_frames() {
    let store = store();
    let mut sub = store.subscribe("stats");

    store.apply_incoming(r#"{"topic":"stats","payload":"{\"cpu\":1}","retain":false}"#);

    let payload = sub.recv().await.unwrap();
    assert_eq!(payload, json!("{\"cpu\":1}"));
}

#[test]
fn test_local_set_counts_as_publish() {
    let store = store();
    store.set("ws", json!("connected"));
    assert_eq!(store.stats().local_publishes, 1);
    assert_eq!(store.get("ws"), Some(json!("connected")));
}
