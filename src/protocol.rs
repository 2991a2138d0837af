use crate::error::{CamsyncError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// Reserved topic used to request a full state snapshot from the server.
pub const SENTINEL_TOPIC: &str = "onConnect";

/// Synthetic local topic reflecting connection health. Never sent to the
/// server; written by the connection manager on open/close.
pub const CONNECTION_TOPIC: &str = "ws";

pub const PAYLOAD_ON: &str = "ON";
pub const PAYLOAD_OFF: &str = "OFF";
pub const PAYLOAD_CONNECTED: &str = "connected";
pub const PAYLOAD_DISCONNECTED: &str = "disconnected";

/// Fixed path appended to the rewritten server origin.
const WS_PATH: &str = "/ws";

/// One message received from or sent to the server.
///
/// Wire framing is a single JSON object per WebSocket text frame:
/// `{ "topic": string, "payload": any, "retain": bool }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub topic: String,
    pub payload: Value,
    pub retain: bool,
}

impl Update {
    pub fn new<T: Into<String>>(topic: T, payload: Value, retain: bool) -> Self {
        Self {
            topic: topic.into(),
            payload,
            retain,
        }
    }

    /// The `onConnect` sentinel requesting a full state dump.
    pub fn sentinel() -> Self {
        Self::new(SENTINEL_TOPIC, Value::String(String::new()), false)
    }

    /// Toggle payload as the server expects it: the strings "ON"/"OFF",
    /// not a boolean.
    pub fn toggle<T: Into<String>>(topic: T, enabled: bool) -> Self {
        let payload = if enabled { PAYLOAD_ON } else { PAYLOAD_OFF };
        Self::new(topic, Value::String(payload.to_string()), false)
    }

    pub fn to_text(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_text(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Connection status as observed by consumers. Owned by the connection
/// manager; read-only everywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ReadyState {
    pub fn is_open(&self) -> bool {
        matches!(self, ReadyState::Open)
    }
}

/// Read topic for a per-camera toggle or value: `{camera}/{feature}/state`.
pub fn state_topic(camera: &str, feature: &str) -> String {
    format!("{}/{}/state", camera, feature)
}

/// Write topic for a per-camera command: `{camera}/{feature}/set`.
pub fn set_topic(camera: &str, feature: &str) -> String {
    format!("{}/{}/set", camera, feature)
}

/// Derive the WebSocket endpoint from an HTTP origin by rewriting the
/// scheme (http -> ws, https -> wss) and appending the fixed `/ws` path.
/// Origins already using a ws scheme are accepted as-is.
pub fn ws_url(origin: &str) -> Result<Url> {
    let mut url = Url::parse(origin)
        .map_err(|e| CamsyncError::invalid_origin(origin.to_string(), e.to_string()))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(CamsyncError::invalid_origin(
                origin.to_string(),
                format!("unsupported scheme '{}'", other),
            ))
        }
    };

    url.set_scheme(scheme)
        .map_err(|_| CamsyncError::invalid_origin(origin.to_string(), "scheme rejected".into()))?;
    url.set_path(WS_PATH);
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ws_url_rewrites_http_origin() {
        let url = ws_url("http://nvr.local:5000").unwrap();
        assert_eq!(url.as_str(), "ws://nvr.local:5000/ws");
    }

    #[test]
    fn test_ws_url_rewrites_https_origin() {
        let url = ws_url("https://cameras.example.com").unwrap();
        assert_eq!(url.as_str(), "wss://cameras.example.com/ws");
    }

    #[test]
    fn test_ws_url_replaces_existing_path() {
        let url = ws_url("http://host:5000/dashboard").unwrap();
        assert_eq!(url.path(), "/ws");
    }

    #[test]
    fn test_ws_url_rejects_unsupported_scheme() {
        assert!(ws_url("ftp://host").is_err());
        assert!(ws_url("not a url").is_err());
    }

    #[test]
    fn test_update_wire_shape() {
        let update = Update::new("cam1/detect/state", json!("ON"), false);
        let text = update.to_text().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["topic"], "cam1/detect/state");
        assert_eq!(value["payload"], "ON");
        assert_eq!(value["retain"], false);
    }

    #[test]
    fn test_sentinel_shape() {
        let sentinel = Update::sentinel();
        assert_eq!(sentinel.topic, SENTINEL_TOPIC);
        assert_eq!(sentinel.payload, json!(""));
        assert!(!sentinel.retain);
    }

    #[test]
    fn test_topic_templates() {
        assert_eq!(state_topic("front", "detect"), "front/detect/state");
        assert_eq!(set_topic("front", "detect"), "front/detect/set");
    }
}
