use thiserror::Error;

#[derive(Error, Debug)]
pub enum CamsyncError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid server origin '{origin}': {reason}")]
    InvalidOrigin { origin: String, reason: String },

    #[error("Transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Channel closed: {context}")]
    ChannelClosed { context: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl CamsyncError {
    pub fn invalid_origin<S: Into<String>>(origin: S, reason: S) -> Self {
        Self::InvalidOrigin {
            origin: origin.into(),
            reason: reason.into(),
        }
    }

    pub fn channel_closed<S: Into<String>>(context: S) -> Self {
        Self::ChannelClosed {
            context: context.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CamsyncError>;
