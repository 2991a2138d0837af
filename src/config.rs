use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CamsyncConfig {
    pub server: ServerConfig,
    pub connection: ConnectionConfig,
    pub bootstrap: BootstrapConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// HTTP(S) origin of the camera server; rewritten to ws(s)://.../ws
    #[serde(default = "default_origin")]
    pub origin: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConnectionConfig {
    /// Reconnect backoff strategy ("constant" or "exponential")
    #[serde(default = "default_reconnect_strategy")]
    pub reconnect_strategy: ReconnectStrategy,

    /// Base delay between reconnection attempts in milliseconds
    #[serde(default = "default_reconnect_step_ms")]
    pub reconnect_step_ms: u64,

    /// Upper bound on the reconnect delay in milliseconds
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,

    /// Multiplier applied per attempt for the exponential strategy
    #[serde(default = "default_reconnect_factor")]
    pub reconnect_factor: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BootstrapConfig {
    /// Re-request a full state snapshot when the consumer regains focus
    #[serde(default = "default_revalidate_on_focus")]
    pub revalidate_on_focus: bool,

    /// Window within which duplicate snapshot triggers collapse to one
    #[serde(default = "default_refresh_debounce_ms")]
    pub refresh_debounce_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Capacity of the store's change broadcast channel
    #[serde(default = "default_store_channel_capacity")]
    pub store_channel_capacity: usize,

    /// Capacity of the outbound send queue
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReconnectStrategy {
    Constant,
    Exponential,
}

impl ConnectionConfig {
    pub fn reconnect_step(&self) -> Duration {
        Duration::from_millis(self.reconnect_step_ms)
    }

    pub fn reconnect_max_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_delay_ms)
    }
}

impl BootstrapConfig {
    pub fn refresh_debounce(&self) -> Duration {
        Duration::from_millis(self.refresh_debounce_ms)
    }
}

impl CamsyncConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("camsync.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            // Start with default values
            .set_default("server.origin", default_origin())?
            .set_default("connection.reconnect_strategy", "exponential")?
            .set_default("connection.reconnect_step_ms", default_reconnect_step_ms())?
            .set_default(
                "connection.reconnect_max_delay_ms",
                default_reconnect_max_delay_ms(),
            )?
            .set_default("connection.reconnect_factor", default_reconnect_factor())?
            .set_default(
                "bootstrap.revalidate_on_focus",
                default_revalidate_on_focus(),
            )?
            .set_default(
                "bootstrap.refresh_debounce_ms",
                default_refresh_debounce_ms(),
            )?
            .set_default(
                "system.store_channel_capacity",
                default_store_channel_capacity() as i64,
            )?
            .set_default(
                "system.outbound_queue_capacity",
                default_outbound_queue_capacity() as i64,
            )?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables with CAMSYNC_ prefix
            .add_source(Environment::with_prefix("CAMSYNC").separator("_"))
            .build()?;

        let config: CamsyncConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.origin.is_empty() {
            return Err(ConfigError::Message(
                "Server origin must not be empty".to_string(),
            ));
        }

        if crate::protocol::ws_url(&self.server.origin).is_err() {
            return Err(ConfigError::Message(format!(
                "Server origin '{}' is not a valid http(s) or ws(s) URL",
                self.server.origin
            )));
        }

        if self.connection.reconnect_step_ms == 0 {
            return Err(ConfigError::Message(
                "Reconnect step must be greater than 0".to_string(),
            ));
        }

        if self.connection.reconnect_max_delay_ms < self.connection.reconnect_step_ms {
            return Err(ConfigError::Message(
                "Reconnect max delay must be at least the reconnect step".to_string(),
            ));
        }

        if self.connection.reconnect_factor == 0 {
            return Err(ConfigError::Message(
                "Reconnect factor must be greater than 0".to_string(),
            ));
        }

        if self.system.store_channel_capacity == 0 {
            return Err(ConfigError::Message(
                "Store channel capacity must be greater than 0".to_string(),
            ));
        }

        if self.system.outbound_queue_capacity == 0 {
            return Err(ConfigError::Message(
                "Outbound queue capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for CamsyncConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                origin: default_origin(),
            },
            connection: ConnectionConfig {
                reconnect_strategy: default_reconnect_strategy(),
                reconnect_step_ms: default_reconnect_step_ms(),
                reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
                reconnect_factor: default_reconnect_factor(),
            },
            bootstrap: BootstrapConfig {
                revalidate_on_focus: default_revalidate_on_focus(),
                refresh_debounce_ms: default_refresh_debounce_ms(),
            },
            system: SystemConfig {
                store_channel_capacity: default_store_channel_capacity(),
                outbound_queue_capacity: default_outbound_queue_capacity(),
            },
        }
    }
}

// Default value functions
fn default_origin() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_reconnect_strategy() -> ReconnectStrategy {
    ReconnectStrategy::Exponential
}
fn default_reconnect_step_ms() -> u64 {
    1000
}
fn default_reconnect_max_delay_ms() -> u64 {
    30_000
}
fn default_reconnect_factor() -> u64 {
    2
}

fn default_revalidate_on_focus() -> bool {
    true
}
fn default_refresh_debounce_ms() -> u64 {
    500
}

fn default_store_channel_capacity() -> usize {
    256
}
fn default_outbound_queue_capacity() -> usize {
    64
}
