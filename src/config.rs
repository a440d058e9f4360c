//! Configuration for mcwire
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

use crate::error::{Result, WireError};

/// Default idle deadline per line read (milliseconds)
pub const DEFAULT_DEADLINE_MS: u64 = 60_000;

/// Default per-connection buffer size (bytes)
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Default upper bound on a single item payload (bytes)
pub const DEFAULT_MAX_ITEM_SIZE: usize = 1024 * 1024;

/// Smallest buffer that still holds a realistic command line
pub const MIN_BUFFER_SIZE: usize = 16;

/// Keys understood by `SessionConfig::from_params`
const KNOWN_PARAMS: [&str; 3] = ["deadline", "buf", "max_item"];

/// Main configuration for a server instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    // -------------------------------------------------------------------------
    // Session Configuration
    // -------------------------------------------------------------------------
    /// Per-connection settings handed to every session
    pub session: SessionConfig,
}

/// Per-connection session settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Idle deadline, re-armed before every line read
    pub deadline: Duration,

    /// Capacity of the buffered reader and writer; also the longest
    /// accepted command line
    pub buffer_size: usize,

    /// Largest item payload a `set` may declare
    pub max_item_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:11211".to_string(),
            max_connections: 1024,
            session: SessionConfig::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_millis(DEFAULT_DEADLINE_MS),
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_item_size: DEFAULT_MAX_ITEM_SIZE,
        }
    }
}

impl SessionConfig {
    /// Parse a session parameter string such as `deadline=500&buf=8192`.
    ///
    /// Recognized keys are `deadline` (milliseconds), `buf` (bytes) and
    /// `max_item` (bytes); the first occurrence of a key wins. Unknown keys are
    /// ignored; values that do not parse fall back to the default for that key.
    pub fn from_params(params: &str) -> Self {
        let pairs: Vec<(String, String)> = url::form_urlencoded::parse(params.as_bytes())
            .into_owned()
            .collect();
        let first = |name: &str| {
            pairs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
        };

        for (key, _) in &pairs {
            if !KNOWN_PARAMS.contains(&key.as_str()) {
                tracing::debug!("Ignoring unknown session parameter {:?}", key);
            }
        }

        let mut config = Self::default();

        if let Some(value) = first("deadline") {
            match value.parse::<u64>() {
                Ok(ms) if ms > 0 => config.deadline = Duration::from_millis(ms),
                _ => tracing::warn!("Ignoring invalid deadline {:?}, using default", value),
            }
        }

        if let Some(value) = first("buf") {
            match value.parse::<usize>() {
                Ok(size) if size >= MIN_BUFFER_SIZE => config.buffer_size = size,
                _ => tracing::warn!("Ignoring invalid buf {:?}, using default", value),
            }
        }

        if let Some(value) = first("max_item") {
            match value.parse::<usize>() {
                Ok(size) => config.max_item_size = size,
                _ => tracing::warn!("Ignoring invalid max_item {:?}, using default", value),
            }
        }

        config
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<()> {
        if self.deadline.is_zero() {
            return Err(WireError::Config("deadline must be non-zero".to_string()));
        }
        if self.buffer_size < MIN_BUFFER_SIZE {
            return Err(WireError::Config(format!(
                "buffer size {} is below the minimum of {}",
                self.buffer_size, MIN_BUFFER_SIZE
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the configuration before binding a listener
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(WireError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        self.session.validate()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the idle deadline (in milliseconds)
    pub fn deadline_ms(mut self, ms: u64) -> Self {
        self.config.session.deadline = Duration::from_millis(ms);
        self
    }

    /// Set the per-connection buffer size (in bytes)
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.session.buffer_size = size;
        self
    }

    /// Set the maximum item payload size (in bytes)
    pub fn max_item_size(mut self, size: usize) -> Self {
        self.config.session.max_item_size = size;
        self
    }

    /// Replace the session settings wholesale
    pub fn session(mut self, session: SessionConfig) -> Self {
        self.config.session = session;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
