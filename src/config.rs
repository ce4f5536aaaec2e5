//! Relay configuration
//!
//! Every setting has a default and can be overridden through a
//! `WHITEBOARD_*` environment variable.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Default participant (WebSocket) listen address
pub const DEFAULT_WS_ADDR: &str = "127.0.0.1:8080";

/// Default HTTP listen address (peer ingress and static assets)
pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8081";

/// Relay configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the participant listener binds to
    pub ws_addr: String,
    /// Address the HTTP listener binds to
    pub http_addr: String,
    /// Push URLs of the peer pool, e.g. `http://10.132.0.7:8081/su`
    pub peers: Vec<String>,
    /// Upper bound for a single peer push
    pub push_timeout: Duration,
    /// A drawing is replicated only while its hop counter is below this
    pub max_hops: u8,
    /// Capacity of the dispatcher intake queue
    pub queue_capacity: usize,
    /// Capacity of each client's outbound buffer
    pub client_buffer: usize,
    /// Directory served as static assets, if any
    pub static_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ws_addr: DEFAULT_WS_ADDR.to_string(),
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            peers: Vec::new(),
            push_timeout: Duration::from_secs(5),
            max_hops: 1,
            queue_capacity: 256,
            client_buffer: 256,
            static_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("WHITEBOARD_WS_ADDR") {
            config.ws_addr = addr;
        }
        if let Some(addr) = lookup("WHITEBOARD_HTTP_ADDR") {
            config.http_addr = addr;
        }
        if let Some(peers) = lookup("WHITEBOARD_PEERS") {
            config.peers = parse_peers(&peers);
        }
        if let Some(ms) = lookup("WHITEBOARD_PUSH_TIMEOUT_MS") {
            config.push_timeout =
                Duration::from_millis(parse_value("WHITEBOARD_PUSH_TIMEOUT_MS", &ms)?);
        }
        if let Some(hops) = lookup("WHITEBOARD_MAX_HOPS") {
            config.max_hops = parse_value("WHITEBOARD_MAX_HOPS", &hops)?;
        }
        if let Some(capacity) = lookup("WHITEBOARD_QUEUE_CAPACITY") {
            config.queue_capacity = parse_value("WHITEBOARD_QUEUE_CAPACITY", &capacity)?;
        }
        if let Some(capacity) = lookup("WHITEBOARD_CLIENT_BUFFER") {
            config.client_buffer = parse_value("WHITEBOARD_CLIENT_BUFFER", &capacity)?;
        }
        if let Some(dir) = lookup("WHITEBOARD_STATIC_DIR") {
            config.static_dir = Some(PathBuf::from(dir));
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::Zero("queue_capacity"));
        }
        if self.client_buffer == 0 {
            return Err(ConfigError::Zero("client_buffer"));
        }
        if self.push_timeout.is_zero() {
            return Err(ConfigError::Zero("push_timeout"));
        }
        Ok(())
    }
}

fn parse_peers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|peer| !peer.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_value<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: value.to_string(),
    })
}
