//! Relay network configuration: the hub role and the session role.

use serde::{Deserialize, Serialize};

/// Settings used when this process hosts the hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubSection {
    pub bind_address: String,
    /// Listening port (valid range: 1024-65535).
    pub port: u16,
    /// Seconds between liveness pings (valid range: 5-120).
    pub ping_interval: u32,
}

impl Default for HubSection {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".into(),
            port: 8970,
            ping_interval: 15,
        }
    }
}

impl HubSection {
    /// `bind_address:port`, ready for a listener.
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Settings for the client connection to a hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub hub_url: String,
    /// Seconds (valid range: 1-60).
    pub connect_timeout: u32,
    pub reconnect: bool,
    /// Initial retry delay in seconds (valid range: 1-60).
    pub reconnect_delay: u32,
    /// Backoff cap in seconds (valid range: 1-600).
    pub max_reconnect_delay: u32,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            hub_url: "ws://127.0.0.1:8970".into(),
            connect_timeout: 10,
            reconnect: true,
            reconnect_delay: 1,
            max_reconnect_delay: 30,
        }
    }
}
