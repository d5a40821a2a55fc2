//! Translate the file config into runtime settings for the relay.

use std::time::Duration;

use earshot_config::schema::{HubSection, SessionSection};
use earshot_relay::{normalize_hub_url, HubConfig, SessionConfig};

pub fn hub_config(section: &HubSection, port: Option<u16>) -> HubConfig {
    let mut section = section.clone();
    if let Some(port) = port {
        section.port = port;
    }
    HubConfig {
        bind_address: section.listen_address(),
        ping_interval: secs(section.ping_interval),
        ..HubConfig::default()
    }
}

pub fn session_config(section: &SessionSection, hub_url: &str) -> SessionConfig {
    SessionConfig {
        hub_url: normalize_hub_url(hub_url),
        connect_timeout: secs(section.connect_timeout),
        reconnect: section.reconnect,
        reconnect_delay: secs(section.reconnect_delay),
        max_reconnect_delay: secs(section.max_reconnect_delay),
    }
}

/// The local session of a host always dials its own hub over loopback.
pub fn loopback_url(port: u16) -> String {
    format!("ws://127.0.0.1:{port}")
}

fn secs(value: u32) -> Duration {
    Duration::from_secs(u64::from(value.max(1)))
}
