use std::fmt;
use std::time::Duration;

/// Configuration for a [`RelaySession`](super::RelaySession).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Hub URL, e.g. `ws://127.0.0.1:8970`. See [`normalize_hub_url`].
    pub hub_url: String,
    /// Upper bound on each connection attempt.
    pub connect_timeout: Duration,
    /// Retry after a lost or failed connection instead of closing.
    pub reconnect: bool,
    /// First retry delay; doubles after every failed attempt.
    pub reconnect_delay: Duration,
    pub max_reconnect_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            hub_url: "ws://127.0.0.1:8970".into(),
            connect_timeout: Duration::from_secs(10),
            reconnect: true,
            reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(30),
        }
    }
}

impl SessionConfig {
    pub fn new(hub_url: &str) -> Self {
        Self {
            hub_url: normalize_hub_url(hub_url),
            ..Self::default()
        }
    }

    /// Delay to use after `current` fails.
    pub(crate) fn next_delay(&self, current: Duration) -> Duration {
        (current * 2).min(self.max_reconnect_delay)
    }
}

/// Client-side connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Dialing the hub (first attempt or a retry).
    Connecting,
    /// Transport is up; `Identify` is about to go out.
    Connected,
    /// Identified; traffic flows both ways.
    Streaming,
    /// Terminal.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Streaming => "streaming",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Accept either a full `ws://`/`wss://` URL or a bare `host:port`.
pub fn normalize_hub_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.starts_with("ws://") || trimmed.starts_with("wss://") {
        trimmed.to_string()
    } else {
        format!("ws://{trimmed}")
    }
}
