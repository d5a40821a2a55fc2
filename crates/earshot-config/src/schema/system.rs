use serde::{Deserialize, Serialize};

/// Log level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
#[derive(Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// The matching `tracing` filter level.
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error => "error",
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// Log every relayed position, ping and voice parameter.
    pub verbose: bool,
}

impl LoggingConfig {
    /// `EnvFilter` directive for the earshot crates.
    pub fn filter_directive(&self) -> String {
        let level = if self.verbose {
            "debug"
        } else {
            self.level.as_filter()
        };
        ["earshot", "earshot_relay", "earshot_proximity", "earshot_config"]
            .iter()
            .map(|target| format!("{target}={level}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}
