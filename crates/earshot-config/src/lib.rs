//! earshot configuration.
//!
//! TOML-based configuration with validation. Every section has defaults, so
//! partial files work out of the box.
//!
//! ```rust,no_run
//! use earshot_config::{config_to_json, load_config};
//!
//! let config = load_config(None).expect("failed to load config");
//! println!("{}", config_to_json(&config));
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{EarshotConfig, LogLevel, POSITION_FILE_NAME};
pub use toml_loader::{default_config_path, load_default, load_from_path};

use earshot_common::ConfigError;
use std::path::Path;

/// Load config from `path`, or from the platform default path (created on
/// first use) when `path` is `None`.
pub fn load_config(path: Option<&Path>) -> Result<EarshotConfig, ConfigError> {
    match path {
        Some(path) => toml_loader::load_from_path(path),
        None => toml_loader::load_default(),
    }
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &EarshotConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
