//! Core TOML config loading: read from path or platform default.

use crate::schema::EarshotConfig;
use crate::validation;
use earshot_common::ConfigError;
use std::path::Path;
use tracing::{info, warn};

use super::paths::{create_default_config, default_config_path};

/// Load config from a specific TOML file path.
///
/// Missing fields take their serde defaults. A config that fails validation
/// is still returned; the problem is logged as a warning.
pub fn load_from_path(path: &Path) -> Result<EarshotConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ParseError(format!("failed to read {}: {e}", path.display())))?;

    let config: EarshotConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    if let Err(e) = validation::validate(&config) {
        warn!(error = %e, "config has invalid values");
    }

    info!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Load config from the platform-specific default path.
///
/// On Linux: `~/.config/earshot/config.toml`
/// On macOS: `~/Library/Application Support/earshot/config.toml`
///
/// If the file does not exist, writes the commented default and returns defaults.
pub fn load_default() -> Result<EarshotConfig, ConfigError> {
    let path = default_config_path()?;

    match load_from_path(&path) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(_)) => {
            info!(path = %path.display(), "no config found, creating default");
            create_default_config(&path)?;
            Ok(EarshotConfig::default())
        }
        Err(e) => Err(e),
    }
}
