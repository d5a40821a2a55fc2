//! Audio output and position input configuration.

use std::path::PathBuf;

use earshot_common::AudioShape;
use serde::{Deserialize, Serialize};

/// Name of the file the game mod writes the player's position to.
pub const POSITION_FILE_NAME: &str = "fdpa-comm";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProximityConfig {
    pub audio_shape: AudioShape,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PositionSourceConfig {
    /// Path of the position file. Empty selects the game's script-output
    /// directory under the platform config dir.
    pub path: String,
}

impl PositionSourceConfig {
    /// The configured path, or the default location when unset.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        if !self.path.is_empty() {
            return Some(PathBuf::from(&self.path));
        }
        dirs::config_dir().map(|dir| {
            dir.join("Factorio")
                .join("script-output")
                .join(POSITION_FILE_NAME)
        })
    }
}
