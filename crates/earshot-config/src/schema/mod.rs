//! Configuration schema types for earshot.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod audio;
mod identity;
mod network;
mod system;

pub use audio::*;
pub use identity::*;
pub use network::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Root configuration.
///
/// Every option has a default; a config file only needs what it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct EarshotConfig {
    pub identity: IdentityConfig,
    pub hub: HubSection,
    pub session: SessionSection,
    pub proximity: ProximityConfig,
    pub position_source: PositionSourceConfig,
    pub logging: LoggingConfig,
}

// =============================================================================
// Tests
// =============================================================================
