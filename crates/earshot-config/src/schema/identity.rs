use serde::{Deserialize, Serialize};

/// Who the local participant is to the relay.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IdentityConfig {
    /// Provider-assigned id, at most 18 bytes. Empty means "not configured".
    pub participant_id: String,
}
