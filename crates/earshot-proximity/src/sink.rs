use async_trait::async_trait;
use earshot_common::{ParticipantId, SinkError};

use crate::proximity::Pan;

/// What to apply to one remote participant's voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VoiceParameter {
    /// Scalar gain in `[0, 1]`.
    Volume(f64),
    /// Per-channel gain in `[0, 1]`.
    Pan { left: f64, right: f64 },
    /// Restore the provider's default for this participant.
    Reset,
}

impl From<Pan> for VoiceParameter {
    fn from(pan: Pan) -> Self {
        Self::Pan {
            left: pan.left,
            right: pan.right,
        }
    }
}

/// A voice-chat provider that can adjust how loud each participant is.
#[async_trait]
pub trait VoiceSink: Send + Sync {
    async fn set_voice_parameter(
        &self,
        participant: &ParticipantId,
        parameter: VoiceParameter,
    ) -> Result<(), SinkError>;
}
