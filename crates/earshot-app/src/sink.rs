//! Voice sink that only logs.
//!
//! Stands in for a voice-chat provider integration: every parameter is
//! written to the log and remembered so the current mix can be inspected.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use earshot_common::{ParticipantId, SinkError};
use earshot_proximity::{VoiceParameter, VoiceSink};
use tracing::{debug, info};

#[derive(Default)]
pub struct LogSink {
    applied: Mutex<HashMap<ParticipantId, VoiceParameter>>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Participants whose voice is currently away from the default.
    pub fn adjusted(&self) -> usize {
        self.applied.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Last non-reset parameter applied to `participant`.
    #[cfg(test)]
    pub fn current(&self, participant: &ParticipantId) -> Option<VoiceParameter> {
        let applied = self.applied.lock().unwrap_or_else(|e| e.into_inner());
        applied.get(participant).copied()
    }
}

#[async_trait]
impl VoiceSink for LogSink {
    async fn set_voice_parameter(
        &self,
        participant: &ParticipantId,
        parameter: VoiceParameter,
    ) -> Result<(), SinkError> {
        let mut applied = self.applied.lock().unwrap_or_else(|e| e.into_inner());
        match parameter {
            VoiceParameter::Reset => {
                applied.remove(participant);
                info!(participant = %participant, "Voice reset to default");
            }
            VoiceParameter::Volume(volume) => {
                applied.insert(participant.clone(), parameter);
                debug!(participant = %participant, volume, "Voice volume");
            }
            VoiceParameter::Pan { left, right } => {
                applied.insert(participant.clone(), parameter);
                debug!(participant = %participant, left, right, "Voice pan");
            }
        }
        Ok(())
    }
}
