//! Proximity voice: distance-to-audio mapping and the dispatcher that feeds
//! it to a voice-chat sink.
//!
//! - [`proximity`]: the falloff model, scalar and stereo
//! - [`sink`]: the [`VoiceSink`] capability a voice provider implements
//! - [`dispatcher`]: tracks remote peers and pushes parameters to the sink

pub mod dispatcher;
pub mod proximity;
pub mod sink;

pub use dispatcher::ProximityDispatcher;
pub use proximity::{pan, proximity, voice_parameter, Pan, EAR_OFFSET, FALLOFF_RADIUS};
pub use sink::{VoiceParameter, VoiceSink};
