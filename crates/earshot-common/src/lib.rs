pub mod errors;
pub mod events;
pub mod id;
pub mod types;

pub use errors::{ConfigError, EarshotError, ProtocolError, RelayError, SinkError};
pub use events::{PeerEvent, PositionFeed, PositionSubscription};
pub use id::{ConnectionId, ParticipantId, PARTICIPANT_ID_WIDTH};
pub use types::{AudioShape, Position};

pub type Result<T> = std::result::Result<T, EarshotError>;
