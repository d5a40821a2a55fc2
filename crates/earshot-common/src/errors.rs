use std::path::PathBuf;
use std::time::Duration;

/// A frame that does not match the relay wire format.
///
/// Always fatal to the connection that produced it, never to the process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("empty frame")]
    EmptyFrame,

    #[error("unknown opcode {0}")]
    UnknownOpcode(u8),

    #[error("opcode {opcode}: expected {expected} payload bytes, got {actual}")]
    PayloadLength {
        opcode: u8,
        expected: usize,
        actual: usize,
    },

    #[error("opcode {opcode}: {actual} payload bytes is not a whole number of {record}-byte records")]
    RaggedRecords {
        opcode: u8,
        record: usize,
        actual: usize,
    },

    #[error("invalid participant id: {0}")]
    InvalidParticipantId(String),

    #[error("unexpected text frame on binary channel")]
    UnexpectedText,
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("failed to bind listener: {0}")]
    Bind(String),

    #[error("failed to connect: {0}")]
    Connect(String),

    #[error("connection attempt timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("voice sink unavailable: {0}")]
    Unavailable(String),

    #[error("voice sink rejected parameter for {participant}: {reason}")]
    Rejected { participant: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EarshotError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("position source error: {0}")]
    PositionSource(String),

    #[error("{0}")]
    Other(String),
}
