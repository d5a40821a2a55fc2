//! Relay wire protocol.
//!
//! A frame is one opcode byte followed by the payload. The payload length is
//! implied by the WebSocket message boundary. Numbers are little-endian,
//! floats are IEEE-754, participant ids are 18 bytes padded with `0x00`
//! except in `Disconnect`, which carries the unpadded id as the rest of the
//! frame.

use earshot_common::{ParticipantId, Position, ProtocolError, PARTICIPANT_ID_WIDTH};

/// `x: f64, y: f64, surface: i32`.
pub const POSITION_LEN: usize = 8 + 8 + 4;

/// One `InitPlayers` record: id followed by position.
pub const PEER_RECORD_LEN: usize = PARTICIPANT_ID_WIDTH + POSITION_LEN;

// ---------------------------------------------------------------------------
// Raw frames
// ---------------------------------------------------------------------------

/// Prefix `payload` with `opcode`.
pub fn encode_frame(opcode: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(1 + payload.len());
    frame.push(opcode);
    frame.extend_from_slice(payload);
    frame
}

/// Split a frame into opcode and payload.
pub fn decode_frame(frame: &[u8]) -> Result<(u8, &[u8]), ProtocolError> {
    match frame.split_first() {
        Some((&opcode, payload)) => Ok((opcode, payload)),
        None => Err(ProtocolError::EmptyFrame),
    }
}

// ---------------------------------------------------------------------------
// Opcodes
// ---------------------------------------------------------------------------

/// Opcodes a session sends to the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClientOpcode {
    Identify = 0,
    Update = 1,
    Pong = 2,
}

impl TryFrom<u8> for ClientOpcode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Identify),
            1 => Ok(Self::Update),
            2 => Ok(Self::Pong),
            other => Err(ProtocolError::UnknownOpcode(other)),
        }
    }
}

/// Opcodes the hub sends to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HubOpcode {
    Ping = 200,
    InitPlayers = 201,
    Position = 202,
    Disconnect = 203,
}

impl TryFrom<u8> for HubOpcode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            200 => Ok(Self::Ping),
            201 => Ok(Self::InitPlayers),
            202 => Ok(Self::Position),
            203 => Ok(Self::Disconnect),
            other => Err(ProtocolError::UnknownOpcode(other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Session → hub.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Identify(ParticipantId),
    Update(Position),
    Pong,
}

impl ClientMessage {
    pub fn opcode(&self) -> ClientOpcode {
        match self {
            Self::Identify(_) => ClientOpcode::Identify,
            Self::Update(_) => ClientOpcode::Update,
            Self::Pong => ClientOpcode::Pong,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let opcode = self.opcode() as u8;
        match self {
            Self::Identify(id) => encode_frame(opcode, &id.to_fixed_width()),
            Self::Update(position) => {
                let mut frame = Vec::with_capacity(1 + POSITION_LEN);
                frame.push(opcode);
                put_position(&mut frame, position);
                frame
            }
            Self::Pong => vec![opcode],
        }
    }

    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let (raw, payload) = decode_frame(frame)?;
        match ClientOpcode::try_from(raw)? {
            ClientOpcode::Identify => {
                expect_len(raw, payload, PARTICIPANT_ID_WIDTH)?;
                Ok(Self::Identify(ParticipantId::from_wire(payload)?))
            }
            ClientOpcode::Update => {
                expect_len(raw, payload, POSITION_LEN)?;
                Ok(Self::Update(read_position(payload)))
            }
            ClientOpcode::Pong => {
                expect_len(raw, payload, 0)?;
                Ok(Self::Pong)
            }
        }
    }
}

/// Hub → session.
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    Ping,
    /// Every other identified peer with a known position.
    InitPlayers(Vec<(ParticipantId, Position)>),
    Position {
        participant: ParticipantId,
        position: Position,
    },
    Disconnect(ParticipantId),
}

impl HubMessage {
    pub fn opcode(&self) -> HubOpcode {
        match self {
            Self::Ping => HubOpcode::Ping,
            Self::InitPlayers(_) => HubOpcode::InitPlayers,
            Self::Position { .. } => HubOpcode::Position,
            Self::Disconnect(_) => HubOpcode::Disconnect,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let opcode = self.opcode() as u8;
        match self {
            Self::Ping => vec![opcode],
            Self::InitPlayers(peers) => {
                let mut frame = Vec::with_capacity(1 + peers.len() * PEER_RECORD_LEN);
                frame.push(opcode);
                for (participant, position) in peers {
                    frame.extend_from_slice(&participant.to_fixed_width());
                    put_position(&mut frame, position);
                }
                frame
            }
            Self::Position {
                participant,
                position,
            } => {
                let mut frame = Vec::with_capacity(1 + POSITION_LEN + PARTICIPANT_ID_WIDTH);
                frame.push(opcode);
                put_position(&mut frame, position);
                frame.extend_from_slice(&participant.to_fixed_width());
                frame
            }
            Self::Disconnect(participant) => {
                encode_frame(opcode, participant.as_str().as_bytes())
            }
        }
    }

    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let (raw, payload) = decode_frame(frame)?;
        match HubOpcode::try_from(raw)? {
            HubOpcode::Ping => {
                expect_len(raw, payload, 0)?;
                Ok(Self::Ping)
            }
            HubOpcode::InitPlayers => {
                if payload.len() % PEER_RECORD_LEN != 0 {
                    return Err(ProtocolError::RaggedRecords {
                        opcode: raw,
                        record: PEER_RECORD_LEN,
                        actual: payload.len(),
                    });
                }
                let peers = payload
                    .chunks_exact(PEER_RECORD_LEN)
                    .map(|record| {
                        let (id, position) = record.split_at(PARTICIPANT_ID_WIDTH);
                        Ok((ParticipantId::from_wire(id)?, read_position(position)))
                    })
                    .collect::<Result<Vec<_>, ProtocolError>>()?;
                Ok(Self::InitPlayers(peers))
            }
            HubOpcode::Position => {
                expect_len(raw, payload, POSITION_LEN + PARTICIPANT_ID_WIDTH)?;
                let (position, id) = payload.split_at(POSITION_LEN);
                Ok(Self::Position {
                    participant: ParticipantId::from_wire(id)?,
                    position: read_position(position),
                })
            }
            HubOpcode::Disconnect => Ok(Self::Disconnect(ParticipantId::from_wire(payload)?)),
        }
    }
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn expect_len(opcode: u8, payload: &[u8], expected: usize) -> Result<(), ProtocolError> {
    if payload.len() != expected {
        return Err(ProtocolError::PayloadLength {
            opcode,
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}

fn put_position(buf: &mut Vec<u8>, position: &Position) {
    buf.extend_from_slice(&position.x.to_le_bytes());
    buf.extend_from_slice(&position.y.to_le_bytes());
    buf.extend_from_slice(&position.surface.to_le_bytes());
}

/// `bytes` must be exactly [`POSITION_LEN`] long; callers check this first.
fn read_position(bytes: &[u8]) -> Position {
    let mut x = [0u8; 8];
    let mut y = [0u8; 8];
    let mut surface = [0u8; 4];
    x.copy_from_slice(&bytes[0..8]);
    y.copy_from_slice(&bytes[8..16]);
    surface.copy_from_slice(&bytes[16..20]);
    Position {
        x: f64::from_le_bytes(x),
        y: f64::from_le_bytes(y),
        surface: i32::from_le_bytes(surface),
    }
}
