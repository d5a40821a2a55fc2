use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ProtocolError;

/// Width of a participant id on the wire.
pub const PARTICIPANT_ID_WIDTH: usize = 18;

const PAD_BYTE: u8 = 0x00;

/// Hub-local handle for one accepted transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// First eight hex digits, for log lines.
    pub fn short(&self) -> String {
        let bytes = self.0.as_bytes();
        format!(
            "{:02x}{:02x}{:02x}{:02x}",
            bytes[0], bytes[1], bytes[2], bytes[3]
        )
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Provider-assigned identifier of a participant.
///
/// Always non-empty, at most [`PARTICIPANT_ID_WIDTH`] bytes, and free of the
/// `0x00` pad byte, so every value survives the fixed-width wire encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Result<Self, ProtocolError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ProtocolError::InvalidParticipantId("empty id".into()));
        }
        if id.len() > PARTICIPANT_ID_WIDTH {
            return Err(ProtocolError::InvalidParticipantId(format!(
                "{id:?} is {} bytes, limit is {PARTICIPANT_ID_WIDTH}",
                id.len()
            )));
        }
        if id.as_bytes().contains(&PAD_BYTE) {
            return Err(ProtocolError::InvalidParticipantId(format!(
                "{id:?} contains a NUL byte"
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Encode as exactly [`PARTICIPANT_ID_WIDTH`] bytes, padded with `0x00`.
    pub fn to_fixed_width(&self) -> [u8; PARTICIPANT_ID_WIDTH] {
        let mut buf = [PAD_BYTE; PARTICIPANT_ID_WIDTH];
        let bytes = self.0.as_bytes();
        buf[..bytes.len()].copy_from_slice(bytes);
        buf
    }

    /// Decode a wire id. Trailing pad bytes are stripped, so this accepts both
    /// the fixed-width form and the unpadded form carried by `Disconnect`.
    pub fn from_wire(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let end = bytes
            .iter()
            .rposition(|&b| b != PAD_BYTE)
            .map_or(0, |i| i + 1);
        let text = std::str::from_utf8(&bytes[..end])
            .map_err(|e| ProtocolError::InvalidParticipantId(format!("not utf-8: {e}")))?;
        Self::new(text)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ParticipantId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ParticipantId> for String {
    fn from(id: ParticipantId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn connection_ids_are_unique() {
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn connection_id_short_is_hex() {
        let short = ConnectionId::new().short();
        assert_eq!(short.len(), 8);
        assert!(short.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn snowflake_encodes_to_fixed_width() {
        let id = ParticipantId::new("123456789012345678").unwrap();
        let wire = id.to_fixed_width();
        assert_eq!(wire.len(), PARTICIPANT_ID_WIDTH);
        assert_eq!(&wire[..], b"123456789012345678");
    }

    #[test]
    fn short_id_is_padded_with_nul() {
        let id = ParticipantId::new("alice").unwrap();
        let wire = id.to_fixed_width();
        assert_eq!(&wire[..5], b"alice");
        assert!(wire[5..].iter().all(|&b| b == 0));
    }

    #[test]
    fn from_wire_accepts_unpadded_bytes() {
        let id = ParticipantId::from_wire(b"bob").unwrap();
        assert_eq!(id.as_str(), "bob");
    }

    #[test]
    fn rejects_empty_and_oversized_ids() {
        assert!(ParticipantId::new("").is_err());
        assert!(ParticipantId::new("1234567890123456789").is_err());
        assert!(ParticipantId::from_wire(&[0u8; PARTICIPANT_ID_WIDTH]).is_err());
    }

    #[test]
    fn rejects_embedded_nul() {
        assert!(ParticipantId::new("ab\0cd").is_err());
    }

    #[test]
    fn rejects_invalid_utf8() {
        let err = ParticipantId::from_wire(&[0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidParticipantId(_)));
    }

    #[test]
    fn serde_goes_through_validation() {
        let id: ParticipantId = serde_json::from_str("\"carol\"").unwrap();
        assert_eq!(id.as_str(), "carol");
        assert!(serde_json::from_str::<ParticipantId>("\"\"").is_err());
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"carol\"");
    }

    proptest! {
        #[test]
        fn fixed_width_round_trip(raw in "[a-zA-Z0-9_.-]{1,18}") {
            let id = ParticipantId::new(raw.clone()).unwrap();
            let wire = id.to_fixed_width();
            prop_assert_eq!(wire.len(), PARTICIPANT_ID_WIDTH);
            let decoded = ParticipantId::from_wire(&wire).unwrap();
            prop_assert_eq!(decoded.as_str(), raw.as_str());
        }

        #[test]
        fn fixed_width_round_trip_multibyte(raw in "[^\\x00]{1,4}") {
            let id = ParticipantId::new(raw.clone()).unwrap();
            let decoded = ParticipantId::from_wire(&id.to_fixed_width()).unwrap();
            prop_assert_eq!(decoded, id);
        }
    }
}
