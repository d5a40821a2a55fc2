use serde::{Deserialize, Serialize};
use std::fmt;

/// A participant's location. Participants on different surfaces never hear
/// each other, whatever their `x`/`y`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub surface: i32,
}

impl Position {
    pub fn new(x: f64, y: f64, surface: i32) -> Self {
        Self { x, y, surface }
    }

    /// Squared planar distance, ignoring the surface.
    pub fn distance_squared(&self, other: &Position) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }

    pub fn same_surface(&self, other: &Position) -> bool {
        self.surface == other.surface
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}) on surface {}", self.x, self.y, self.surface)
    }
}

/// Shape of the audio parameter pushed to the voice sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioShape {
    /// One scalar gain per peer.
    #[default]
    Volume,
    /// Independent left/right channel gains per peer.
    Stereo,
}
