//! Distance-to-audibility model.
//!
//! Audibility falls off linearly in the *squared* distance: `1 - d²/R²`
//! inside the radius, `0` at and beyond it. Positions on different surfaces
//! never hear each other.

use earshot_common::{AudioShape, Position};

use crate::sink::VoiceParameter;

/// Distance at which a peer becomes inaudible.
pub const FALLOFF_RADIUS: f64 = 100.0;

pub const FALLOFF_RADIUS_SQUARED: f64 = FALLOFF_RADIUS * FALLOFF_RADIUS;

/// Horizontal offset of each ear from the listener, for stereo pan.
pub const EAR_OFFSET: f64 = 0.5;

/// Per-channel audibility.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pan {
    pub left: f64,
    pub right: f64,
}

/// How audible `other` is to `local`, in `[0, 1]`.
pub fn proximity(local: &Position, other: &Position) -> f64 {
    if !local.same_surface(other) {
        return 0.0;
    }
    falloff(local.distance_squared(other))
}

/// Stereo variant of [`proximity`]: `other` is shifted by [`EAR_OFFSET`]
/// to the left and right before applying the same falloff.
pub fn pan(local: &Position, other: &Position) -> Pan {
    if !local.same_surface(other) {
        return Pan {
            left: 0.0,
            right: 0.0,
        };
    }
    let left = Position::new(other.x - EAR_OFFSET, other.y, other.surface);
    let right = Position::new(other.x + EAR_OFFSET, other.y, other.surface);
    Pan {
        left: falloff(local.distance_squared(&left)),
        right: falloff(local.distance_squared(&right)),
    }
}

/// The parameter a sink of the given `shape` should receive.
pub fn voice_parameter(shape: AudioShape, local: &Position, other: &Position) -> VoiceParameter {
    match shape {
        AudioShape::Volume => VoiceParameter::Volume(proximity(local, other)),
        AudioShape::Stereo => pan(local, other).into(),
    }
}

fn falloff(distance_squared: f64) -> f64 {
    // A NaN distance fails the comparison and lands on 0.
    if distance_squared <= FALLOFF_RADIUS_SQUARED {
        1.0 - distance_squared / FALLOFF_RADIUS_SQUARED
    } else {
        0.0
    }
}
