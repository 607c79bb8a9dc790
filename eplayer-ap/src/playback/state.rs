//! Playback mode and speed rules

use serde::Serialize;
use std::fmt;

/// Fastest forward trick-play speed
pub const MAX_FORWARD_SPEED: i32 = 128;

/// Fastest backward trick-play speed
pub const MAX_BACKWARD_SPEED: i32 = -320;

/// Slow-motion repeat counts the output driver accepts
pub const SLOW_MOTION_REPEATS: [i32; 3] = [2, 4, 8];

/// The single active playback mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "mode")]
pub enum PlaybackMode {
    Stopped,
    Playing,
    Paused,
    Forwarding { speed: i32 },
    Backward { speed: i32 },
    SlowMotion { repeats: i32 },
}

impl PlaybackMode {
    /// True in every mode except `Stopped`
    pub fn is_active(&self) -> bool {
        !matches!(self, PlaybackMode::Stopped)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, PlaybackMode::Paused)
    }

    pub fn is_forwarding(&self) -> bool {
        matches!(self, PlaybackMode::Forwarding { .. })
    }

    pub fn is_backward(&self) -> bool {
        matches!(self, PlaybackMode::Backward { .. })
    }

    pub fn is_slow_motion(&self) -> bool {
        matches!(self, PlaybackMode::SlowMotion { .. })
    }

    /// True while a trick-play mode or pause is in effect
    pub fn is_trick_or_paused(&self) -> bool {
        matches!(
            self,
            PlaybackMode::Paused
                | PlaybackMode::Forwarding { .. }
                | PlaybackMode::Backward { .. }
                | PlaybackMode::SlowMotion { .. }
        )
    }

    /// Signed speed: 0 when stopped, 1 for normal play and pause
    pub fn speed(&self) -> i32 {
        match self {
            PlaybackMode::Stopped => 0,
            PlaybackMode::Playing | PlaybackMode::Paused => 1,
            PlaybackMode::Forwarding { speed } | PlaybackMode::Backward { speed } => *speed,
            PlaybackMode::SlowMotion { repeats } => *repeats,
        }
    }
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackMode::Stopped => write!(f, "stopped"),
            PlaybackMode::Playing => write!(f, "playing"),
            PlaybackMode::Paused => write!(f, "paused"),
            PlaybackMode::Forwarding { speed } => write!(f, "forwarding x{}", speed),
            PlaybackMode::Backward { speed } => write!(f, "backward x{}", speed),
            PlaybackMode::SlowMotion { repeats } => write!(f, "slowmotion /{}", repeats),
        }
    }
}

pub fn is_valid_forward_speed(speed: i32) -> bool {
    speed > 0 && speed <= MAX_FORWARD_SPEED
}

pub fn is_valid_backward_speed(speed: i32) -> bool {
    (MAX_BACKWARD_SPEED..=0).contains(&speed)
}

/// Map a requested repeat count to one the driver accepts, 0 otherwise
pub fn normalize_slow_motion(repeats: i32) -> i32 {
    if SLOW_MOTION_REPEATS.contains(&repeats) {
        repeats
    } else {
        0
    }
}
