//! # eplayer Audio/Playback Library (eplayer-ap)
//!
//! Audio reframing and playback-control engine for an embedded media player.
//!
//! **Audio path:** raw PCM (or compressed audio decoded with symphonia and
//! resampled with rubato) is cut into LPCM sub-frames, wrapped in a private
//! stream header and a PES envelope, and written to the hardware decoder's
//! descriptor.
//!
//! **Playback control:** a single-mode state machine drives the output sink
//! and one playback thread per session.

pub mod audio;
pub mod error;
pub mod playback;

pub use error::{Error, Result};
