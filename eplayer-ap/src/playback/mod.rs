//! Playback control: state machine, collaborator interfaces and the
//! playback thread

pub mod input;
pub mod output;
pub mod player;
pub mod state;
pub mod url;

pub use input::{AbortSignal, Chapter, Input, Track, TrackKind, TrackManager};
pub use output::{OutputCommand, OutputSink};
pub use player::Player;
pub use state::PlaybackMode;
pub use url::StreamUrl;
