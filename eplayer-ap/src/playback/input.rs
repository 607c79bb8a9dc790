//! Input/demux collaborator interface and track bookkeeping

use crate::error::Result;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Elementary stream category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
    Subtitle,
    Teletext,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Video => write!(f, "video"),
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Subtitle => write!(f, "subtitle"),
            TrackKind::Teletext => write!(f, "teletext"),
        }
    }
}

/// One elementary stream discovered by the input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Track {
    pub kind: TrackKind,
    /// Program identifier
    pub pid: i32,
    pub title: String,
    pub language: String,
}

impl Track {
    pub fn new(kind: TrackKind, pid: i32) -> Self {
        Self {
            kind,
            pid,
            title: String::new(),
            language: String::new(),
        }
    }
}

/// Chapter marker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chapter {
    /// Start time in seconds
    pub start: f64,
    pub title: String,
}

/// Per-kind track lists, filled by the input during discovery
#[derive(Debug, Default)]
pub struct TrackManager {
    tracks: Mutex<HashMap<TrackKind, Vec<Track>>>,
}

impl TrackManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a track; a track with the same kind and pid is replaced
    pub fn add_track(&self, track: Track) {
        let mut tracks = self.tracks.lock();
        let list = tracks.entry(track.kind).or_default();
        match list.iter_mut().find(|t| t.pid == track.pid) {
            Some(existing) => *existing = track,
            None => list.push(track),
        }
    }

    pub fn clear_tracks(&self) {
        self.tracks.lock().clear();
    }

    pub fn get_track(&self, kind: TrackKind, pid: i32) -> Option<Track> {
        self.tracks
            .lock()
            .get(&kind)
            .and_then(|list| list.iter().find(|t| t.pid == pid).cloned())
    }

    pub fn tracks(&self, kind: TrackKind) -> Vec<Track> {
        self.tracks.lock().get(&kind).cloned().unwrap_or_default()
    }
}

/// Cooperative abort flag shared with the input loop
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Container input and demuxer driven by the player
pub trait Input: Send + Sync {
    /// Prepare `url` for playback
    fn init(&self, url: &str, no_probe: bool) -> Result<()>;

    /// Run the input-consumption loop until end of stream, [`Input::stop`]
    /// or an abort request. Blocks the playback thread.
    fn play(&self, abort: &AbortSignal);

    /// Make a running [`Input::play`] return
    fn stop(&self);

    fn seek(&self, pos: f32, absolute: bool) -> Result<()>;

    /// Duration in seconds
    fn get_duration(&self) -> Option<f64>;

    /// Metadata as key/value pairs
    fn get_metadata(&self) -> Option<Vec<(String, String)>>;

    /// Refresh track (and chapter) information from the container
    fn update_tracks(&self);

    /// Switch the active track of `kind`; `None` disables it
    fn switch_track(&self, kind: TrackKind, track: Option<&Track>) -> Result<()>;

    /// Currently active track of `kind`
    fn current_track(&self, kind: TrackKind) -> Option<Track>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_manager_lookup() {
        let manager = TrackManager::new();
        manager.add_track(Track::new(TrackKind::Audio, 101));
        manager.add_track(Track::new(TrackKind::Audio, 102));
        manager.add_track(Track::new(TrackKind::Video, 100));

        assert_eq!(manager.tracks(TrackKind::Audio).len(), 2);
        assert_eq!(manager.get_track(TrackKind::Video, 100).unwrap().pid, 100);
        assert!(manager.get_track(TrackKind::Video, 101).is_none());
        assert!(manager.tracks(TrackKind::Teletext).is_empty());
    }

    #[test]
    fn test_add_track_replaces_same_pid() {
        let manager = TrackManager::new();
        manager.add_track(Track::new(TrackKind::Subtitle, 7));
        let mut renamed = Track::new(TrackKind::Subtitle, 7);
        renamed.title = "English".to_string();
        manager.add_track(renamed);

        let tracks = manager.tracks(TrackKind::Subtitle);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title, "English");
    }

    #[test]
    fn test_clear_tracks() {
        let manager = TrackManager::new();
        manager.add_track(Track::new(TrackKind::Audio, 1));
        manager.clear_tracks();
        assert!(manager.tracks(TrackKind::Audio).is_empty());
    }

    #[test]
    fn test_abort_signal_shared() {
        let signal = AbortSignal::new();
        let clone = signal.clone();
        clone.request();
        assert!(signal.is_requested());
        signal.clear();
        assert!(!clone.is_requested());
    }
}
