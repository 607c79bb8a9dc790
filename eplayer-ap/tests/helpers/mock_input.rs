//! Scripted input collaborator

use eplayer_ap::playback::{AbortSignal, Input, Track, TrackKind};
use eplayer_ap::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Default)]
struct Flags {
    stop_requested: bool,
    end_of_stream: bool,
}

/// Input whose `play` blocks until `stop`, an abort request or
/// [`ScriptedInput::end_of_stream`]
#[derive(Default)]
pub struct ScriptedInput {
    flags: Mutex<Flags>,
    wake: Condvar,
    current: Mutex<HashMap<TrackKind, Track>>,
    fail_init: bool,
    pub inits: Mutex<Vec<(String, bool)>>,
    pub play_threads: Mutex<Vec<Option<String>>>,
    pub stop_calls: Mutex<usize>,
    pub seeks: Mutex<Vec<(f32, bool)>>,
    pub switches: Mutex<Vec<(TrackKind, Option<i32>)>>,
    pub update_calls: Mutex<usize>,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Input with an active video track (pid 100)
    pub fn with_video() -> Self {
        let input = Self::new();
        input.set_current(Track::new(TrackKind::Video, 100));
        input
    }

    pub fn failing_init() -> Self {
        Self {
            fail_init: true,
            ..Self::default()
        }
    }

    pub fn set_current(&self, track: Track) {
        self.current.lock().insert(track.kind, track);
    }

    /// Let a running `play` return as if the stream ended
    pub fn end_of_stream(&self) {
        self.flags.lock().end_of_stream = true;
        self.wake.notify_all();
    }
}

impl Input for ScriptedInput {
    fn init(&self, url: &str, no_probe: bool) -> Result<()> {
        self.inits.lock().push((url.to_string(), no_probe));
        if self.fail_init {
            return Err(Error::InvalidCall(format!("cannot open {}", url)));
        }
        *self.flags.lock() = Flags::default();
        Ok(())
    }

    fn play(&self, abort: &AbortSignal) {
        self.play_threads
            .lock()
            .push(std::thread::current().name().map(str::to_string));

        let mut flags = self.flags.lock();
        while !flags.stop_requested && !flags.end_of_stream && !abort.is_requested() {
            self.wake.wait_for(&mut flags, Duration::from_millis(10));
        }
    }

    fn stop(&self) {
        *self.stop_calls.lock() += 1;
        self.flags.lock().stop_requested = true;
        self.wake.notify_all();
    }

    fn seek(&self, pos: f32, absolute: bool) -> Result<()> {
        self.seeks.lock().push((pos, absolute));
        Ok(())
    }

    fn get_duration(&self) -> Option<f64> {
        Some(120.5)
    }

    fn get_metadata(&self) -> Option<Vec<(String, String)>> {
        Some(vec![("title".to_string(), "Test Clip".to_string())])
    }

    fn update_tracks(&self) {
        *self.update_calls.lock() += 1;
    }

    fn switch_track(&self, kind: TrackKind, track: Option<&Track>) -> Result<()> {
        self.switches.lock().push((kind, track.map(|t| t.pid)));
        match track {
            Some(track) => {
                self.set_current(track.clone());
                Ok(())
            }
            None => Err(Error::InvalidCall(format!("no such {} track", kind))),
        }
    }

    fn current_track(&self, kind: TrackKind) -> Option<Track> {
        self.current.lock().get(&kind).cloned()
    }
}
