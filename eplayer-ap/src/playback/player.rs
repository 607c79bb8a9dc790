//! Player: playback state machine and playback thread
//!
//! Control operations may arrive from any thread. Each one holds the control
//! lock for its whole duration, so transitions never interleave. The mode
//! itself sits behind a separate short-lived lock so queries do not wait on
//! output-sink calls.
//!
//! The playback thread is spawned by the first successful [`Player::play`]
//! of a session. It runs [`Input::play`] until end of stream, stop or
//! abort, then clears the running flag and stops the session itself.
//! [`Player::stop`] blocks on a condition variable until that flag clears.

use crate::error::Error;
use crate::playback::input::{AbortSignal, Chapter, Input, Track, TrackKind, TrackManager};
use crate::playback::output::OutputSink;
use crate::playback::state::{
    is_valid_backward_speed, is_valid_forward_speed, normalize_slow_motion, PlaybackMode,
    MAX_BACKWARD_SPEED, MAX_FORWARD_SPEED,
};
use crate::playback::url::StreamUrl;
use eplayer_common::config::PlayerConfig;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Session state guarded by the state lock
#[derive(Debug)]
struct Session {
    mode: PlaybackMode,
    url: String,
    is_http: bool,
    no_probe: bool,
    /// Bumped by every spawned playback thread
    generation: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            mode: PlaybackMode::Stopped,
            url: String::new(),
            is_http: false,
            no_probe: false,
            generation: 0,
        }
    }
}

/// One player session: state machine, playback thread and chapter list
pub struct Player {
    output: Arc<dyn OutputSink>,
    input: Arc<dyn Input>,
    tracks: Arc<TrackManager>,
    config: PlayerConfig,

    /// Serialises control operations
    control: Mutex<()>,
    session: Mutex<Session>,

    /// True from spawn until the playback thread leaves `Input::play`
    running: Mutex<bool>,
    thread_exited: Condvar,

    abort: AbortSignal,
    chapters: Mutex<Vec<Chapter>>,
}

impl Player {
    pub fn new(
        output: Arc<dyn OutputSink>,
        input: Arc<dyn Input>,
        tracks: Arc<TrackManager>,
        config: PlayerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            output,
            input,
            tracks,
            config,
            control: Mutex::new(()),
            session: Mutex::new(Session::default()),
            running: Mutex::new(false),
            thread_exited: Condvar::new(),
            abort: AbortSignal::new(),
            chapters: Mutex::new(Vec::new()),
        })
    }

    // ------------------------------------------------------------------
    // Session setup
    // ------------------------------------------------------------------

    /// Classify `url` and initialise the input for it
    pub fn open(&self, url: &str, no_probe: bool) -> bool {
        let _control = self.control.lock();
        info!("Opening {}", url);

        let active = self.session.lock().mode.is_active();
        if active || self.is_thread_running() {
            warn!("{}", Error::IllegalTransition("open while playing".to_string()));
            return false;
        }

        let stream = match StreamUrl::classify(url) {
            Ok(stream) => stream,
            Err(e) => {
                warn!("{}", e);
                return false;
            }
        };

        self.abort.clear();
        self.tracks.clear_tracks();
        {
            let mut session = self.session.lock();
            session.url = stream.url.clone();
            session.is_http = stream.is_http;
            session.no_probe = no_probe;
        }

        if let Err(e) = self.input.init(&stream.url, no_probe) {
            error!("Input init failed for {}: {}", stream.url, e);
            return false;
        }
        true
    }

    /// Forget the session; does not touch a running playback thread
    pub fn close(&self) -> bool {
        let _control = self.control.lock();
        let mut session = self.session.lock();
        session.mode = PlaybackMode::Stopped;
        session.url.clear();
        debug!("Session closed");
        true
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Start playback and the playback thread
    pub fn play(self: &Arc<Self>) -> bool {
        let _control = self.control.lock();

        if self.is_active() {
            warn!("playback already running");
            return false;
        }

        self.output.av_sync(true);
        if !self.output.play() {
            warn!("Output refused to start playback");
            return false;
        }

        let generation = {
            let mut session = self.session.lock();
            session.mode = PlaybackMode::Playing;
            session.generation += 1;
            session.generation
        };

        let mut running = self.running.lock();
        if !*running {
            *running = true;
            let player = Arc::clone(self);
            let spawned = thread::Builder::new()
                .name(self.config.thread_name.clone())
                .spawn(move || player.run_playback(generation));
            if let Err(e) = spawned {
                *running = false;
                self.session.lock().mode = PlaybackMode::Stopped;
                error!("{}", Error::ThreadSpawn(e.to_string()));
                return false;
            }
        }

        info!("Playback started");
        true
    }

    pub fn pause(&self) -> bool {
        let _control = self.control.lock();

        let previous = self.session.lock().mode;
        if !previous.is_active() || previous.is_paused() {
            warn!("playback not playing or already in pause mode");
            return false;
        }

        if previous.is_slow_motion() {
            self.output.clear();
        }
        self.output.pause();
        if previous.is_backward() {
            self.output.mute(false);
        }

        self.session.lock().mode = PlaybackMode::Paused;
        debug!("Paused (was {})", previous);
        true
    }

    /// Return to normal playback from pause or any trick-play mode
    pub fn continue_playback(&self) -> bool {
        let _control = self.control.lock();
        self.continue_locked()
    }

    fn continue_locked(&self) -> bool {
        let previous = self.session.lock().mode;
        if !previous.is_trick_or_paused() {
            warn!("continue not possible");
            return false;
        }

        if previous.is_slow_motion() {
            self.output.clear();
        }
        self.output.continue_playback();
        if previous.is_backward() {
            self.output.mute(false);
        }

        self.session.lock().mode = PlaybackMode::Playing;
        debug!("Continued (was {})", previous);
        true
    }

    /// Stop playback and wait for the playback thread to exit.
    ///
    /// Returns false when nothing was playing, but still waits.
    pub fn stop(&self) -> bool {
        let _control = self.control.lock();
        let stopped = self.stop_locked();
        if !stopped {
            warn!("stop not possible");
        }
        self.wait_for_thread_exit();
        stopped
    }

    fn stop_locked(&self) -> bool {
        let previous = {
            let mut session = self.session.lock();
            let previous = session.mode;
            if !previous.is_active() {
                return false;
            }
            session.mode = PlaybackMode::Stopped;
            previous
        };

        if previous.is_backward() {
            self.output.mute(false);
        }
        self.output.stop();
        self.input.stop();
        info!("Playback stopped");
        true
    }

    pub fn fast_forward(&self, speed: i32) -> bool {
        let _control = self.control.lock();

        let (mode, is_http) = {
            let session = self.session.lock();
            (session.mode, session.is_http)
        };
        // Audio-only forwarding is not supported
        if !self.has_video() || is_http || mode.is_backward() || !mode.is_active() {
            warn!("fast forward not possible");
            return false;
        }
        if !is_valid_forward_speed(speed) {
            warn!("speed {} out of range (1 - {})", speed, MAX_FORWARD_SPEED);
            return false;
        }

        self.session.lock().mode = PlaybackMode::Forwarding { speed };
        self.output.fast_forward(speed);
        debug!("Fast forward x{}", speed);
        true
    }

    /// Reverse play; speed 0 ends it
    pub fn fast_backward(&self, speed: i32) -> bool {
        let _control = self.control.lock();

        let mode = self.session.lock().mode;
        if !self.has_video() || mode.is_forwarding() || !mode.is_active() {
            warn!("fast backward not possible");
            return false;
        }
        if !is_valid_backward_speed(speed) {
            warn!("speed {} out of range (0 - {})", speed, MAX_BACKWARD_SPEED);
            return false;
        }

        self.output.clear();
        if speed == 0 {
            // Only reverse play is cancelled; pause or slow motion stay
            if mode.is_backward() {
                self.session.lock().mode = PlaybackMode::Playing;
                self.output.mute(false);
                debug!("Reverse play ended");
            }
        } else {
            self.session.lock().mode = PlaybackMode::Backward { speed };
            self.output.mute(true);
            debug!("Fast backward x{}", speed);
        }
        true
    }

    /// Slow motion by `repeats`; counts other than 2, 4 or 8 reset it
    pub fn slow_motion(&self, repeats: i32) -> bool {
        let _control = self.control.lock();

        let (mode, is_http) = {
            let session = self.session.lock();
            (session.mode, session.is_http)
        };
        if !self.has_video() || is_http || !mode.is_active() {
            warn!("slowmotion not possible");
            return false;
        }

        if mode.is_paused() {
            self.continue_locked();
        }

        let repeats = normalize_slow_motion(repeats);
        {
            let mut session = self.session.lock();
            if repeats != 0 {
                session.mode = PlaybackMode::SlowMotion { repeats };
            } else if session.mode.is_slow_motion() {
                session.mode = PlaybackMode::Playing;
            }
        }
        self.output.slow_motion(repeats);
        debug!("Slow motion repeats={}", repeats);
        true
    }

    /// Reposition the input; play state is unchanged
    pub fn seek(&self, pos: f32, absolute: bool) -> bool {
        self.output.clear();
        match self.input.seek(pos, absolute) {
            Ok(()) => true,
            Err(e) => {
                warn!("Seek to {} (absolute={}) failed: {}", pos, absolute, e);
                false
            }
        }
    }

    /// Ask the input loop to finish at its next check
    pub fn request_abort(&self) {
        debug!("Abort requested");
        self.abort.request();
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Current PTS; `None` unless a session is active
    pub fn get_pts(&self) -> Option<i64> {
        if !self.is_active() {
            return None;
        }
        self.output.get_pts()
    }

    pub fn get_frame_count(&self) -> Option<i64> {
        if !self.is_active() {
            return None;
        }
        self.output.get_frame_count()
    }

    /// Duration in seconds
    pub fn get_duration(&self) -> Option<f64> {
        if !self.is_active() {
            return None;
        }
        self.input.get_duration()
    }

    pub fn get_metadata(&self) -> Option<Vec<(String, String)>> {
        self.input.get_metadata()
    }

    /// Chapter positions in milliseconds with their titles
    pub fn get_chapters(&self) -> Vec<(i64, String)> {
        self.input.update_tracks();
        self.chapters
            .lock()
            .iter()
            .map(|chapter| ((1000.0 * chapter.start) as i64, chapter.title.clone()))
            .collect()
    }

    pub fn set_chapters(&self, chapters: Vec<Chapter>) {
        *self.chapters.lock() = chapters;
    }

    /// Pid of the active track of `kind`, or -1
    pub fn get_pid(&self, kind: TrackKind) -> i32 {
        self.input.current_track(kind).map_or(-1, |track| track.pid)
    }

    pub fn get_video_pid(&self) -> i32 {
        self.get_pid(TrackKind::Video)
    }

    pub fn get_audio_pid(&self) -> i32 {
        self.get_pid(TrackKind::Audio)
    }

    pub fn get_subtitle_pid(&self) -> i32 {
        self.get_pid(TrackKind::Subtitle)
    }

    pub fn get_teletext_pid(&self) -> i32 {
        self.get_pid(TrackKind::Teletext)
    }

    /// Switch the active track of `kind` to the one with `pid`.
    ///
    /// An unknown pid is passed on as `None` so the input can disable the
    /// track.
    pub fn switch_track(&self, kind: TrackKind, pid: i32) -> bool {
        let track: Option<Track> = self.tracks.get_track(kind, pid);
        match self.input.switch_track(kind, track.as_ref()) {
            Ok(()) => true,
            Err(e) => {
                warn!("Switching {} track to pid {} failed: {}", kind, pid, e);
                false
            }
        }
    }

    pub fn switch_video(&self, pid: i32) -> bool {
        self.switch_track(TrackKind::Video, pid)
    }

    pub fn switch_audio(&self, pid: i32) -> bool {
        self.switch_track(TrackKind::Audio, pid)
    }

    pub fn switch_subtitle(&self, pid: i32) -> bool {
        self.switch_track(TrackKind::Subtitle, pid)
    }

    pub fn switch_teletext(&self, pid: i32) -> bool {
        self.switch_track(TrackKind::Teletext, pid)
    }

    pub fn mode(&self) -> PlaybackMode {
        self.session.lock().mode
    }

    pub fn speed(&self) -> i32 {
        self.session.lock().mode.speed()
    }

    pub fn is_active(&self) -> bool {
        self.session.lock().mode.is_active()
    }

    pub fn url(&self) -> String {
        self.session.lock().url.clone()
    }

    pub fn is_http(&self) -> bool {
        self.session.lock().is_http
    }

    pub fn no_probe(&self) -> bool {
        self.session.lock().no_probe
    }

    pub fn abort_requested(&self) -> bool {
        self.abort.is_requested()
    }

    /// True while the playback thread is alive
    pub fn is_thread_running(&self) -> bool {
        *self.running.lock()
    }

    pub fn tracks(&self) -> &Arc<TrackManager> {
        &self.tracks
    }

    // ------------------------------------------------------------------
    // Playback thread
    // ------------------------------------------------------------------

    fn has_video(&self) -> bool {
        self.input.current_track(TrackKind::Video).is_some()
    }

    fn run_playback(&self, generation: u64) {
        debug!("Playback thread {} started", generation);
        self.input.play(&self.abort);

        {
            let mut running = self.running.lock();
            *running = false;
            self.thread_exited.notify_all();
        }

        // End of stream: stop the session unless a newer one took over
        let _control = self.control.lock();
        if self.session.lock().generation == generation {
            self.stop_locked();
        }
        debug!("Playback thread {} exited", generation);
    }

    fn wait_for_thread_exit(&self) {
        let poll = Duration::from_millis(self.config.stop_poll_ms.max(1));
        let mut running = self.running.lock();
        while *running {
            if self.thread_exited.wait_for(&mut running, poll).timed_out() {
                debug!("Waiting for playback thread to exit");
            }
        }
    }
}
