//! Recording output sink

use eplayer_ap::playback::{OutputCommand, OutputSink};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Output sink that records every command in call order
pub struct RecordingSink {
    commands: Mutex<Vec<OutputCommand>>,
    accept_play: AtomicBool,
    pts: Mutex<Option<i64>>,
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self {
            commands: Mutex::new(Vec::new()),
            accept_play: AtomicBool::new(true),
            pts: Mutex::new(Some(0)),
        }
    }
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `play` report failure
    pub fn refuse_play(&self) {
        self.accept_play.store(false, Ordering::SeqCst);
    }

    pub fn set_pts(&self, pts: Option<i64>) {
        *self.pts.lock() = pts;
    }

    pub fn commands(&self) -> Vec<OutputCommand> {
        self.commands.lock().clone()
    }

    pub fn take_commands(&self) -> Vec<OutputCommand> {
        std::mem::take(&mut *self.commands.lock())
    }

    fn record(&self, command: OutputCommand) -> bool {
        self.commands.lock().push(command);
        true
    }
}

impl OutputSink for RecordingSink {
    fn play(&self) -> bool {
        self.commands.lock().push(OutputCommand::Play);
        self.accept_play.load(Ordering::SeqCst)
    }

    fn pause(&self) -> bool {
        self.record(OutputCommand::Pause)
    }

    fn continue_playback(&self) -> bool {
        self.record(OutputCommand::Continue)
    }

    fn stop(&self) -> bool {
        self.record(OutputCommand::Stop)
    }

    fn clear(&self) -> bool {
        self.record(OutputCommand::Clear)
    }

    fn mute(&self, on: bool) -> bool {
        self.record(OutputCommand::Mute(on))
    }

    fn av_sync(&self, on: bool) -> bool {
        self.record(OutputCommand::AvSync(on))
    }

    fn fast_forward(&self, speed: i32) -> bool {
        self.record(OutputCommand::FastForward(speed))
    }

    fn slow_motion(&self, repeats: i32) -> bool {
        self.record(OutputCommand::SlowMotion(repeats))
    }

    fn get_pts(&self) -> Option<i64> {
        *self.pts.lock()
    }

    fn get_frame_count(&self) -> Option<i64> {
        Some(42)
    }
}
