//! Output sink interface
//!
//! The hardware output driver sits behind [`OutputSink`]. The player and the
//! decode/resample bridge only issue commands; the driver decides how to
//! carry them out and reports success as a `bool`.

use std::fmt;

/// Commands accepted by [`OutputSink::command`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputCommand {
    Play,
    Pause,
    Continue,
    Stop,
    Clear,
    Mute(bool),
    AvSync(bool),
    FastForward(i32),
    SlowMotion(i32),
}

impl fmt::Display for OutputCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputCommand::Play => write!(f, "play"),
            OutputCommand::Pause => write!(f, "pause"),
            OutputCommand::Continue => write!(f, "continue"),
            OutputCommand::Stop => write!(f, "stop"),
            OutputCommand::Clear => write!(f, "clear"),
            OutputCommand::Mute(on) => write!(f, "mute({})", on),
            OutputCommand::AvSync(on) => write!(f, "avsync({})", on),
            OutputCommand::FastForward(speed) => write!(f, "fastforward({})", speed),
            OutputCommand::SlowMotion(repeats) => write!(f, "slowmotion({})", repeats),
        }
    }
}

/// Hardware audio/video output driver
pub trait OutputSink: Send + Sync {
    fn play(&self) -> bool;
    fn pause(&self) -> bool;
    fn continue_playback(&self) -> bool;
    fn stop(&self) -> bool;
    /// Drop everything queued in the decoder buffers
    fn clear(&self) -> bool;
    fn mute(&self, on: bool) -> bool;
    fn av_sync(&self, on: bool) -> bool;
    fn fast_forward(&self, speed: i32) -> bool;
    fn slow_motion(&self, repeats: i32) -> bool;
    /// Current presentation timestamp (90 kHz), if known
    fn get_pts(&self) -> Option<i64>;
    /// Frames presented so far, if known
    fn get_frame_count(&self) -> Option<i64>;

    /// Generic command entry point
    fn command(&self, command: OutputCommand) -> bool {
        match command {
            OutputCommand::Play => self.play(),
            OutputCommand::Pause => self.pause(),
            OutputCommand::Continue => self.continue_playback(),
            OutputCommand::Stop => self.stop(),
            OutputCommand::Clear => self.clear(),
            OutputCommand::Mute(on) => self.mute(on),
            OutputCommand::AvSync(on) => self.av_sync(on),
            OutputCommand::FastForward(speed) => self.fast_forward(speed),
            OutputCommand::SlowMotion(repeats) => self.slow_motion(repeats),
        }
    }
}
