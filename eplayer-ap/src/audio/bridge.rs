//! Decode/resample bridge for compressed audio
//!
//! The `ipcm` writer decodes each compressed packet with an external
//! [`PacketDecoder`], resamples the frames to an LPCM-friendly rate as signed
//! 16-bit little-endian PCM and feeds the result to its own [`PcmWriter`].
//!
//! Resampler lifecycle:
//! ```text
//! Uninitialized --first frame--> Ready
//! Ready --decode failure / discontinuity--> NeedsRestart
//! NeedsRestart --next call: clear + play sink, reopen decoder--> Uninitialized
//! ```

use crate::audio::decoder::{DecodedFrame, PacketDecoder};
use crate::audio::lpcm::StreamParams;
use crate::audio::resampler::{select_output_rate, StreamResampler};
use crate::audio::writer::{AudioCall, PcmWriter};
use crate::playback::output::{OutputCommand, OutputSink};
use eplayer_common::config::ResamplerConfig;
use eplayer_common::pts::{self, INVALID_PTS_VALUE, PTS_CLOCK_HZ};
use std::io::Write;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{debug, error, info, warn};

/// Converts a stream timestamp into a 90 kHz presentation timestamp
pub trait PtsCalculator: Send + Sync {
    /// `time_base` is `(num, den)` seconds per tick of `timestamp`
    fn calc_pts(&self, timestamp: i64, time_base: (i64, i64)) -> i64;
}

/// Plain time-base rescale to the 90 kHz clock
#[derive(Debug, Default, Clone, Copy)]
pub struct ClockPtsCalculator;

impl PtsCalculator for ClockPtsCalculator {
    fn calc_pts(&self, timestamp: i64, time_base: (i64, i64)) -> i64 {
        let (num, den) = time_base;
        if timestamp == INVALID_PTS_VALUE || den == 0 {
            return INVALID_PTS_VALUE;
        }
        pts::rescale(timestamp, num * PTS_CLOCK_HZ, den) & pts::PTS_MASK
    }
}

/// Compressed packet plus the stream context the bridge needs
pub struct CompressedPacket<'a> {
    pub data: &'a [u8],
    /// Packet timestamp in the stream time base
    pub timestamp: Option<i64>,
    /// Stream time base as `(num, den)`
    pub time_base: (i64, i64),
    pub decoder: &'a mut dyn PacketDecoder,
    pub output: &'a dyn OutputSink,
    pub pts_calc: &'a dyn PtsCalculator,
    /// Shared "current audio PTS" slot read by A/V sync
    pub current_pts: &'a AtomicI64,
    /// Caller signals a discontinuity (seek, track switch)
    pub restart_resampling: bool,
}

/// Resampler lifecycle owned by the bridge
#[derive(Default)]
pub enum ResamplerState {
    #[default]
    Uninitialized,
    Ready(StreamResampler),
    NeedsRestart,
}

impl ResamplerState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ResamplerState::Ready(_))
    }

    pub fn needs_restart(&self) -> bool {
        matches!(self, ResamplerState::NeedsRestart)
    }
}

/// The `ipcm` writer
pub struct IpcmWriter {
    config: ResamplerConfig,
    state: ResamplerState,
    pcm: PcmWriter,
}

impl IpcmWriter {
    pub fn new(config: ResamplerConfig) -> Self {
        Self {
            config,
            state: ResamplerState::Uninitialized,
            pcm: PcmWriter::new(),
        }
    }

    pub fn state(&self) -> &ResamplerState {
        &self.state
    }

    /// Drop resampler and framing state
    pub fn reset(&mut self) {
        self.state = ResamplerState::Uninitialized;
        self.pcm.reset();
    }

    /// Decode, resample and reframe one compressed packet.
    ///
    /// Returns the packet length for a valid call, even when decoding
    /// stopped part way; 0 for an invalid call.
    pub fn write(&mut self, call: AudioCall<'_>) -> usize {
        let Some(packet) = call.packet else {
            warn!("ipcm writer called without a compressed packet. ignoring...");
            return 0;
        };
        let Some(out) = call.out else {
            warn!("invalid output descriptor. ignoring...");
            return 0;
        };
        if packet.data.is_empty() {
            warn!("parsing NULL Data. ignoring...");
            return 0;
        }

        if packet.restart_resampling {
            self.state = ResamplerState::NeedsRestart;
        }
        if self.state.needs_restart() {
            self.restart(&mut *packet.decoder, packet.output);
        }

        let mut offset = 0;
        while offset < packet.data.len() {
            let step = match packet
                .decoder
                .decode(&packet.data[offset..], packet.timestamp)
            {
                Ok(step) => step,
                Err(e) => {
                    error!("Audio decode failed, restarting resampler: {}", e);
                    self.state = ResamplerState::NeedsRestart;
                    break;
                }
            };
            offset += step.consumed;

            if let Some(frame) = step.frame {
                self.process_frame(&mut *out, &packet, frame);
            }
            if step.consumed == 0 {
                break;
            }
        }

        packet.data.len()
    }

    fn restart(&mut self, decoder: &mut dyn PacketDecoder, output: &dyn OutputSink) {
        info!("Restarting audio resampling");
        self.state = ResamplerState::Uninitialized;
        output.command(OutputCommand::Clear);
        output.command(OutputCommand::Play);
        if let Err(e) = decoder.reopen() {
            error!("Failed to reopen audio decoder: {}", e);
        }
    }

    fn process_frame(
        &mut self,
        out: &mut dyn Write,
        packet: &CompressedPacket<'_>,
        frame: DecodedFrame,
    ) {
        if frame.frames() == 0 {
            return;
        }
        let Some(resampler) = self.ready_resampler(&frame) else {
            return;
        };

        let out_rate = resampler.out_rate() as i64;
        let in_rate = resampler.in_rate() as i64;
        let out_channels = resampler.out_channels();
        let delay = resampler.delay_frames() as i64;

        let samples = match resampler.convert(&frame.planes) {
            Ok(samples) => samples,
            Err(e) => {
                error!("Resampling failed: {}", e);
                self.state = ResamplerState::NeedsRestart;
                return;
            }
        };

        let pts = match frame.best_effort_timestamp.or(packet.timestamp) {
            Some(ts) => {
                let (num, den) = packet.time_base;
                let scale = num * out_rate * in_rate;
                let next_in = pts::rescale(ts, scale, den);
                let next_out = next_in - delay * out_rate;
                let out_ts = pts::rescale(next_out, den, scale);
                packet.pts_calc.calc_pts(out_ts, packet.time_base)
            }
            None => INVALID_PTS_VALUE,
        };
        packet.current_pts.store(pts, Ordering::Release);

        if samples.is_empty() {
            return;
        }
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        let params = StreamParams::new(out_channels, out_rate as u32, 16, true);
        self.pcm.write(AudioCall::pcm(out, &bytes, params, pts));
    }

    /// Resampler matching the frame, building it when absent or stale
    fn ready_resampler(&mut self, frame: &DecodedFrame) -> Option<&mut StreamResampler> {
        let in_channels = if frame.channels == 0 {
            // Unknown layout, trust the plane count
            frame.planes.len() as u16
        } else {
            frame.channels
        };

        let stale = match &self.state {
            ResamplerState::Ready(r) => {
                r.in_rate() != frame.sample_rate || r.in_channels() != in_channels
            }
            _ => true,
        };

        if stale {
            let out_rate = select_output_rate(frame.sample_rate, self.config.fallback_rate);
            let out_channels = if in_channels == 1 { 2 } else { in_channels };
            match StreamResampler::new(
                frame.sample_rate,
                out_rate,
                in_channels,
                out_channels,
                self.config.chunk_frames,
            ) {
                Ok(resampler) => {
                    info!(
                        "Audio resampler ready: {}Hz/{}ch -> {}Hz/{}ch",
                        frame.sample_rate, in_channels, out_rate, out_channels
                    );
                    self.pcm.reset();
                    self.state = ResamplerState::Ready(resampler);
                }
                Err(e) => {
                    error!("{}", e);
                    self.state = ResamplerState::Uninitialized;
                    return None;
                }
            }
        }

        match &mut self.state {
            ResamplerState::Ready(resampler) => Some(resampler),
            _ => {
                debug!("No resampler available, dropping frame");
                None
            }
        }
    }
}
