//! Audio test fixture generation
//!
//! Deterministic WAV files for the symphonia-backed decode path and raw PCM
//! byte streams for the reframer.

use hound::{WavSpec, WavWriter};
use std::f32::consts::PI;
use std::path::Path;

/// Generate a 16-bit sine WAV file with the same signal on every channel
///
/// # Example
/// ```no_run
/// # use std::path::Path;
/// // 200 ms of 440 Hz stereo at 48 kHz, half amplitude
/// generate_sine_wav(Path::new("/tmp/sine.wav"), 48000, 2, 200, 440.0, 0.5)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn generate_sine_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    channels: u16,
    duration_ms: u64,
    frequency_hz: f32,
    amplitude: f32,
) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    let total_frames = frame_count(sample_rate, duration_ms);
    let amplitude_i16 = (amplitude * i16::MAX as f32) as i16;

    for frame_idx in 0..total_frames {
        let t = frame_idx as f32 / sample_rate as f32;
        let sample_i16 = ((2.0 * PI * frequency_hz * t).sin() * amplitude_i16 as f32) as i16;
        for _ in 0..channels {
            writer.write_sample(sample_i16)?;
        }
    }

    writer.finalize()?;
    Ok(())
}

/// Frames in `duration_ms` at `sample_rate`
pub fn frame_count(sample_rate: u32, duration_ms: u64) -> u64 {
    (sample_rate as u64 * duration_ms) / 1000
}

/// Raw PCM byte stream with a recognisable pattern (`i % 251`)
pub fn pattern_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
