//! Streaming sample-rate conversion using rubato
//!
//! Converts decoded planar f32 audio to interleaved signed 16-bit PCM at the
//! output rate chosen by the bridge. Input that does not fill a complete
//! resampler chunk is held back and counted as resampler delay.

use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

/// Stateful resampler for one stream
pub struct StreamResampler {
    in_rate: u32,
    out_rate: u32,
    in_channels: u16,
    out_channels: u16,
    /// `None` when input and output rates match
    inner: Option<FastFixedIn<f32>>,
    /// Planar input waiting for a full chunk
    pending: Vec<Vec<f32>>,
}

impl StreamResampler {
    /// Create a resampler.
    ///
    /// Only identical channel counts or mono to stereo upmixing are
    /// supported; anything else is [`Error::ResamplerInit`].
    pub fn new(
        in_rate: u32,
        out_rate: u32,
        in_channels: u16,
        out_channels: u16,
        chunk_frames: usize,
    ) -> Result<Self> {
        if in_rate == 0 || out_rate == 0 {
            return Err(Error::ResamplerInit(format!(
                "invalid rates {} -> {}",
                in_rate, out_rate
            )));
        }
        let upmix = in_channels == 1 && out_channels == 2;
        if in_channels == 0 || (in_channels != out_channels && !upmix) {
            return Err(Error::ResamplerInit(format!(
                "cannot map {} channels to {}",
                in_channels, out_channels
            )));
        }

        let inner = if in_rate == out_rate {
            debug!("Sample rate already at {}Hz, resampler in passthrough", out_rate);
            None
        } else {
            debug!(
                "Resampling from {}Hz to {}Hz ({} -> {} channels)",
                in_rate, out_rate, in_channels, out_channels
            );
            Some(
                FastFixedIn::<f32>::new(
                    out_rate as f64 / in_rate as f64,
                    1.0, // max_relative_ratio (no runtime changes)
                    PolynomialDegree::Septic,
                    chunk_frames,
                    out_channels as usize,
                )
                .map_err(|e| {
                    Error::ResamplerInit(format!("Failed to create resampler: {}", e))
                })?,
            )
        };

        Ok(Self {
            in_rate,
            out_rate,
            in_channels,
            out_channels,
            inner,
            pending: vec![Vec::new(); out_channels as usize],
        })
    }

    pub fn in_rate(&self) -> u32 {
        self.in_rate
    }

    pub fn out_rate(&self) -> u32 {
        self.out_rate
    }

    pub fn in_channels(&self) -> u16 {
        self.in_channels
    }

    pub fn out_channels(&self) -> u16 {
        self.out_channels
    }

    /// Input frames held back waiting for a complete chunk
    pub fn delay_frames(&self) -> usize {
        self.pending.first().map_or(0, |plane| plane.len())
    }

    /// Feed one frame of planar input and return every output sample that
    /// is ready, interleaved as signed 16-bit.
    pub fn convert(&mut self, planes: &[Vec<f32>]) -> Result<Vec<i16>> {
        if planes.len() != self.in_channels as usize {
            return Err(Error::ResamplerInit(format!(
                "expected {} input planes, got {}",
                self.in_channels,
                planes.len()
            )));
        }

        // Upmix mono by duplicating the single plane
        for (ch, pending) in self.pending.iter_mut().enumerate() {
            let source = &planes[ch.min(planes.len() - 1)];
            pending.extend_from_slice(source);
        }

        let mut output = Vec::new();
        match self.inner.as_mut() {
            None => {
                let planar: Vec<Vec<f32>> = self.pending.iter_mut().map(std::mem::take).collect();
                Self::interleave_into(&planar, &mut output);
            }
            Some(resampler) => loop {
                let needed = resampler.input_frames_next();
                if self.pending[0].len() < needed {
                    break;
                }
                let chunk: Vec<Vec<f32>> = self
                    .pending
                    .iter_mut()
                    .map(|plane| plane.drain(..needed).collect())
                    .collect();
                let planar = resampler
                    .process(&chunk, None)
                    .map_err(|e| Error::DecodeFailure(format!("Resampling failed: {}", e)))?;
                Self::interleave_into(&planar, &mut output);
            },
        }

        Ok(output)
    }

    /// Convert planar f32 samples to interleaved i16.
    ///
    /// Input:  [[L, L, L, ...], [R, R, R, ...]]
    /// Output: [L, R, L, R, L, R, ...]
    fn interleave_into(planar: &[Vec<f32>], output: &mut Vec<i16>) {
        let Some(first) = planar.first() else {
            return;
        };
        let num_frames = first.len();
        output.reserve(num_frames * planar.len());

        for frame_idx in 0..num_frames {
            for plane in planar {
                output.push(to_i16(plane[frame_idx]));
            }
        }
    }
}

/// Convert a normalised f32 sample to i16 with clipping
pub fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

/// Pick the output rate for an input rate.
///
/// The first supported LPCM rate that is an integer multiple or divisor of
/// the input wins; otherwise `fallback`.
pub fn select_output_rate(in_rate: u32, fallback: u32) -> u32 {
    if in_rate == 0 {
        return fallback;
    }
    crate::audio::lpcm::SUPPORTED_SAMPLE_RATES
        .iter()
        .copied()
        .find(|&rate| (rate / in_rate) * in_rate == rate || (in_rate / rate) * rate == in_rate)
        .unwrap_or(fallback)
}
