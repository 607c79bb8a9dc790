//! LPCM private stream header and sub-frame geometry
//!
//! Every PES packet carrying linear PCM starts its payload with a fixed
//! 14-byte private header describing the stream to the hardware decoder.
//! The header layout follows the DVD-Audio LPCM private stream format.
//!
//! ```text
//!  0  sub_stream_id (0xA0)
//!  1  sub-frame counter (5 bits, wrapping)
//!  2  reserved
//!  3  private header length (0x0A)
//!  4  first access unit pointer (0x0009)
//!  6  emphasis / stereo / downmix
//!  7  quantisation word length (0x20 set for 24 bit)
//!  8  sampling frequency code
//!  9  multi channel type
//! 10  channel count - 1
//! 11  dynamic range control (0x80)
//! 12  reserved for copyright management
//! ```

use crate::error::{Error, Result};
use tracing::info;

/// Size of the LPCM private header in bytes
pub const PRIVATE_HEADER_LEN: usize = 14;

/// Maximum PES payload budget (PES packet size minus reserved header room)
pub const MAX_PES_PAYLOAD: usize = 2048 - 18;

/// Maximum channel count the 4-bit channel field can express
pub const MAX_CHANNELS: u16 = 16;

/// Header template before stream parameters are applied
const PRIVATE_HEADER_TEMPLATE: [u8; PRIVATE_HEADER_LEN] = [
    0xA0, // sub_stream_id
    0x00, 0x00, // sub-frame counter, reserved
    0x0A, // private header length
    0x00, 0x09, // first_access_unit_pointer
    0x00, // emph, rsvd, stereo, downmix
    0x0F, // quantisation word length 1,2
    0x0F, // audio sampling frequency 1,2
    0x00, // reserved, multi channel type
    0x00, // bit shift on channel GR2, assignment
    0x80, // dynamic range control
    0x00, 0x00, // reserved for copyright management
];

const COUNTER_OFFSET: usize = 1;
const WORD_LENGTH_OFFSET: usize = 7;
const SAMPLE_RATE_OFFSET: usize = 8;
const CHANNELS_OFFSET: usize = 10;

const WORD_LENGTH_24_BIT: u8 = 0x20;
const COUNTER_MASK: u8 = 0x1F;

/// Sample rates the LPCM private header can signal, in preference order
pub const SUPPORTED_SAMPLE_RATES: [u32; 6] = [48000, 96000, 192000, 44100, 88200, 176400];

/// Parameters describing one PCM clip
///
/// Captured on the first write of a clip and kept until the writer is reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamParams {
    /// Number of interleaved channels (1..=16)
    pub channels: u16,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Bits per sample (16 or 24)
    pub bits_per_sample: u16,
    /// True when samples are stored little-endian
    pub little_endian: bool,
}

impl StreamParams {
    pub fn new(channels: u16, sample_rate: u32, bits_per_sample: u16, little_endian: bool) -> Self {
        Self {
            channels,
            sample_rate,
            bits_per_sample,
            little_endian,
        }
    }

    /// Bytes occupied by a single sample of one channel
    pub fn bytes_per_sample(&self) -> usize {
        self.bits_per_sample as usize / 8
    }
}

/// Sample-rate dependent header code and sub-frame size
///
/// Returns `(rate code OR-ed into header byte 8, samples per channel per sub-frame)`.
fn sample_rate_layout(sample_rate: u32) -> Option<(u8, usize)> {
    match sample_rate {
        48000 => Some((0x00, 40)),
        96000 => Some((0x10, 80)),
        192000 => Some((0x20, 160)),
        44100 => Some((0x80, 40)),
        88200 => Some((0x90, 80)),
        176400 => Some((0xA0, 160)),
        _ => None,
    }
}

/// Sub-frame sizing derived from [`StreamParams`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubFrameGeometry {
    /// Bytes in one sub-frame (all channels)
    pub sub_frame_len: usize,
    /// Whole sub-frames fitting in one PES payload
    pub sub_frames_per_pes: usize,
}

impl SubFrameGeometry {
    /// Bytes of PCM carried by one PES packet
    pub fn payload_len(&self) -> usize {
        self.sub_frame_len * self.sub_frames_per_pes
    }
}

/// The 14-byte LPCM private header owned by one writer instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateHeader {
    bytes: [u8; PRIVATE_HEADER_LEN],
}

impl PrivateHeader {
    /// Build the header and sub-frame geometry for a stream.
    ///
    /// Fails with [`Error::UnsupportedFormat`] for rates the header cannot
    /// signal, bit depths other than 16/24, channel counts outside 1..=16,
    /// and layouts where not even one sub-frame fits in a PES payload.
    pub fn for_stream(params: &StreamParams) -> Result<(Self, SubFrameGeometry)> {
        let (rate_code, samples_per_channel) = sample_rate_layout(params.sample_rate)
            .ok_or_else(|| {
                Error::UnsupportedFormat(format!("sample rate {} Hz", params.sample_rate))
            })?;

        if params.bits_per_sample != 16 && params.bits_per_sample != 24 {
            return Err(Error::UnsupportedFormat(format!(
                "inappropriate bits per sample ({}) - must be 16 or 24",
                params.bits_per_sample
            )));
        }

        if params.channels == 0 || params.channels > MAX_CHANNELS {
            return Err(Error::UnsupportedFormat(format!(
                "channel count {} outside 1..={}",
                params.channels, MAX_CHANNELS
            )));
        }

        let sub_frame_len =
            samples_per_channel * params.channels as usize * params.bytes_per_sample();
        let sub_frames_per_pes = (MAX_PES_PAYLOAD - PRIVATE_HEADER_LEN) / sub_frame_len;
        if sub_frames_per_pes == 0 {
            return Err(Error::UnsupportedFormat(format!(
                "sub-frame of {} bytes does not fit a PES payload",
                sub_frame_len
            )));
        }

        let mut bytes = PRIVATE_HEADER_TEMPLATE;
        bytes[SAMPLE_RATE_OFFSET] |= rate_code;
        bytes[CHANNELS_OFFSET] = (params.channels - 1) as u8;
        if params.bits_per_sample == 24 {
            bytes[WORD_LENGTH_OFFSET] |= WORD_LENGTH_24_BIT;
        }

        info!(
            "rate: {} ch: {} bits: {} ({} bps), sub-frame {} bytes x {} per PES",
            params.sample_rate,
            params.channels,
            params.bits_per_sample,
            params.bytes_per_sample(),
            sub_frame_len,
            sub_frames_per_pes
        );

        Ok((
            Self { bytes },
            SubFrameGeometry {
                sub_frame_len,
                sub_frames_per_pes,
            },
        ))
    }

    /// Advance the wrapping sub-frame counter by `sub_frames` (mod 32)
    pub fn advance_counter(&mut self, sub_frames: usize) {
        let next = (self.bytes[COUNTER_OFFSET] as usize + sub_frames) as u8;
        self.bytes[COUNTER_OFFSET] = next & COUNTER_MASK;
    }

    /// Current sub-frame counter value (0..32)
    pub fn counter(&self) -> u8 {
        self.bytes[COUNTER_OFFSET]
    }

    pub fn as_bytes(&self) -> &[u8; PRIVATE_HEADER_LEN] {
        &self.bytes
    }
}
