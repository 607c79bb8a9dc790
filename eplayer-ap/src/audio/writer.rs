//! Audio writers and codec dispatch
//!
//! A writer turns one [`AudioCall`] into LPCM PES packets on the call's
//! output descriptor. Two writers exist:
//! - `pcm`: raw PCM samples are reframed directly
//! - `ipcm`: compressed packets go through the decode/resample bridge first
//!
//! [`AudioWriter::for_codec`] selects the writer for a codec tag.

use crate::audio::bridge::{CompressedPacket, IpcmWriter};
use crate::audio::lpcm::StreamParams;
use crate::audio::reframer::Reframer;
use eplayer_common::config::ResamplerConfig;
use serde::Serialize;
use std::io::Write;
use tracing::{debug, error, warn};

/// Kind of elementary stream a writer handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

/// Encoding the hardware decoder is switched to for a writer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioEncoding {
    /// Linear PCM in DVD-Audio LPCM framing
    Lpcma,
}

/// Capability descriptor used to pick a writer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriterCaps {
    pub name: &'static str,
    pub media_kind: MediaKind,
    pub codec_tag: &'static str,
    pub encoding: AudioEncoding,
}

pub static PCM_CAPS: WriterCaps = WriterCaps {
    name: "pcm",
    media_kind: MediaKind::Audio,
    codec_tag: "A_PCM",
    encoding: AudioEncoding::Lpcma,
};

pub static IPCM_CAPS: WriterCaps = WriterCaps {
    name: "ipcm",
    media_kind: MediaKind::Audio,
    codec_tag: "A_IPCM",
    encoding: AudioEncoding::Lpcma,
};

/// All writer variants in dispatch order
pub static WRITER_CAPS: [&WriterCaps; 2] = [&PCM_CAPS, &IPCM_CAPS];

/// One write request, valid only for the duration of the call
pub struct AudioCall<'a> {
    /// Output descriptor; `None` stands for an invalid descriptor
    pub out: Option<&'a mut dyn Write>,
    /// Presentation timestamp (90 kHz) or `INVALID_PTS_VALUE`
    pub pts: i64,
    /// Raw PCM for the `pcm` writer
    pub data: Option<&'a [u8]>,
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub little_endian: bool,
    /// Compressed packet and stream context for the `ipcm` writer
    pub packet: Option<CompressedPacket<'a>>,
}

impl<'a> AudioCall<'a> {
    /// Raw PCM write request
    pub fn pcm(out: &'a mut dyn Write, data: &'a [u8], params: StreamParams, pts: i64) -> Self {
        Self {
            out: Some(out),
            pts,
            data: Some(data),
            channels: params.channels,
            sample_rate: params.sample_rate,
            bits_per_sample: params.bits_per_sample,
            little_endian: params.little_endian,
            packet: None,
        }
    }

    /// Compressed packet write request
    pub fn compressed(out: &'a mut dyn Write, packet: CompressedPacket<'a>) -> Self {
        Self {
            out: Some(out),
            pts: eplayer_common::pts::INVALID_PTS_VALUE,
            data: None,
            channels: 0,
            sample_rate: 0,
            bits_per_sample: 0,
            little_endian: true,
            packet: Some(packet),
        }
    }

    fn params(&self) -> StreamParams {
        StreamParams::new(
            self.channels,
            self.sample_rate,
            self.bits_per_sample,
            self.little_endian,
        )
    }
}

/// Writer for raw PCM
///
/// Stream parameters are taken from the first call after construction or
/// [`reset`](PcmWriter::reset) and kept for the rest of the clip.
#[derive(Debug, Default)]
pub struct PcmWriter {
    reframer: Option<Reframer>,
}

impl PcmWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-arm first-write initialisation for the next clip
    pub fn reset(&mut self) {
        self.reframer = None;
    }

    /// Bytes carried over to the next call
    pub fn carried(&self) -> usize {
        self.reframer.as_ref().map_or(0, |r| r.carried())
    }

    pub fn reframer(&self) -> Option<&Reframer> {
        self.reframer.as_ref()
    }

    /// Reframe the call's PCM and write it out.
    ///
    /// Returns the number of input bytes consumed: the full data length for
    /// a valid call (including a call whose write failed part way), 0 for
    /// an invalid call or a stream that cannot be framed.
    pub fn write(&mut self, call: AudioCall<'_>) -> usize {
        debug!("AudioPts {}", call.pts);

        let data = match call.data {
            Some(data) if !data.is_empty() => data,
            _ => {
                warn!("parsing NULL Data. ignoring...");
                return 0;
            }
        };

        let params = call.params();
        let Some(out) = call.out else {
            warn!("invalid output descriptor. ignoring...");
            return 0;
        };

        if self.reframer.is_none() {
            match Reframer::new(params) {
                Ok(reframer) => self.reframer = Some(reframer),
                Err(e) => {
                    error!("Cannot initialise PCM stream: {}", e);
                    return 0;
                }
            }
        }

        let Some(reframer) = self.reframer.as_mut() else {
            return 0;
        };
        if let Err(e) = reframer.push(out, data, call.pts) {
            warn!("Aborting PCM write: {}", e);
        }

        data.len()
    }
}

/// Closed set of audio writers
pub enum AudioWriter {
    Pcm(PcmWriter),
    Ipcm(IpcmWriter),
}

impl AudioWriter {
    /// Select a writer by codec tag (`A_PCM`, `A_IPCM`)
    pub fn for_codec(codec_tag: &str, config: &ResamplerConfig) -> Option<Self> {
        match codec_tag {
            tag if tag == PCM_CAPS.codec_tag => Some(AudioWriter::Pcm(PcmWriter::new())),
            tag if tag == IPCM_CAPS.codec_tag => {
                Some(AudioWriter::Ipcm(IpcmWriter::new(config.clone())))
            }
            _ => None,
        }
    }

    /// Select a writer by name (`pcm`, `ipcm`)
    pub fn for_name(name: &str, config: &ResamplerConfig) -> Option<Self> {
        WRITER_CAPS
            .iter()
            .find(|caps| caps.name == name)
            .and_then(|caps| Self::for_codec(caps.codec_tag, config))
    }

    pub fn capabilities(&self) -> &'static WriterCaps {
        match self {
            AudioWriter::Pcm(_) => &PCM_CAPS,
            AudioWriter::Ipcm(_) => &IPCM_CAPS,
        }
    }

    pub fn reset(&mut self) {
        match self {
            AudioWriter::Pcm(writer) => writer.reset(),
            AudioWriter::Ipcm(writer) => writer.reset(),
        }
    }

    /// Write one call; returns bytes consumed (0 for a no-op)
    pub fn write(&mut self, call: AudioCall<'_>) -> usize {
        match self {
            AudioWriter::Pcm(writer) => writer.write(call),
            AudioWriter::Ipcm(writer) => writer.write(call),
        }
    }
}
