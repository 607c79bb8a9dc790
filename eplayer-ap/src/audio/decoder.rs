//! Compressed-packet decoding
//!
//! The decode/resample bridge talks to its decoder through [`PacketDecoder`]
//! so any codec backend can be plugged in. [`SymphoniaPacketDecoder`] is the
//! built-in backend; [`MediaFile`] probes a container with symphonia and
//! yields its audio packets.

use crate::error::{Error, Result};
use std::path::Path;
use symphonia::core::audio::{AudioBuffer, Signal};
use symphonia::core::codecs::{CodecParameters, Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::{FormatOptions, FormatReader, Packet};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::TimeBase;
use tracing::{debug, warn};

/// One decoded audio frame in planar f32 layout
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    /// Sample rate of the decoded audio
    pub sample_rate: u32,
    /// Channel count; 0 when the decoder could not tell the layout
    pub channels: u16,
    /// One plane of samples per channel, normalised to [-1.0, 1.0]
    pub planes: Vec<Vec<f32>>,
    /// Best-effort timestamp in the stream time base
    pub best_effort_timestamp: Option<i64>,
}

impl DecodedFrame {
    /// Number of samples per channel
    pub fn frames(&self) -> usize {
        self.planes.first().map_or(0, |plane| plane.len())
    }
}

/// Result of feeding bytes to a [`PacketDecoder`]
#[derive(Debug)]
pub struct DecodeStep {
    /// Bytes of the packet the decoder used
    pub consumed: usize,
    /// Frame produced by this step, if any
    pub frame: Option<DecodedFrame>,
}

/// External audio decoder driven by the decode/resample bridge
pub trait PacketDecoder: Send {
    /// Decode from the start of `data`.
    ///
    /// `timestamp` is the packet timestamp in the stream time base. Returns
    /// [`Error::DecodeFailure`] when the data cannot be decoded.
    fn decode(&mut self, data: &[u8], timestamp: Option<i64>) -> Result<DecodeStep>;

    /// Reinitialise the codec after a failure or discontinuity
    fn reopen(&mut self) -> Result<()>;
}

/// [`PacketDecoder`] backed by a symphonia codec
pub struct SymphoniaPacketDecoder {
    decoder: Box<dyn Decoder>,
    codec_params: CodecParameters,
    track_id: u32,
}

impl SymphoniaPacketDecoder {
    /// Create a decoder for a track described by `codec_params`
    pub fn new(codec_params: &CodecParameters, track_id: u32) -> Result<Self> {
        let decoder = Self::make_decoder(codec_params)?;
        Ok(Self {
            decoder,
            codec_params: codec_params.clone(),
            track_id,
        })
    }

    fn make_decoder(codec_params: &CodecParameters) -> Result<Box<dyn Decoder>> {
        symphonia::default::get_codecs()
            .make(codec_params, &DecoderOptions::default())
            .map_err(|e| Error::DecodeFailure(format!("Failed to create decoder: {}", e)))
    }
}

impl PacketDecoder for SymphoniaPacketDecoder {
    fn decode(&mut self, data: &[u8], timestamp: Option<i64>) -> Result<DecodeStep> {
        let ts = timestamp.unwrap_or(0).max(0) as u64;
        let packet = Packet::new_from_slice(self.track_id, ts, 0, data);

        let decoded = self
            .decoder
            .decode(&packet)
            .map_err(|e| Error::DecodeFailure(e.to_string()))?;

        let spec = *decoded.spec();
        let mut buffer = AudioBuffer::<f32>::new(decoded.capacity() as u64, spec);
        decoded.convert(&mut buffer);

        let channels = spec.channels.count();
        let planes = (0..channels).map(|ch| buffer.chan(ch).to_vec()).collect();

        Ok(DecodeStep {
            consumed: data.len(),
            frame: Some(DecodedFrame {
                sample_rate: spec.rate,
                channels: channels as u16,
                planes,
                best_effort_timestamp: timestamp,
            }),
        })
    }

    fn reopen(&mut self) -> Result<()> {
        debug!("Reopening symphonia decoder for track {}", self.track_id);
        self.decoder = Self::make_decoder(&self.codec_params)?;
        Ok(())
    }
}

/// Compressed audio packet read from a container
#[derive(Debug, Clone)]
pub struct MediaPacket {
    pub data: Vec<u8>,
    /// Timestamp in the track time base
    pub timestamp: i64,
}

/// A probed media file with a selected audio track
pub struct MediaFile {
    format: Box<dyn FormatReader>,
    track_id: u32,
    codec_params: CodecParameters,
}

impl MediaFile {
    /// Probe `path` and select its first decodable audio track
    pub fn open(path: &Path) -> Result<Self> {
        debug!("Probing media file: {}", path.display());

        let file = std::fs::File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Create a hint to help the format registry guess the format
        let mut hint = Hint::new();
        if let Some(ext_str) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext_str);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| Error::DecodeFailure(format!("Failed to probe format: {}", e)))?;

        let format = probed.format;
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::DecodeFailure("No audio track found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        debug!(
            "Audio track {}: sample_rate={:?}, channels={:?}",
            track_id,
            codec_params.sample_rate,
            codec_params.channels.map(|c| c.count())
        );

        Ok(Self {
            format,
            track_id,
            codec_params,
        })
    }

    pub fn codec_params(&self) -> &CodecParameters {
        &self.codec_params
    }

    pub fn track_id(&self) -> u32 {
        self.track_id
    }

    /// Time base of the selected track as `(num, den)`.
    ///
    /// Falls back to one tick per sample when the container gives none.
    pub fn time_base(&self) -> (i64, i64) {
        let time_base = self.codec_params.time_base.or_else(|| {
            self.codec_params
                .sample_rate
                .map(|rate| TimeBase::new(1, rate))
        });
        match time_base {
            Some(tb) => (tb.numer as i64, tb.denom as i64),
            None => (1, 90_000),
        }
    }

    /// Build a decoder for the selected track
    pub fn decoder(&self) -> Result<SymphoniaPacketDecoder> {
        SymphoniaPacketDecoder::new(&self.codec_params, self.track_id)
    }

    /// Read the next packet of the selected track; `None` at end of stream
    pub fn next_packet(&mut self) -> Result<Option<MediaPacket>> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(symphonia::core::errors::Error::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    debug!("Reached end of file");
                    return Ok(None);
                }
                Err(e) => {
                    warn!("Error reading packet: {}", e);
                    return Err(Error::DecodeFailure(e.to_string()));
                }
            };

            // Skip packets for other tracks
            if packet.track_id() != self.track_id {
                continue;
            }

            return Ok(Some(MediaPacket {
                timestamp: packet.ts() as i64,
                data: packet.buf().to_vec(),
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_counts_first_plane() {
        let frame = DecodedFrame {
            sample_rate: 48000,
            channels: 2,
            planes: vec![vec![0.0; 10], vec![0.0; 10]],
            best_effort_timestamp: None,
        };
        assert_eq!(frame.frames(), 10);
    }

    #[test]
    fn test_frames_empty() {
        let frame = DecodedFrame {
            sample_rate: 48000,
            channels: 0,
            planes: Vec::new(),
            best_effort_timestamp: None,
        };
        assert_eq!(frame.frames(), 0);
    }

    #[test]
    fn test_open_missing_file() {
        let result = MediaFile::open(Path::new("/nonexistent/clip.wav"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
