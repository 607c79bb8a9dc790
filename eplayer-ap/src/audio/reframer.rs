//! Sub-frame reframing of raw PCM into LPCM PES payloads
//!
//! PCM arrives in arbitrary-length runs. The reframer cuts it into PES
//! payloads of exactly `sub_frame_len * sub_frames_per_pes` bytes, reorders
//! the bytes into the wire layout the hardware decoder expects and hands
//! each payload to the [`PesEmitter`]. A tail shorter than one payload is
//! kept in the [`CarryOverBuffer`] and completed by the next call.

use crate::audio::lpcm::{PrivateHeader, StreamParams, SubFrameGeometry};
use crate::audio::pes::PesEmitter;
use crate::error::{Error, Result};
use std::io::Write;
use tracing::{debug, trace};

/// Byte order of one 12-byte group of 24-bit stereo PCM on the wire.
///
/// Input:  `A1c A1b A1a B1c B1b B1a A2c A2b A2a B2c B2b B2a`
/// Output: `A1a A1b B1a B1b A2a A2b B2a B2b A1c B1c A2c B2c`
pub const LPCM_24BIT_ORDER: [usize; 12] = [2, 1, 5, 4, 8, 7, 11, 10, 0, 3, 6, 9];

/// Swap each adjacent byte pair (16-bit little-endian to big-endian)
pub fn swap_16bit_pairs(region: &mut [u8]) {
    for pair in region.chunks_exact_mut(2) {
        pair.swap(0, 1);
    }
}

/// Apply [`LPCM_24BIT_ORDER`] to every complete 12-byte group
pub fn reorder_24bit(region: &mut [u8]) {
    for group in region.chunks_exact_mut(12) {
        let mut source = [0u8; 12];
        source.copy_from_slice(group);
        for (dst, &index) in group.iter_mut().zip(LPCM_24BIT_ORDER.iter()) {
            *dst = source[index];
        }
    }
}

/// Partial PES payload left over between write calls
///
/// Invariant: always holds fewer bytes than one payload. A full payload is
/// emitted, never buffered.
#[derive(Debug)]
pub struct CarryOverBuffer {
    data: Vec<u8>,
    limit: usize,
}

impl CarryOverBuffer {
    /// Create an empty buffer for payloads of `limit` bytes
    pub fn new(limit: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(limit).map_err(|e| {
            Error::InvalidCall(format!("cannot allocate {} byte carry-over: {}", limit, e))
        })?;
        Ok(Self { data, limit })
    }

    /// Bytes currently buffered
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Append a tail. The caller guarantees the result stays below one payload.
    fn extend(&mut self, tail: &[u8]) {
        debug_assert!(self.data.len() + tail.len() < self.limit);
        self.data.extend_from_slice(tail);
    }

    fn clear(&mut self) {
        self.data.clear();
    }
}

/// Per-stream reframing state: header, geometry, carry-over and work buffer
#[derive(Debug)]
pub struct Reframer {
    params: StreamParams,
    header: PrivateHeader,
    geometry: SubFrameGeometry,
    carry: CarryOverBuffer,
    region: Vec<u8>,
}

impl Reframer {
    /// Initialise reframing for a clip.
    ///
    /// Fails with [`Error::UnsupportedFormat`] when the parameters cannot be
    /// framed, or [`Error::InvalidCall`] when the payload buffers cannot be
    /// allocated.
    pub fn new(params: StreamParams) -> Result<Self> {
        let (header, geometry) = PrivateHeader::for_stream(&params)?;
        let payload_len = geometry.payload_len();

        let carry = CarryOverBuffer::new(payload_len)?;
        let mut region = Vec::new();
        region.try_reserve_exact(payload_len).map_err(|e| {
            Error::InvalidCall(format!("cannot allocate {} byte payload: {}", payload_len, e))
        })?;

        Ok(Self {
            params,
            header,
            geometry,
            carry,
            region,
        })
    }

    pub fn params(&self) -> &StreamParams {
        &self.params
    }

    pub fn geometry(&self) -> SubFrameGeometry {
        self.geometry
    }

    pub fn header(&self) -> &PrivateHeader {
        &self.header
    }

    /// Bytes waiting in the carry-over buffer
    pub fn carried(&self) -> usize {
        self.carry.len()
    }

    /// Reframe `data` and emit every complete payload to `out`.
    ///
    /// All of `data` is consumed: complete payloads are written, the rest is
    /// buffered. Returns the number of PES packets written. A failed write
    /// stops the loop; bytes after the failed packet are discarded and the
    /// carry-over is left empty.
    pub fn push(&mut self, out: &mut dyn Write, data: &[u8], pts: i64) -> Result<usize> {
        let payload_len = self.geometry.payload_len();
        let mut pos = 0;
        let mut packets = 0;

        while pos < data.len() {
            let remaining = data.len() - pos;
            if self.carry.len() + remaining < payload_len {
                self.carry.extend(&data[pos..]);
                trace!("Carrying {} bytes to next call", self.carry.len());
                break;
            }

            // Assemble one payload: carried bytes first, then fresh input
            let take = payload_len - self.carry.len();
            self.region.clear();
            self.region.extend_from_slice(self.carry.as_slice());
            self.region.extend_from_slice(&data[pos..pos + take]);
            self.carry.clear();
            pos += take;

            self.reorder();
            self.header.advance_counter(self.geometry.sub_frames_per_pes);

            PesEmitter::emit(out, &self.header, &self.region, pts)?;
            packets += 1;
        }

        debug!(
            "Reframed {} bytes into {} PES packets ({} carried)",
            data.len(),
            packets,
            self.carry.len()
        );
        Ok(packets)
    }

    fn reorder(&mut self) {
        match self.params.bits_per_sample {
            16 if self.params.little_endian => swap_16bit_pairs(&mut self.region),
            24 => reorder_24bit(&mut self.region),
            _ => {}
        }
    }
}
