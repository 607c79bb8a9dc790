//! PES packet framing and output
//!
//! Builds the packetized elementary stream header for one LPCM payload and
//! writes header, private header and PCM, vectored where the writer
//! supports it.

use crate::audio::lpcm::PrivateHeader;
use crate::error::{Error, Result};
use eplayer_common::pts::{is_valid, PTS_MASK};
use std::io::{IoSlice, Write};
use tracing::{trace, warn};

/// Stream id of private stream 1, used for LPCM audio
pub const PCM_PES_START_CODE: u8 = 0xBD;

/// Largest header [`build_pes_header`] produces (without picture start code)
pub const PES_MAX_HEADER_SIZE: usize = 14;

/// Payloads above this are signalled with PES_packet_length 0 (unbounded)
pub const MAX_PES_PACKET_SIZE: usize = 65515;

/// Length of the PES header fields following PES_packet_length
const PES_FLAGS_LEN: usize = 3;
/// Length of an encoded PTS field
const PTS_FIELD_LEN: usize = 5;

/// Build a PES header for a payload of `payload_len` bytes.
///
/// `pts` is in 90 kHz ticks; pass [`eplayer_common::pts::INVALID_PTS_VALUE`]
/// to omit the timestamp. Returns the header buffer and its used length.
pub fn build_pes_header(
    payload_len: usize,
    stream_id: u8,
    pts: i64,
) -> ([u8; PES_MAX_HEADER_SIZE], usize) {
    let mut header = [0u8; PES_MAX_HEADER_SIZE];
    let has_pts = is_valid(pts);

    let size = if payload_len > MAX_PES_PACKET_SIZE {
        0
    } else {
        payload_len
    };
    let packet_len = size + PES_FLAGS_LEN + if has_pts { PTS_FIELD_LEN } else { 0 };

    header[0] = 0x00;
    header[1] = 0x00;
    header[2] = 0x01;
    header[3] = stream_id;
    header[4] = (packet_len >> 8) as u8;
    header[5] = (packet_len & 0xFF) as u8;
    // '10', no scrambling, priority, alignment, copyright or original flags
    header[6] = 0x80;

    if !has_pts {
        header[7] = 0x00;
        header[8] = 0x00;
        return (header, 9);
    }

    header[7] = 0x80;
    header[8] = PTS_FIELD_LEN as u8;
    header[9..14].copy_from_slice(&encode_pts(pts & PTS_MASK));
    (header, 14)
}

/// Encode a 33-bit timestamp with the "PTS only" marker (0010)
fn encode_pts(ts: i64) -> [u8; 5] {
    let ts = ts as u64;
    [
        0x20 | (((ts >> 30) & 0x07) as u8) << 1 | 0x01,
        ((ts >> 22) & 0xFF) as u8,
        (((ts >> 15) & 0x7F) << 1) as u8 | 0x01,
        ((ts >> 7) & 0xFF) as u8,
        (((ts & 0x7F) << 1) | 0x01) as u8,
    ]
}

/// Emits LPCM PES packets to an output descriptor
pub struct PesEmitter;

impl PesEmitter {
    /// Write one PES packet: PES header, private header, then `payload`.
    ///
    /// The packet is offered through one `write_vectored` call; whatever
    /// that leaves unwritten (writers without vectored support take only the
    /// first slice) is finished with `write_all`. An I/O error or a writer
    /// that stops accepting bytes is a [`Error::WriteFailure`].
    pub fn emit(
        out: &mut dyn Write,
        private_header: &PrivateHeader,
        payload: &[u8],
        pts: i64,
    ) -> Result<usize> {
        let private = private_header.as_bytes();
        let (pes_header, header_len) =
            build_pes_header(private.len() + payload.len(), PCM_PES_START_CODE, pts);

        let parts: [&[u8]; 3] = [&pes_header[..header_len], private, payload];
        let expected = parts.iter().map(|part| part.len()).sum::<usize>();

        let slices = parts.map(IoSlice::new);
        let mut skip = out.write_vectored(&slices).map_err(write_failure)?;
        if skip < expected {
            trace!("Partial vectored PES write: {} of {} bytes", skip, expected);
            for part in parts {
                if skip >= part.len() {
                    skip -= part.len();
                    continue;
                }
                out.write_all(&part[skip..]).map_err(write_failure)?;
                skip = 0;
            }
        }

        trace!("PES packet written: {} bytes, pts={}", expected, pts);
        Ok(expected)
    }
}

fn write_failure(e: std::io::Error) -> Error {
    warn!("PES write failed: {}", e);
    Error::WriteFailure(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::lpcm::StreamParams;
    use eplayer_common::pts::INVALID_PTS_VALUE;

    #[test]
    fn test_header_without_pts() {
        let (header, len) = build_pes_header(1934, PCM_PES_START_CODE, INVALID_PTS_VALUE);
        assert_eq!(len, 9);
        let packet_len = 1934 + 3;
        assert_eq!(
            &header[..len],
            &[0, 0, 1, 0xBD, (packet_len >> 8) as u8, (packet_len & 0xFF) as u8, 0x80, 0, 0]
        );
    }

    #[test]
    fn test_header_with_pts() {
        let (header, len) = build_pes_header(100, PCM_PES_START_CODE, 0);
        assert_eq!(len, 14);
        assert_eq!(&header[..9], &[0, 0, 1, 0xBD, 0, 108, 0x80, 0x80, 5]);
        // PTS 0: marker bits only
        assert_eq!(&header[9..14], &[0x21, 0x00, 0x01, 0x00, 0x01]);
    }

    #[test]
    fn test_pts_encoding_bits() {
        let pts: i64 = 0x1_2345_6789;
        let encoded = encode_pts(pts);

        let decoded = (((encoded[0] >> 1) & 0x07) as i64) << 30
            | (encoded[1] as i64) << 22
            | ((encoded[2] >> 1) as i64) << 15
            | (encoded[3] as i64) << 7
            | (encoded[4] >> 1) as i64;
        assert_eq!(decoded, pts);
        assert_eq!(encoded[0] & 0xF1, 0x21);
        assert_eq!(encoded[2] & 0x01, 1);
        assert_eq!(encoded[4] & 0x01, 1);
    }

    #[test]
    fn test_oversized_payload_is_unbounded() {
        let (header, _) = build_pes_header(70000, PCM_PES_START_CODE, INVALID_PTS_VALUE);
        assert_eq!((header[4], header[5]), (0, 3));
    }

    #[test]
    fn test_emit_layout() {
        let (private, _) =
            PrivateHeader::for_stream(&StreamParams::new(2, 48000, 16, true)).unwrap();
        let payload = vec![0xAB; 32];
        let mut out = Vec::new();

        let written = PesEmitter::emit(&mut out, &private, &payload, 9000).unwrap();

        assert_eq!(written, 14 + 14 + 32);
        assert_eq!(out.len(), written);
        assert_eq!(&out[..4], &[0, 0, 1, 0xBD]);
        assert_eq!(&out[14..28], private.as_bytes());
        assert_eq!(&out[28..], payload.as_slice());
    }

    /// Accepts at most `per_call` bytes per `write` and nothing once
    /// `capacity` bytes are stored; no vectored support
    struct TrickleWriter {
        data: Vec<u8>,
        per_call: usize,
        capacity: usize,
    }

    impl TrickleWriter {
        fn new(per_call: usize, capacity: usize) -> Self {
            Self {
                data: Vec::new(),
                per_call,
                capacity,
            }
        }
    }

    impl Write for TrickleWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let n = buf
                .len()
                .min(self.per_call)
                .min(self.capacity - self.data.len());
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_emit_to_writer_without_vectored_support() {
        let (private, _) =
            PrivateHeader::for_stream(&StreamParams::new(2, 48000, 16, true)).unwrap();
        let payload: Vec<u8> = (0..64).collect();
        let mut out = TrickleWriter::new(usize::MAX, usize::MAX);

        let written = PesEmitter::emit(&mut out, &private, &payload, 9000).unwrap();

        assert_eq!(written, 14 + 14 + 64);
        assert_eq!(out.data.len(), written);
        assert_eq!(&out.data[14..28], private.as_bytes());
        assert_eq!(&out.data[28..], payload.as_slice());
    }

    #[test]
    fn test_partial_writes_are_completed() {
        let (private, _) =
            PrivateHeader::for_stream(&StreamParams::new(2, 48000, 16, true)).unwrap();
        let payload = [0x5Au8; 40];
        let mut out = TrickleWriter::new(5, usize::MAX);

        let written = PesEmitter::emit(&mut out, &private, &payload, INVALID_PTS_VALUE).unwrap();

        assert_eq!(written, 9 + 14 + 40);
        assert_eq!(&out.data[9..23], private.as_bytes());
        assert_eq!(&out.data[23..], &payload[..]);
    }

    #[test]
    fn test_stalled_writer_is_failure() {
        let (private, _) =
            PrivateHeader::for_stream(&StreamParams::new(2, 48000, 16, true)).unwrap();
        let mut out = TrickleWriter::new(4, 20);

        let result = PesEmitter::emit(&mut out, &private, &[0u8; 16], 0);

        assert!(matches!(result, Err(Error::WriteFailure(_))));
    }
}
