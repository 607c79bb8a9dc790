//! Test helper modules for eplayer-ap integration tests
//!
//! Provides hand-written collaborators that record what the core asks of them:
//! - RecordingSink: output sink that logs every command
//! - ScriptedInput: input whose `play` blocks until stop, abort or end of stream
//! - ScriptedDecoder: packet decoder replaying canned results
//! - audio_generator: WAV fixtures for the symphonia-backed decoder

#![allow(dead_code)]

pub mod audio_generator;
pub mod mock_decoder;
pub mod mock_input;
pub mod mock_output;

use std::time::{Duration, Instant};

/// Poll `condition` until it holds or `timeout` expires
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// One PES packet split into its parts
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPes {
    pub stream_id: u8,
    /// Raw PTS field when present
    pub pts_field: Option<[u8; 5]>,
    pub private_header: [u8; 14],
    pub payload: Vec<u8>,
}

/// Split a byte stream of LPCM PES packets
pub fn parse_pes_stream(mut data: &[u8]) -> Vec<ParsedPes> {
    let mut packets = Vec::new();
    while !data.is_empty() {
        assert_eq!(&data[..3], &[0, 0, 1], "missing PES start code");
        let packet_len = ((data[4] as usize) << 8) | data[5] as usize;
        let header_len = 9 + data[8] as usize;
        let total = 6 + packet_len;

        let pts_field = if data[8] == 5 {
            let mut field = [0u8; 5];
            field.copy_from_slice(&data[9..14]);
            Some(field)
        } else {
            None
        };
        let mut private_header = [0u8; 14];
        private_header.copy_from_slice(&data[header_len..header_len + 14]);

        packets.push(ParsedPes {
            stream_id: data[3],
            pts_field,
            private_header,
            payload: data[header_len + 14..total].to_vec(),
        });
        data = &data[total..];
    }
    packets
}
