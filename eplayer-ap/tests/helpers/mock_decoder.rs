//! Scripted packet decoder

use eplayer_ap::audio::decoder::{DecodeStep, DecodedFrame, PacketDecoder};
use eplayer_ap::{Error, Result};
use std::collections::VecDeque;

/// One canned decoder response
pub enum Step {
    /// Consume `consumed` bytes and produce `frame`
    Frame { consumed: usize, frame: DecodedFrame },
    /// Consume the rest of the packet without producing a frame
    Skip,
    /// Report a decode failure
    Fail,
}

/// Decoder that replays a script; once exhausted it consumes everything
#[derive(Default)]
pub struct ScriptedDecoder {
    script: VecDeque<Step>,
    pub decode_calls: usize,
    pub reopen_calls: usize,
}

impl ScriptedDecoder {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            script: script.into(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, step: Step) {
        self.script.push_back(step);
    }
}

impl PacketDecoder for ScriptedDecoder {
    fn decode(&mut self, data: &[u8], _timestamp: Option<i64>) -> Result<DecodeStep> {
        self.decode_calls += 1;
        match self.script.pop_front() {
            Some(Step::Frame { consumed, frame }) => Ok(DecodeStep {
                consumed: consumed.min(data.len()),
                frame: Some(frame),
            }),
            Some(Step::Fail) => Err(Error::DecodeFailure("corrupt packet".to_string())),
            Some(Step::Skip) | None => Ok(DecodeStep {
                consumed: data.len(),
                frame: None,
            }),
        }
    }

    fn reopen(&mut self) -> Result<()> {
        self.reopen_calls += 1;
        Ok(())
    }
}

/// Planar frame of `frames` samples per channel at a constant level
pub fn constant_frame(sample_rate: u32, channels: u16, frames: usize, level: f32) -> DecodedFrame {
    DecodedFrame {
        sample_rate,
        channels,
        planes: vec![vec![level; frames]; channels as usize],
        best_effort_timestamp: None,
    }
}
