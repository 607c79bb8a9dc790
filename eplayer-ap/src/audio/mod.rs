//! LPCM audio path: private header, reframing, PES emission and the
//! decode/resample bridge

pub mod bridge;
pub mod decoder;
pub mod lpcm;
pub mod pes;
pub mod reframer;
pub mod resampler;
pub mod writer;

pub use bridge::{ClockPtsCalculator, CompressedPacket, IpcmWriter, PtsCalculator};
pub use decoder::{DecodedFrame, MediaFile, PacketDecoder, SymphoniaPacketDecoder};
pub use lpcm::{PrivateHeader, StreamParams, SubFrameGeometry};
pub use reframer::Reframer;
pub use resampler::StreamResampler;
pub use writer::{AudioCall, AudioWriter, PcmWriter, WriterCaps};
