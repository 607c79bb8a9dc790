//! Error types for eplayer-ap
//!
//! Defines module-specific error types using thiserror for clear error propagation.
//! None of these is fatal: the writer entry points absorb them with a logged
//! diagnostic and the player operations surface them as a `false` return.

use thiserror::Error;

/// Main error type for eplayer-ap
#[derive(Error, Debug)]
pub enum Error {
    /// Null/empty data, bad descriptor or otherwise unusable write request
    #[error("Invalid call: {0}")]
    InvalidCall(String),

    /// Bit depth, sample rate or channel count the LPCM framing cannot carry
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// External decoder rejected a compressed packet
    #[error("Audio decode error: {0}")]
    DecodeFailure(String),

    /// Resampler could not be constructed for the stream parameters
    #[error("Resampler init error: {0}")]
    ResamplerInit(String),

    /// Short or failed write on the output descriptor
    #[error("Write failed: {0}")]
    WriteFailure(String),

    /// State-machine precondition not met
    #[error("Illegal transition: {0}")]
    IllegalTransition(String),

    /// Playback thread could not be started
    #[error("Thread spawn failed: {0}")]
    ThreadSpawn(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using eplayer-ap Error
pub type Result<T> = std::result::Result<T, Error>;
