//! Error types for rigsound

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RigSoundError {
    /// RIFF/WAVE header missing, tags mismatched, or the header itself was cut short.
    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    /// The stream ended before both the `fmt ` and `data` chunks were read.
    #[error("Missing chunk: {0}")]
    MissingChunk(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The backend rejected a buffer or voice operation.
    #[error("Audio device error: {0}")]
    DeviceError(String),

    /// No device/stream could be brought up; audio stays disabled.
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RigSoundError {
    /// Returns true for errors produced while parsing a WAV stream.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedContainer(_) | Self::MissingChunk(_) | Self::UnsupportedFormat(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RigSoundError>;
