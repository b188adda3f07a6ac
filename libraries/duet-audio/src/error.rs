/// Decoder-specific errors
use thiserror::Error;

/// Result type alias using `AudioError`
pub type Result<T> = std::result::Result<T, AudioError>;

/// Audio decoding error types
#[derive(Error, Debug)]
pub enum AudioError {
    /// Container could not be recognised
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Decoding error
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Stream decoded to zero frames
    #[error("Media contains no audio frames")]
    Empty,

    /// Symphonia error
    #[error("Symphonia error: {0}")]
    Symphonia(String),
}

impl From<AudioError> for duet_core::DuetError {
    fn from(err: AudioError) -> Self {
        duet_core::DuetError::decode(err.to_string())
    }
}
