//! Error types for playback sessions

use thiserror::Error;

/// Playback errors
///
/// All three variants are terminal for the attempt that produced them: the
/// session lands in `SessionState::Error` and recovers only when the user
/// asks to play again, which fetches and decodes from scratch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// Encoded bytes could not be retrieved
    #[error("Failed to fetch media: {0}")]
    Fetch(String),

    /// Bytes were retrieved but could not be decoded
    #[error("Failed to decode media: {0}")]
    Decode(String),

    /// The host audio subsystem refused to start a source
    #[error("Audio output rejected playback: {0}")]
    Playback(String),
}

impl PlaybackError {
    /// Short message suitable for the player UI
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "Couldn't load this track. Check your connection and try again.",
            Self::Decode(_) => "This track's audio format isn't supported.",
            Self::Playback(_) => "Playback was blocked. Press play to try again.",
        }
    }
}

impl From<duet_core::DuetError> for PlaybackError {
    fn from(err: duet_core::DuetError) -> Self {
        if err.is_fetch_failure() {
            Self::Fetch(err.to_string())
        } else {
            Self::Decode(err.to_string())
        }
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
