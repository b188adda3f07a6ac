/// Core error types for Duet
use thiserror::Error;

/// Result type alias using `DuetError`
pub type Result<T> = std::result::Result<T, DuetError>;

/// Core error type for Duet
#[derive(Error, Debug)]
pub enum DuetError {
    /// Encoded bytes could not be retrieved from the locator
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Bytes were retrieved but are not decodable audio
    #[error("Decode error: {0}")]
    Decode(String),

    /// Locator is malformed or uses an unsupported scheme
    #[error("Invalid locator: {0}")]
    InvalidLocator(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl DuetError {
    /// Create a fetch error
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create an invalid locator error
    pub fn invalid_locator(msg: impl Into<String>) -> Self {
        Self::InvalidLocator(msg.into())
    }

    /// Whether the failure happened while retrieving bytes rather than decoding them
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::InvalidLocator(_) | Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_side_errors_are_classified() {
        assert!(DuetError::fetch("404").is_fetch_failure());
        assert!(DuetError::invalid_locator("ftp://x").is_fetch_failure());
        assert!(DuetError::Io(std::io::Error::other("gone")).is_fetch_failure());
        assert!(!DuetError::decode("garbage").is_fetch_failure());
    }

    #[test]
    fn messages_carry_context() {
        let err = DuetError::decode("no audio track");
        assert_eq!(err.to_string(), "Decode error: no audio track");
    }
}
