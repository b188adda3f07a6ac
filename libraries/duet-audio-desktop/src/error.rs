//! Desktop host errors
use thiserror::Error;

/// Result type for desktop operations
pub type Result<T> = std::result::Result<T, DeviceError>;

/// Desktop host errors
#[derive(Debug, Error)]
pub enum DeviceError {
    /// No output device available
    #[error("Audio device not found")]
    DeviceNotFound,

    /// Failed to query or configure the device
    #[error("Device error: {0}")]
    Device(String),

    /// Failed to build output stream
    #[error("Failed to build output stream: {0}")]
    StreamBuild(String),

    /// Failed to start the stream
    #[error("Failed to play stream: {0}")]
    Play(String),

    /// Device sample format not handled
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// Sample rate conversion error
    #[error("Sample rate conversion error: {0}")]
    Resample(String),

    /// Audio thread is gone
    #[error("Audio thread stopped")]
    ThreadStopped,

    /// Settings could not be loaded or are invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Http(String),

    /// Async runtime could not be started
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Raster image could not be written
    #[error("Image error: {0}")]
    Image(String),
}

impl From<cpal::BuildStreamError> for DeviceError {
    fn from(err: cpal::BuildStreamError) -> Self {
        DeviceError::StreamBuild(err.to_string())
    }
}

impl From<cpal::PlayStreamError> for DeviceError {
    fn from(err: cpal::PlayStreamError) -> Self {
        DeviceError::Play(err.to_string())
    }
}

impl From<cpal::DefaultStreamConfigError> for DeviceError {
    fn from(err: cpal::DefaultStreamConfigError) -> Self {
        DeviceError::Device(err.to_string())
    }
}

impl From<config::ConfigError> for DeviceError {
    fn from(err: config::ConfigError) -> Self {
        DeviceError::Config(err.to_string())
    }
}

impl From<image::ImageError> for DeviceError {
    fn from(err: image::ImageError) -> Self {
        DeviceError::Image(err.to_string())
    }
}

impl From<DeviceError> for duet_playback::PlaybackError {
    fn from(err: DeviceError) -> Self {
        duet_playback::PlaybackError::Playback(err.to_string())
    }
}

impl From<DeviceError> for duet_core::DuetError {
    fn from(err: DeviceError) -> Self {
        duet_core::DuetError::Other(err.to_string())
    }
}
