//! Duet Core
//!
//! Platform-agnostic types, host traits and error handling shared by every
//! Duet playback crate.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Audio Types**: `DecodedAudio`, `AudioFormat`, `SampleRate`
//! - **Comment Markers**: `Marker`, `MarkerAuthor`
//! - **Host Traits**: `MediaFetcher` (bytes from a locator), `AudioDecoder` (bytes to PCM)
//! - **Error Handling**: unified `DuetError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use duet_core::{AudioFormat, DecodedAudio, SampleRate};
//!
//! // One second of stereo silence at 44.1 kHz
//! let format = AudioFormat::new(SampleRate::CD_QUALITY, 2, 32);
//! let audio = DecodedAudio::new(vec![0.0; 88_200], format);
//!
//! assert_eq!(audio.frames(), 44_100);
//! assert!((audio.duration_secs() - 1.0).abs() < 1e-9);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{DuetError, Result};
pub use traits::{AudioDecoder, MediaFetcher};
pub use types::{AudioFormat, DecodedAudio, Marker, MarkerAuthor, SampleRate};
