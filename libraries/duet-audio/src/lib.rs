//! Duet Audio
//!
//! Whole-buffer decoding of encoded media into PCM for the Duet playback
//! engine.
//!
//! # Example
//!
//! ```rust,no_run
//! use duet_audio::SymphoniaDecoder;
//!
//! # fn example(bytes: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
//! let decoder = SymphoniaDecoder::new();
//! let audio = decoder.decode_bytes(bytes, Some("mp3"))?;
//!
//! println!("Decoded {:.1}s at {} Hz", audio.duration_secs(), audio.sample_rate());
//! # Ok(())
//! # }
//! ```

mod decoder;
mod error;

pub use decoder::SymphoniaDecoder;
pub use error::{AudioError, Result};
