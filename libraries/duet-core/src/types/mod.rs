//! Domain types shared across Duet crates

mod audio;
mod marker;

pub use audio::{AudioFormat, DecodedAudio, SampleRate};
pub use marker::{Marker, MarkerAuthor};
