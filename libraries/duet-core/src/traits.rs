/// Host traits for Duet
use crate::error::Result;
use crate::types::DecodedAudio;
use async_trait::async_trait;

/// Media fetcher trait
///
/// Implementers retrieve the encoded bytes behind a source locator. The
/// container and codec are opaque at this layer; nothing is decoded here.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Fetch the complete encoded media behind `locator`
    ///
    /// # Errors
    /// Returns `DuetError::Fetch` (or `InvalidLocator`/`Io`) if the bytes cannot be retrieved
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>>;
}

/// Audio decoder trait
///
/// Implementers turn a complete encoded media buffer into PCM. Decoding is
/// whole-buffer: the playback engine needs the entire track resident to
/// render its waveform and to start at arbitrary offsets.
pub trait AudioDecoder: Send + Sync {
    /// Decode `bytes` into interleaved f32 samples
    ///
    /// `hint` is an optional file extension (e.g. `"mp3"`) used to speed up
    /// container probing; decoders must still probe when it is absent or wrong.
    ///
    /// # Errors
    /// Returns `DuetError::Decode` if the bytes are not a decodable audio format
    fn decode(&self, bytes: Vec<u8>, hint: Option<&str>) -> Result<DecodedAudio>;
}
