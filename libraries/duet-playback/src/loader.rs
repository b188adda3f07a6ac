//! Fetch + decode seam
//!
//! Loading is the only slow operation in a session. The loader runs it
//! wherever the host likes and reports back through a one-shot callback; the
//! callback may fire on any thread, or synchronously inside `load`.

use crate::error::PlaybackError;
use duet_core::DecodedAudio;

/// Completion of one load
pub type LoadCallback = Box<dyn FnOnce(Result<DecodedAudio, PlaybackError>) + Send>;

/// Retrieves and decodes the media behind a locator
pub trait MediaLoader: Send + Sync {
    /// Start loading `locator` and call `done` exactly once with the outcome
    ///
    /// There is no cancellation; callers discard completions they no longer
    /// care about.
    fn load(&self, locator: &str, done: LoadCallback);
}
