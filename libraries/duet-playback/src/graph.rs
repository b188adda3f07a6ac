//! Audio rendering graph seam
//!
//! Each session owns one graph: a gain node wired to the output device plus,
//! only while sound is produced, a single one-shot source node feeding it.
//! Platform crates implement these traits (cpal on desktop); tests use fakes.

use crate::error::Result;
use duet_core::DecodedAudio;
use std::sync::Arc;

/// A started buffer source
///
/// Sources are construct-start-discard: `stop` consumes the node, so a
/// stopped source can never be resumed or restarted. Resuming always builds a
/// new node through [`RenderGraph::start_source`].
pub trait SourceNode: Send {
    /// Whether the source ran out of data on its own
    fn has_ended(&self) -> bool;

    /// Silence the source and release it
    fn stop(self: Box<Self>);
}

/// One session's rendering graph
pub trait RenderGraph: Send + Sync {
    /// Hardware clock in seconds
    ///
    /// Monotonic while the device runs. Elapsed playback time is derived from
    /// differences of this value, never from a wall clock.
    fn current_time(&self) -> f64;

    /// Set the linear gain applied to every source of this graph
    fn set_gain(&self, gain: f32);

    /// Build a new source over `audio`, connect it through the gain node and
    /// start it `offset` seconds into the buffer
    ///
    /// # Errors
    /// Returns `PlaybackError::Playback` if the host refuses to start audio
    fn start_source(&self, audio: Arc<DecodedAudio>, offset: f64)
        -> Result<Box<dyn SourceNode>>;

    /// Release the graph; later calls may be ignored
    fn close(&self);
}
