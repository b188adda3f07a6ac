//! Render graph backed by the device mixer
//!
//! Each session owns one [`CpalRenderGraph`]. Its clock is the device's
//! frame counter, so progress keeps pace with what is actually heard.

use crate::mixer::{Mixer, SharedGain};
use duet_core::DecodedAudio;
use duet_playback::{PlaybackError, RenderGraph, SourceNode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Per-session graph: one gain stage feeding the shared mixer
pub struct CpalRenderGraph {
    mixer: Arc<Mixer>,
    id: u64,
    gain: Arc<SharedGain>,
    closed: AtomicBool,
}

impl CpalRenderGraph {
    /// Create a graph feeding `mixer`
    pub fn new(mixer: Arc<Mixer>) -> Self {
        let id = mixer.next_graph_id();
        Self {
            mixer,
            id,
            gain: Arc::new(SharedGain::new(1.0)),
            closed: AtomicBool::new(false),
        }
    }

    /// Current gain factor
    pub fn gain(&self) -> f32 {
        self.gain.get()
    }

    /// Whether [`RenderGraph::close`] was called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl RenderGraph for CpalRenderGraph {
    fn current_time(&self) -> f64 {
        self.mixer.current_time()
    }

    fn set_gain(&self, gain: f32) {
        self.gain.set(gain);
    }

    fn start_source(
        &self,
        audio: Arc<DecodedAudio>,
        offset: f64,
    ) -> Result<Box<dyn SourceNode>, PlaybackError> {
        if self.is_closed() {
            return Err(PlaybackError::Playback("render graph is closed".into()));
        }
        if self.mixer.has_failed() {
            return Err(PlaybackError::Playback("audio device stream failed".into()));
        }
        if audio.is_empty() {
            return Err(PlaybackError::Playback("decoded audio has no frames".into()));
        }

        let (voice, ended) = self
            .mixer
            .add_voice(self.id, audio, offset, Arc::clone(&self.gain));
        tracing::trace!(graph = self.id, voice, offset, "Source started");

        Ok(Box::new(CpalSource {
            mixer: Arc::clone(&self.mixer),
            voice,
            ended,
        }))
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.mixer.remove_graph(self.id);
            tracing::debug!(graph = self.id, "Render graph closed");
        }
    }
}

impl Drop for CpalRenderGraph {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for CpalRenderGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpalRenderGraph")
            .field("id", &self.id)
            .field("gain", &self.gain())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// One-shot voice in the mixer
struct CpalSource {
    mixer: Arc<Mixer>,
    voice: u64,
    ended: Arc<AtomicBool>,
}

impl SourceNode for CpalSource {
    fn has_ended(&self) -> bool {
        self.ended.load(Ordering::Acquire)
    }

    fn stop(self: Box<Self>) {
        self.mixer.remove_voice(self.voice);
    }
}
