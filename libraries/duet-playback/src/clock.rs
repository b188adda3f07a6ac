//! Progress clock and per-frame scheduling
//!
//! While a session plays, a frame task calls back once per display frame so
//! the session can recompute elapsed time from the graph clock, redraw the
//! waveform and notify listeners. The task exists only while playing.

use crate::error::Result;
use std::sync::Arc;

/// Per-frame callback
pub type FrameCallback = Arc<dyn Fn() + Send + Sync>;

/// A scheduled frame loop
pub trait FrameTask: Send {
    /// Stop calling back
    ///
    /// Must be safe to call from inside the task's own callback and must not
    /// block waiting for an in-flight tick.
    fn cancel(self: Box<Self>);
}

/// Drives frame callbacks at the display cadence
pub trait FrameScheduler: Send + Sync {
    /// Call `tick` once per frame until the returned task is cancelled
    ///
    /// Fails with [`PlaybackError::Playback`](crate::PlaybackError::Playback)
    /// when no frame loop can be started.
    fn schedule(&self, tick: FrameCallback) -> Result<Box<dyn FrameTask>>;
}

/// Elapsed-time bookkeeping for one playing stretch
///
/// `start` anchors the clock at a logical offset and the graph time at which
/// the source began; `elapsed` extrapolates from there. Every start and
/// cancel bumps a generation number so a tick that raced a cancellation can
/// recognise itself as stale.
#[derive(Default)]
pub struct ProgressClock {
    task: Option<Box<dyn FrameTask>>,
    generation: u64,
    running: bool,
    offset_at_start: f64,
    graph_time_at_start: f64,
}

impl ProgressClock {
    /// Create a stopped clock
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchor a new playing stretch and return its generation
    pub fn start(&mut self, offset: f64, graph_time: f64) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.running = true;
        self.offset_at_start = offset;
        self.graph_time_at_start = graph_time;
        self.generation
    }

    /// Attach the frame task for `generation`
    ///
    /// Returns the task back if the generation is no longer current so the
    /// caller can cancel it.
    pub fn attach(
        &mut self,
        generation: u64,
        task: Box<dyn FrameTask>,
    ) -> Option<Box<dyn FrameTask>> {
        if !self.is_current(generation) {
            return Some(task);
        }
        self.task.replace(task)
    }

    /// Stop the clock, returning the task to cancel outside any lock
    pub fn stop(&mut self) -> Option<Box<dyn FrameTask>> {
        self.generation = self.generation.wrapping_add(1);
        self.running = false;
        self.task.take()
    }

    /// Whether `generation` belongs to the stretch currently running
    pub fn is_current(&self, generation: u64) -> bool {
        self.running && self.generation == generation
    }

    /// Whether a stretch is running
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Logical position at graph time `now`
    pub fn elapsed(&self, now: f64) -> f64 {
        self.offset_at_start + (now - self.graph_time_at_start).max(0.0)
    }
}

impl std::fmt::Debug for ProgressClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressClock")
            .field("generation", &self.generation)
            .field("running", &self.running)
            .field("offset_at_start", &self.offset_at_start)
            .field("graph_time_at_start", &self.graph_time_at_start)
            .finish_non_exhaustive()
    }
}
