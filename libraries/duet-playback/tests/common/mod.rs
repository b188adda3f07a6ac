//! Shared fakes for session tests
//!
//! Everything is deterministic: the graph clock only moves when a test
//! advances it, frame ticks only happen when a test calls `tick`, and loads
//! complete either inside `load` or when a test releases them.
#![allow(dead_code)]

use duet_core::{AudioFormat, DecodedAudio, SampleRate};
use duet_playback::{
    Color, FrameCallback, FrameScheduler, FrameTask, LoadCallback, MediaLoader, PlaybackError,
    PlaybackRegistry, PlaybackSession, RenderGraph, SessionHost, SessionOptions, SourceNode,
    WaveformCanvas,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Sample rate of generated fixtures
pub const FIXTURE_RATE: u32 = 1_000;

/// Stereo ramp lasting `seconds`
pub fn track(seconds: f64) -> DecodedAudio {
    let frames = (seconds * f64::from(FIXTURE_RATE)).round() as usize;
    let samples = (0..frames)
        .flat_map(|i| {
            let s = ((i % 200) as f32 / 100.0) - 1.0;
            [s, -s]
        })
        .collect();
    DecodedAudio::new(samples, AudioFormat::new(SampleRate::new(FIXTURE_RATE), 2, 16))
}

// ===== Graph =====

/// Hardware clock shared by every fake graph
#[derive(Clone, Default)]
pub struct ManualClock(Arc<Mutex<f64>>);

impl ManualClock {
    pub fn now(&self) -> f64 {
        *self.0.lock()
    }

    pub fn advance(&self, seconds: f64) {
        *self.0.lock() += seconds;
    }
}

/// What a fake graph observed
#[derive(Default)]
pub struct GraphProbe {
    pub starts: Mutex<Vec<f64>>,
    pub stops: AtomicU64,
    pub gain: Mutex<Option<f32>>,
    pub closed: AtomicBool,
    pub reject_next_start: AtomicBool,
    active: Mutex<Option<Arc<AtomicBool>>>,
}

impl GraphProbe {
    /// Whether a source is currently producing sound
    pub fn is_sounding(&self) -> bool {
        self.active.lock().is_some()
    }

    pub fn start_offsets(&self) -> Vec<f64> {
        self.starts.lock().clone()
    }

    pub fn last_start(&self) -> Option<f64> {
        self.starts.lock().last().copied()
    }

    pub fn gain(&self) -> Option<f32> {
        *self.gain.lock()
    }

    /// Make the active source report that it ran out of data
    pub fn finish_source(&self) {
        if let Some(ended) = self.active.lock().as_ref() {
            ended.store(true, Ordering::SeqCst);
        }
    }
}

pub struct FakeGraph {
    clock: ManualClock,
    probe: Arc<GraphProbe>,
}

impl FakeGraph {
    pub fn new(clock: ManualClock) -> (Self, Arc<GraphProbe>) {
        let probe = Arc::new(GraphProbe::default());
        (
            Self {
                clock,
                probe: Arc::clone(&probe),
            },
            probe,
        )
    }
}

struct FakeSource {
    probe: Arc<GraphProbe>,
    ended: Arc<AtomicBool>,
}

impl SourceNode for FakeSource {
    fn has_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    fn stop(self: Box<Self>) {
        self.probe.stops.fetch_add(1, Ordering::SeqCst);
        let mut active = self.probe.active.lock();
        if active.as_ref().is_some_and(|a| Arc::ptr_eq(a, &self.ended)) {
            *active = None;
        }
    }
}

impl RenderGraph for FakeGraph {
    fn current_time(&self) -> f64 {
        self.clock.now()
    }

    fn set_gain(&self, gain: f32) {
        *self.probe.gain.lock() = Some(gain);
    }

    fn start_source(
        &self,
        audio: Arc<DecodedAudio>,
        offset: f64,
    ) -> duet_playback::Result<Box<dyn SourceNode>> {
        if self.probe.reject_next_start.swap(false, Ordering::SeqCst) {
            return Err(PlaybackError::Playback("user gesture required".into()));
        }
        assert!(
            offset >= 0.0 && offset < audio.duration_secs(),
            "start offset {offset} outside [0, {})",
            audio.duration_secs()
        );
        let ended = Arc::new(AtomicBool::new(false));
        let mut active = self.probe.active.lock();
        assert!(active.is_none(), "a second source started on one graph");
        *active = Some(Arc::clone(&ended));
        self.probe.starts.lock().push(offset);
        Ok(Box::new(FakeSource {
            probe: Arc::clone(&self.probe),
            ended,
        }))
    }

    fn close(&self) {
        self.probe.closed.store(true, Ordering::SeqCst);
    }
}

// ===== Frames =====

/// Frame scheduler driven by hand
#[derive(Default)]
pub struct ManualFrames {
    next_id: AtomicU64,
    pub refuse_next: AtomicBool,
    tasks: Arc<Mutex<Vec<(u64, FrameCallback)>>>,
}

struct ManualTask {
    id: u64,
    tasks: Arc<Mutex<Vec<(u64, FrameCallback)>>>,
}

impl FrameTask for ManualTask {
    fn cancel(self: Box<Self>) {
        self.tasks.lock().retain(|(id, _)| *id != self.id);
    }
}

impl ManualFrames {
    /// Run one frame of every scheduled task
    pub fn tick(&self) {
        let callbacks: Vec<FrameCallback> =
            self.tasks.lock().iter().map(|(_, cb)| Arc::clone(cb)).collect();
        for callback in callbacks {
            callback();
        }
    }

    /// Number of live frame loops
    pub fn active(&self) -> usize {
        self.tasks.lock().len()
    }
}

impl FrameScheduler for ManualFrames {
    fn schedule(&self, tick: FrameCallback) -> duet_playback::Result<Box<dyn FrameTask>> {
        if self.refuse_next.swap(false, Ordering::SeqCst) {
            return Err(PlaybackError::Playback("frame loop unavailable".into()));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.tasks.lock().push((id, tick));
        Ok(Box::new(ManualTask {
            id,
            tasks: Arc::clone(&self.tasks),
        }))
    }
}

// ===== Loaders =====

/// Completes every load synchronously
#[derive(Default)]
pub struct InstantLoader {
    tracks: Mutex<HashMap<String, f64>>,
    failures: Mutex<HashMap<String, PlaybackError>>,
    pub loads: AtomicU64,
}

impl InstantLoader {
    pub fn with_track(self, locator: &str, seconds: f64) -> Self {
        self.tracks.lock().insert(locator.to_string(), seconds);
        self
    }

    pub fn fail(&self, locator: &str, err: PlaybackError) {
        self.failures.lock().insert(locator.to_string(), err);
    }

    pub fn heal(&self, locator: &str) {
        self.failures.lock().remove(locator);
    }
}

impl MediaLoader for InstantLoader {
    fn load(&self, locator: &str, done: LoadCallback) {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let failure = self.failures.lock().get(locator).cloned();
        let result = match failure {
            Some(err) => Err(err),
            None => match self.tracks.lock().get(locator) {
                Some(&seconds) => Ok(track(seconds)),
                None => Err(PlaybackError::Fetch(format!("HTTP 404 for {locator}"))),
            },
        };
        done(result);
    }
}

/// Holds loads until the test releases them
#[derive(Default)]
pub struct DeferredLoader {
    pending: Mutex<Vec<(String, LoadCallback)>>,
}

impl DeferredLoader {
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Complete the oldest pending load
    pub fn complete_next(&self, result: Result<DecodedAudio, PlaybackError>) {
        let next = {
            let mut pending = self.pending.lock();
            if pending.is_empty() {
                None
            } else {
                Some(pending.remove(0))
            }
        };
        let (_, done) = next.expect("no pending load");
        done(result);
    }
}

impl MediaLoader for DeferredLoader {
    fn load(&self, locator: &str, done: LoadCallback) {
        self.pending.lock().push((locator.to_string(), done));
    }
}

// ===== Canvas =====

#[derive(Debug, Clone, PartialEq)]
pub enum CanvasOp {
    Clear(Color),
    Clip(Option<(f32, f32)>),
    Vertical { x: u32, top: f32, bottom: f32, color: Color },
    Horizontal { y: f32, left: f32, right: f32, color: Color },
}

/// Records draw calls; a test keeps the `ops` handle
pub struct RecordingCanvas {
    width: u32,
    height: u32,
    ops: Arc<Mutex<Vec<CanvasOp>>>,
}

impl RecordingCanvas {
    pub fn new(width: u32, height: u32) -> (Self, Arc<Mutex<Vec<CanvasOp>>>) {
        let ops = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                width,
                height,
                ops: Arc::clone(&ops),
            },
            ops,
        )
    }
}

impl WaveformCanvas for RecordingCanvas {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self, color: Color) {
        let mut ops = self.ops.lock();
        ops.clear();
        ops.push(CanvasOp::Clear(color));
    }

    fn set_clip(&mut self, span: Option<(f32, f32)>) {
        self.ops.lock().push(CanvasOp::Clip(span));
    }

    fn vertical_line(&mut self, x: u32, top: f32, bottom: f32, color: Color) {
        self.ops.lock().push(CanvasOp::Vertical { x, top, bottom, color });
    }

    fn horizontal_line(&mut self, y: f32, left: f32, right: f32, color: Color) {
        self.ops.lock().push(CanvasOp::Horizontal { y, left, right, color });
    }
}

// ===== Harness =====

/// A registry, clock and frame driver shared by several sessions
pub struct Harness {
    pub registry: Arc<PlaybackRegistry>,
    pub clock: ManualClock,
    pub frames: Arc<ManualFrames>,
    pub loader: Arc<dyn MediaLoader>,
}

impl Harness {
    pub fn new(loader: Arc<dyn MediaLoader>) -> Self {
        Self {
            registry: Arc::new(PlaybackRegistry::new()),
            clock: ManualClock::default(),
            frames: Arc::new(ManualFrames::default()),
            loader,
        }
    }

    /// Harness whose loader knows `tracks` (locator, seconds)
    pub fn with_tracks(tracks: &[(&str, f64)]) -> Self {
        let loader = tracks
            .iter()
            .fold(InstantLoader::default(), |loader, (locator, seconds)| {
                loader.with_track(locator, *seconds)
            });
        Self::new(Arc::new(loader))
    }

    pub fn host(&self, canvas: Option<Box<dyn WaveformCanvas>>) -> (SessionHost, Arc<GraphProbe>) {
        let (graph, probe) = FakeGraph::new(self.clock.clone());
        let host = SessionHost {
            coordinator: self.registry.clone(),
            loader: Arc::clone(&self.loader),
            scheduler: self.frames.clone(),
            graph: Arc::new(graph),
            canvas,
        };
        (host, probe)
    }

    pub fn mount(&self, options: SessionOptions) -> (PlaybackSession, Arc<GraphProbe>) {
        let (host, probe) = self.host(None);
        (PlaybackSession::new(options, host), probe)
    }

    /// Advance the hardware clock by `seconds` and deliver one frame
    pub fn run_for(&self, seconds: f64) {
        self.clock.advance(seconds);
        self.frames.tick();
    }
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}
