//! Playback session
//!
//! One session per mounted player. It owns the decode pipeline, the
//! play/pause/seek state machine, the progress clock and the waveform
//! renderer, and takes part in process-wide mutual exclusion through the
//! injected [`PlaybackCoordinator`].
//!
//! ```text
//! Idle ──play──▶ Loading ──ok──▶ Playing ⇄ Paused
//!   ▲              │                │
//!   │             err            natural end
//!   │              ▼                ▼
//!   └──play──── Error            Ended ──play──▶ Playing
//! ```
//!
//! Locking: session state sits behind one mutex. The session never holds it
//! while calling the coordinator or the loader, so a stop request from
//! another session can always take it. Callbacks handed to collaborators
//! hold `Weak` references and become no-ops once the session is gone.

use crate::clock::{FrameCallback, FrameScheduler, FrameTask, ProgressClock};
use crate::error::PlaybackError;
use crate::events::{EventBus, SessionEvent};
use crate::graph::{RenderGraph, SourceNode};
use crate::loader::{LoadCallback, MediaLoader};
use crate::registry::{PlaybackCoordinator, StopCallback};
use crate::types::{format_clock, PlayerConfig, SessionSnapshot, SessionState};
use crate::volume::Volume;
use crate::waveform::{MarkerPreview, WaveformCanvas, WaveformFrame, WaveformRenderer};
use crossbeam_channel::Receiver;
use duet_core::{DecodedAudio, Marker};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What to play and how
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Where the encoded media lives
    pub locator: String,

    /// Stable player identity; defaults to the locator
    pub identity: Option<String>,

    /// Track length known before decoding (used to place markers)
    pub duration_hint: Option<f64>,

    /// Comment markers
    pub markers: Vec<Marker>,

    /// Player configuration
    pub config: PlayerConfig,
}

impl SessionOptions {
    /// Options for `locator` with defaults everywhere else
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            identity: None,
            duration_hint: None,
            markers: Vec::new(),
            config: PlayerConfig::default(),
        }
    }

    /// Identify the player by `identity` instead of the locator
    #[must_use]
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Supply the track length up front
    #[must_use]
    pub fn with_duration_hint(mut self, seconds: f64) -> Self {
        self.duration_hint = Some(seconds);
        self
    }

    /// Supply comment markers
    #[must_use]
    pub fn with_markers(mut self, markers: Vec<Marker>) -> Self {
        self.markers = markers;
        self
    }

    /// Override the player configuration
    #[must_use]
    pub fn with_config(mut self, config: PlayerConfig) -> Self {
        self.config = config;
        self
    }
}

/// Platform collaborators a session is mounted with
pub struct SessionHost {
    /// Mutual-exclusion coordinator
    pub coordinator: Arc<dyn PlaybackCoordinator>,

    /// Fetch + decode
    pub loader: Arc<dyn MediaLoader>,

    /// Display-cadence callbacks
    pub scheduler: Arc<dyn FrameScheduler>,

    /// This session's audio graph
    pub graph: Arc<dyn RenderGraph>,

    /// Waveform surface, if the player shows one
    pub canvas: Option<Box<dyn WaveformCanvas>>,
}

struct SessionInner {
    state: SessionState,
    alive: bool,
    audio: Option<Arc<DecodedAudio>>,
    source: Option<Box<dyn SourceNode>>,
    resume_offset: f64,
    duration: Option<f64>,
    markers: Vec<Marker>,
    volume: Volume,
    clock: ProgressClock,
    /// Start playing as soon as the pending load completes
    autoplay: bool,
    /// Seek target requested before decoding finished
    pending_start: Option<StartAt>,
    load_generation: u64,
    error: Option<PlaybackError>,
    canvas: Option<Box<dyn WaveformCanvas>>,
    renderer: WaveformRenderer,
}

/// Where playback begins once a pending load completes
#[derive(Debug, Clone, Copy)]
enum StartAt {
    Seconds(f64),
    /// Share of a duration not known yet
    Fraction(f64),
}

impl StartAt {
    fn resolve(self, duration: f64) -> f64 {
        match self {
            Self::Seconds(seconds) => seconds,
            Self::Fraction(fraction) => duration * fraction,
        }
    }
}

struct SessionShared {
    identity: String,
    /// Registry entry owned by this mount alone
    registry_key: String,
    locator: String,
    config: PlayerConfig,
    coordinator: Arc<dyn PlaybackCoordinator>,
    loader: Arc<dyn MediaLoader>,
    scheduler: Arc<dyn FrameScheduler>,
    graph: Arc<dyn RenderGraph>,
    events: EventBus,
    inner: Mutex<SessionInner>,
}

static NEXT_MOUNT: AtomicU64 = AtomicU64::new(0);

/// A mounted player
///
/// Dropping the session unmounts it: any source is stopped, the frame loop
/// is cancelled, the registry entry is removed and the graph is closed. A
/// load still in flight completes into the void.
pub struct PlaybackSession {
    shared: Arc<SessionShared>,
}

impl PlaybackSession {
    /// Mount a session in `Idle` and register it with the coordinator
    pub fn new(options: SessionOptions, host: SessionHost) -> Self {
        let SessionOptions {
            locator,
            identity,
            duration_hint,
            mut markers,
            config,
        } = options;
        let identity = identity.unwrap_or_else(|| locator.clone());
        // The same track may be mounted twice (feed post and library card)
        let registry_key = format!(
            "{identity}#{}",
            NEXT_MOUNT.fetch_add(1, Ordering::Relaxed)
        );
        sort_markers(&mut markers);

        let volume = Volume::new(config.volume);
        host.graph.set_gain(volume.gain());

        let inner = SessionInner {
            state: SessionState::Idle,
            alive: true,
            audio: None,
            source: None,
            resume_offset: 0.0,
            duration: duration_hint.filter(|d| d.is_finite() && *d > 0.0),
            markers,
            volume,
            clock: ProgressClock::new(),
            autoplay: false,
            pending_start: None,
            load_generation: 0,
            error: None,
            canvas: host.canvas,
            renderer: WaveformRenderer::new(config.palette, config.marker_hit_radius),
        };

        let shared = Arc::new(SessionShared {
            identity,
            registry_key,
            locator,
            config,
            coordinator: host.coordinator,
            loader: host.loader,
            scheduler: host.scheduler,
            graph: host.graph,
            events: EventBus::new(),
            inner: Mutex::new(inner),
        });

        let weak = Arc::downgrade(&shared);
        let stop: StopCallback = Arc::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.stop_for_other();
            }
        });
        shared.coordinator.register(&shared.registry_key, stop);

        {
            let mut inner = shared.inner.lock();
            shared.redraw(&mut inner);
        }

        debug!(identity = %shared.identity, key = %shared.registry_key, "Session mounted");
        Self { shared }
    }

    /// Player identity
    pub fn identity(&self) -> &str {
        &self.shared.identity
    }

    /// Key this mount is registered under with the coordinator
    ///
    /// Unique per mount even when two sessions share an identity.
    pub fn registry_key(&self) -> &str {
        &self.shared.registry_key
    }

    /// Media locator
    pub fn locator(&self) -> &str {
        &self.shared.locator
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.shared.inner.lock().state
    }

    /// Whether a source is producing sound
    pub fn is_playing(&self) -> bool {
        self.state() == SessionState::Playing
    }

    /// Live elapsed seconds; the resume offset unless playing
    pub fn elapsed(&self) -> f64 {
        let inner = self.shared.inner.lock();
        self.shared.live_elapsed(&inner)
    }

    /// Position the next start will use
    pub fn resume_offset(&self) -> f64 {
        self.shared.inner.lock().resume_offset
    }

    /// Track length, once decoded or hinted
    pub fn duration(&self) -> Option<f64> {
        self.shared.inner.lock().duration
    }

    /// `elapsed / duration` in `[0, 1]`, as drawn by the waveform
    pub fn played_fraction(&self) -> f64 {
        let inner = self.shared.inner.lock();
        fraction(self.shared.live_elapsed(&inner), inner.duration)
    }

    /// Markers sorted by timestamp
    pub fn markers(&self) -> Vec<Marker> {
        self.shared.inner.lock().markers.clone()
    }

    /// Volume level and mute flag
    pub fn volume(&self) -> Volume {
        self.shared.inner.lock().volume
    }

    /// Failure behind the `Error` state
    pub fn last_error(&self) -> Option<PlaybackError> {
        self.shared.inner.lock().error.clone()
    }

    /// Receive this session's events
    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Everything the player UI shows, read atomically
    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.shared.inner.lock();
        let elapsed = self.shared.live_elapsed(&inner);
        SessionSnapshot {
            state: inner.state,
            elapsed,
            duration: inner.duration,
            played_fraction: fraction(elapsed, inner.duration),
            volume: inner.volume.level(),
            muted: inner.volume.is_muted(),
            error: inner.error.as_ref().map(|e| e.user_message().to_string()),
            time_label: format!(
                "{} / {}",
                format_clock(elapsed),
                format_clock(inner.duration.unwrap_or(0.0))
            ),
        }
    }

    /// Play/pause button
    ///
    /// Starts loading from `Idle`/`Error`, resumes from `Paused`/`Ended`,
    /// pauses while `Playing`. Ignored while `Loading`.
    pub fn toggle_play(&self) {
        match self.state() {
            SessionState::Idle | SessionState::Error => self.shared.begin_load(None),
            SessionState::Loading => {
                debug!(identity = %self.shared.identity, "Toggle ignored while loading");
            }
            SessionState::Paused | SessionState::Ended => self.shared.start_playback(),
            SessionState::Playing => self.shared.pause(),
        }
    }

    /// Start or resume playback; no-op while already playing
    pub fn play(&self) {
        match self.state() {
            SessionState::Idle | SessionState::Error => self.shared.begin_load(None),
            SessionState::Loading => self.shared.inner.lock().autoplay = true,
            SessionState::Paused | SessionState::Ended => self.shared.start_playback(),
            SessionState::Playing => {}
        }
    }

    /// Pause playback, or cancel a pending autoplay while loading
    pub fn pause(&self) {
        self.shared.pause();
    }

    /// Move to `seconds`, clamped to the track
    ///
    /// Before the audio is decoded this is a play request that starts at the
    /// target once ready.
    pub fn seek(&self, seconds: f64) {
        self.shared.seek(seconds);
    }

    /// Jump to a marker and listen
    ///
    /// Returns `false` if no marker has that id.
    pub fn click_marker(&self, marker_id: &str) -> bool {
        let timestamp = self
            .shared
            .inner
            .lock()
            .markers
            .iter()
            .find(|m| m.id == marker_id)
            .map(|m| m.timestamp);

        match timestamp {
            Some(timestamp) => {
                debug!(identity = %self.shared.identity, marker = %marker_id, timestamp, "Marker clicked");
                self.seek(timestamp);
                self.play();
                true
            }
            None => false,
        }
    }

    /// Click on the waveform at column `x`
    ///
    /// A click near a marker tick acts as a marker click; anywhere else seeks
    /// to the matching fraction of the track. Before the duration is known
    /// the click starts loading and playback begins at that fraction. Returns
    /// `false` when there is no canvas to click on.
    pub fn click_waveform(&self, x: f32) -> bool {
        enum Target {
            Marker(String),
            Position(f64),
            Fraction(f64),
        }

        let target = {
            let inner = self.shared.inner.lock();
            let Some(canvas) = inner.canvas.as_ref() else {
                return false;
            };
            let width = canvas.size().0;
            if width == 0 {
                return false;
            }
            let fraction = f64::from(x / width as f32).clamp(0.0, 1.0);
            match inner.duration {
                Some(duration) => {
                    match inner.renderer.marker_at(x, width, duration, &inner.markers) {
                        Some(index) => Target::Marker(inner.markers[index].id.clone()),
                        None => Target::Position(duration * fraction),
                    }
                }
                None => Target::Fraction(fraction),
            }
        };

        match target {
            Target::Marker(id) => self.click_marker(&id),
            Target::Position(seconds) => {
                self.seek(seconds);
                true
            }
            Target::Fraction(fraction) => {
                self.shared.seek_fraction(fraction);
                true
            }
        }
    }

    /// Pointer moved over the waveform (`None` when it leaves)
    ///
    /// Returns the preview of the marker under the pointer, if any.
    pub fn hover(&self, x: Option<f32>) -> Option<MarkerPreview> {
        let mut inner = self.shared.inner.lock();
        let width = inner.canvas.as_ref().map_or(0, |c| c.size().0);
        let index = match (x, inner.duration) {
            (Some(x), Some(duration)) if width > 0 => {
                inner.renderer.marker_at(x, width, duration, &inner.markers)
            }
            _ => None,
        };
        if inner.renderer.set_hovered(index) {
            self.shared.redraw(&mut inner);
        }
        index.map(|i| MarkerPreview::from(&inner.markers[i]))
    }

    /// Replace the markers and redraw
    pub fn set_markers(&self, mut markers: Vec<Marker>) {
        sort_markers(&mut markers);
        let mut inner = self.shared.inner.lock();
        inner.markers = markers;
        inner.renderer.set_hovered(None);
        self.shared.redraw(&mut inner);
    }

    /// Set the volume level (0-100)
    pub fn set_volume(&self, level: u8) {
        self.shared.update_volume(|v| v.set_level(level));
    }

    /// Silence output, keeping the level
    pub fn mute(&self) {
        self.shared.update_volume(Volume::mute);
    }

    /// Restore output at the kept level
    pub fn unmute(&self) {
        self.shared.update_volume(Volume::unmute);
    }

    /// Flip mute
    pub fn toggle_mute(&self) {
        self.shared.update_volume(Volume::toggle_mute);
    }

    /// Swap the waveform surface (e.g. after a resize) and redraw
    pub fn set_canvas(&self, canvas: Option<Box<dyn WaveformCanvas>>) {
        let mut inner = self.shared.inner.lock();
        inner.canvas = canvas;
        inner.renderer.invalidate();
        self.shared.redraw(&mut inner);
    }

    /// Redraw the waveform now
    pub fn redraw(&self) {
        let mut inner = self.shared.inner.lock();
        self.shared.redraw(&mut inner);
    }

    /// Unmount explicitly
    pub fn unmount(self) {}
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.shared.unmount();
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("identity", &self.shared.identity)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl SessionShared {
    fn set_state(&self, inner: &mut SessionInner, state: SessionState) {
        if inner.state != state {
            debug!(identity = %self.identity, from = ?inner.state, to = ?state, "State change");
            inner.state = state;
            self.events.emit(&SessionEvent::StateChanged { state });
        }
    }

    fn live_elapsed(&self, inner: &SessionInner) -> f64 {
        if inner.state != SessionState::Playing {
            return inner.resume_offset;
        }
        let elapsed = inner.clock.elapsed(self.graph.current_time());
        match inner.duration {
            Some(duration) => elapsed.min(duration),
            None => elapsed,
        }
    }

    fn redraw(&self, inner: &mut SessionInner) {
        let progress = fraction(self.live_elapsed(inner), inner.duration);
        let SessionInner {
            canvas,
            renderer,
            audio,
            duration,
            markers,
            ..
        } = inner;
        if let Some(canvas) = canvas.as_deref_mut() {
            renderer.render(
                canvas,
                WaveformFrame {
                    audio: audio.as_ref(),
                    progress,
                    duration: *duration,
                    markers: markers.as_slice(),
                },
            );
        }
    }

    fn begin_load(self: &Arc<Self>, start_at: Option<StartAt>) {
        let generation = {
            let mut inner = self.inner.lock();
            if !inner.alive || !matches!(inner.state, SessionState::Idle | SessionState::Error) {
                return;
            }
            inner.load_generation += 1;
            inner.autoplay = true;
            inner.pending_start = start_at;
            inner.error = None;
            inner.audio = None;
            self.set_state(&mut inner, SessionState::Loading);
            self.redraw(&mut inner);
            inner.load_generation
        };

        info!(identity = %self.identity, locator = %self.locator, "Loading media");
        let weak = Arc::downgrade(self);
        let done: LoadCallback = Box::new(move |result| match weak.upgrade() {
            Some(shared) => shared.finish_load(generation, result),
            None => debug!("Discarding load for an unmounted session"),
        });
        self.loader.load(&self.locator, done);
    }

    fn finish_load(
        self: &Arc<Self>,
        generation: u64,
        result: Result<DecodedAudio, PlaybackError>,
    ) {
        let autoplay = {
            let mut inner = self.inner.lock();
            if !inner.alive
                || inner.load_generation != generation
                || inner.state != SessionState::Loading
            {
                debug!(identity = %self.identity, generation, "Discarding stale load");
                return;
            }

            let audio = match result {
                Ok(audio) => Arc::new(audio),
                Err(err) => {
                    self.fail(&mut inner, err);
                    return;
                }
            };

            let duration = audio.duration_secs();
            info!(identity = %self.identity, duration, "Media ready");
            inner.audio = Some(audio);
            inner.duration = Some(duration);
            let target = match inner.pending_start.take() {
                Some(start) => start.resolve(duration),
                None => inner.resume_offset,
            };
            inner.resume_offset = target.clamp(0.0, duration);
            self.events.emit(&SessionEvent::Loaded { duration });

            let autoplay = std::mem::take(&mut inner.autoplay);
            if autoplay {
                // Goes straight on to Playing; listeners never see Paused
                inner.state = SessionState::Paused;
            } else {
                self.set_state(&mut inner, SessionState::Paused);
            }
            self.redraw(&mut inner);
            autoplay
        };

        if autoplay {
            self.start_playback();
        }
    }

    fn fail(&self, inner: &mut SessionInner, err: PlaybackError) {
        warn!(identity = %self.identity, error = %err, "Playback failed");
        inner.audio = None;
        inner.autoplay = false;
        inner.pending_start = None;
        self.events.emit(&SessionEvent::Error {
            message: err.user_message().to_string(),
        });
        inner.error = Some(err);
        self.set_state(inner, SessionState::Error);
        self.redraw(inner);
    }

    /// Paused/Ended -> Playing, silencing every other session first
    fn start_playback(self: &Arc<Self>) {
        if !matches!(
            self.inner.lock().state,
            SessionState::Paused | SessionState::Ended
        ) {
            return;
        }

        self.coordinator.request_exclusive_playback(&self.registry_key);

        let generation = {
            let mut inner = self.inner.lock();
            if !inner.alive || !matches!(inner.state, SessionState::Paused | SessionState::Ended) {
                return;
            }
            let offset = inner.resume_offset;
            let generation = self.start_source(&mut inner, offset);
            self.redraw(&mut inner);
            generation
        };

        if let Some(generation) = generation {
            self.schedule_frames(generation);
        }
    }

    /// Build and start a fresh source at `offset`, anchoring the clock
    ///
    /// Returns the clock generation, or `None` after moving to `Error`.
    fn start_source(&self, inner: &mut SessionInner, offset: f64) -> Option<u64> {
        let audio = inner.audio.clone()?;
        let offset = wrap_offset(offset, audio.duration_secs());

        match self.graph.start_source(audio, offset) {
            Ok(node) => {
                inner.source = Some(node);
                inner.resume_offset = offset;
                let generation = inner.clock.start(offset, self.graph.current_time());
                info!(identity = %self.identity, offset, "Playback started");
                self.set_state(inner, SessionState::Playing);
                Some(generation)
            }
            Err(err) => {
                self.fail(inner, err);
                None
            }
        }
    }

    fn schedule_frames(self: &Arc<Self>, generation: u64) {
        let weak = Arc::downgrade(self);
        let tick: FrameCallback = Arc::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.on_frame(generation);
            }
        });
        let task = match self.scheduler.schedule(tick) {
            Ok(task) => task,
            Err(err) => {
                self.abandon_playback(generation, err);
                return;
            }
        };
        let stale = self.inner.lock().clock.attach(generation, task);
        if let Some(task) = stale {
            task.cancel();
        }
    }

    /// No frame loop means no end detection, so the source must not keep playing
    fn abandon_playback(&self, generation: u64, err: PlaybackError) {
        let task = {
            let mut inner = self.inner.lock();
            if !inner.alive || !inner.clock.is_current(generation) {
                return;
            }
            let task = self.halt(&mut inner);
            self.fail(&mut inner, err);
            task
        };
        if let Some(task) = task {
            task.cancel();
        }
    }

    /// Stop the source and the clock, keeping the position
    fn halt(&self, inner: &mut SessionInner) -> Option<Box<dyn FrameTask>> {
        let elapsed = self.live_elapsed(inner);
        if let Some(source) = inner.source.take() {
            source.stop();
        }
        inner.resume_offset = elapsed;
        inner.clock.stop()
    }

    fn pause_locked(&self, inner: &mut SessionInner) -> Option<Box<dyn FrameTask>> {
        if inner.state != SessionState::Playing {
            return None;
        }
        let task = self.halt(inner);
        info!(identity = %self.identity, offset = inner.resume_offset, "Playback paused");
        self.set_state(inner, SessionState::Paused);
        self.redraw(inner);
        task
    }

    fn pause(&self) {
        let task = {
            let mut inner = self.inner.lock();
            if inner.state == SessionState::Loading {
                inner.autoplay = false;
                None
            } else {
                self.pause_locked(&mut inner)
            }
        };
        if let Some(task) = task {
            task.cancel();
        }
    }

    /// Another session claimed playback
    fn stop_for_other(&self) {
        let task = {
            let mut inner = self.inner.lock();
            match inner.state {
                SessionState::Playing => self.pause_locked(&mut inner),
                SessionState::Loading => {
                    debug!(identity = %self.identity, "Autoplay disarmed by another session");
                    inner.autoplay = false;
                    None
                }
                _ => None,
            }
        };
        if let Some(task) = task {
            task.cancel();
        }
    }

    fn seek(self: &Arc<Self>, seconds: f64) {
        let target = if seconds.is_finite() {
            seconds.max(0.0)
        } else {
            0.0
        };

        let (stale_task, generation) = {
            let mut inner = self.inner.lock();
            if !inner.alive {
                return;
            }
            let target = match inner.duration {
                Some(duration) => target.min(duration),
                None => target,
            };

            match inner.state {
                SessionState::Idle | SessionState::Error => {
                    drop(inner);
                    self.begin_load(Some(StartAt::Seconds(target)));
                    return;
                }
                SessionState::Loading => {
                    inner.pending_start = Some(StartAt::Seconds(target));
                    inner.autoplay = true;
                    return;
                }
                SessionState::Paused | SessionState::Ended => {
                    inner.resume_offset = target;
                    self.events.emit(&SessionEvent::Seeked { position: target });
                    self.set_state(&mut inner, SessionState::Paused);
                    self.redraw(&mut inner);
                    return;
                }
                SessionState::Playing => {
                    let stale = self.halt(&mut inner);
                    self.events.emit(&SessionEvent::Seeked { position: target });
                    let generation = self.start_source(&mut inner, target);
                    self.redraw(&mut inner);
                    (stale, generation)
                }
            }
        };

        if let Some(task) = stale_task {
            task.cancel();
        }
        if let Some(generation) = generation {
            self.schedule_frames(generation);
        }
    }

    /// Seek to a share of the track, loading first if its length is unknown
    fn seek_fraction(self: &Arc<Self>, fraction: f64) {
        let duration = {
            let mut inner = self.inner.lock();
            if !inner.alive {
                return;
            }
            match (inner.duration, inner.state) {
                (Some(duration), _) => duration,
                (None, SessionState::Loading) => {
                    inner.pending_start = Some(StartAt::Fraction(fraction));
                    inner.autoplay = true;
                    return;
                }
                (None, _) => {
                    drop(inner);
                    self.begin_load(Some(StartAt::Fraction(fraction)));
                    return;
                }
            }
        };
        self.seek(duration * fraction);
    }

    fn on_frame(&self, generation: u64) {
        let task = {
            let mut inner = self.inner.lock();
            if !inner.alive
                || inner.state != SessionState::Playing
                || !inner.clock.is_current(generation)
            {
                return;
            }

            if inner.source.as_ref().map_or(true, |s| s.has_ended()) {
                self.complete(&mut inner)
            } else {
                let elapsed = self.live_elapsed(&inner);
                self.events.emit(&SessionEvent::Progress { elapsed });
                self.redraw(&mut inner);
                None
            }
        };
        if let Some(task) = task {
            task.cancel();
        }
    }

    /// The source ran out on its own
    fn complete(&self, inner: &mut SessionInner) -> Option<Box<dyn FrameTask>> {
        let elapsed = inner.clock.elapsed(self.graph.current_time());
        let duration = inner.duration.unwrap_or(0.0);
        if let Some(source) = inner.source.take() {
            source.stop();
        }
        let task = inner.clock.stop();

        if elapsed >= duration - self.config.end_epsilon {
            info!(identity = %self.identity, "Playback ended");
            inner.resume_offset = 0.0;
            self.events.emit(&SessionEvent::Ended);
            self.set_state(inner, SessionState::Ended);
        } else {
            warn!(identity = %self.identity, elapsed, duration, "Source finished early");
            inner.resume_offset = elapsed.clamp(0.0, duration);
            self.set_state(inner, SessionState::Paused);
        }
        self.redraw(inner);
        task
    }

    fn update_volume(&self, change: impl FnOnce(&mut Volume)) {
        let mut inner = self.inner.lock();
        change(&mut inner.volume);
        self.graph.set_gain(inner.volume.gain());
        self.events.emit(&SessionEvent::VolumeChanged {
            level: inner.volume.level(),
            muted: inner.volume.is_muted(),
        });
    }

    fn unmount(&self) {
        let task = {
            let mut inner = self.inner.lock();
            if !inner.alive {
                return;
            }
            inner.alive = false;
            inner.autoplay = false;
            inner.load_generation += 1;
            if let Some(source) = inner.source.take() {
                source.stop();
            }
            inner.audio = None;
            inner.clock.stop()
        };
        if let Some(task) = task {
            task.cancel();
        }
        self.coordinator.unregister(&self.registry_key);
        self.graph.close();
        info!(identity = %self.identity, "Session unmounted");
    }
}

fn sort_markers(markers: &mut [Marker]) {
    markers.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
}

/// Fold a start offset into `[0, duration)`
fn wrap_offset(offset: f64, duration: f64) -> f64 {
    if duration.is_nan() || duration <= 0.0 || !offset.is_finite() || offset < 0.0 {
        return 0.0;
    }
    offset.rem_euclid(duration)
}

fn fraction(elapsed: f64, duration: Option<f64>) -> f64 {
    match duration {
        Some(duration) if duration > 0.0 => (elapsed / duration).clamp(0.0, 1.0),
        _ => 0.0,
    }
}
