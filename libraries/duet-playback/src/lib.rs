//! Duet Playback - Session Management
//!
//! Platform-agnostic playback engine for Duet's embedded players.
//!
//! This crate provides:
//! - Process-wide mutual exclusion: at most one player is audible at a time
//! - Per-player sessions with load/play/pause/seek/resume
//! - Elapsed time derived from the audio graph's hardware clock
//! - Peak-envelope waveform rendering with comment markers
//! - Volume control (logarithmic, 0-100%, mute/unmute)
//!
//! # Architecture
//!
//! `duet-playback` has no platform dependencies:
//! - No dependency on cpal (desktop audio)
//! - No dependency on any HTTP client or async runtime
//! - No dependency on a drawing library
//!
//! Platform code plugs in through traits: [`RenderGraph`]/[`SourceNode`]
//! for audio output, [`MediaLoader`] for fetch + decode, [`FrameScheduler`]
//! for the display cadence and [`WaveformCanvas`] for drawing.
//!
//! # Example
//!
//! ```rust,no_run
//! use duet_playback::{PlaybackRegistry, PlaybackSession, SessionHost, SessionOptions};
//! # fn host() -> SessionHost { unimplemented!() }
//!
//! let registry = PlaybackRegistry::global();
//! let session = PlaybackSession::new(
//!     SessionOptions::new("https://media.example.com/take-1.mp3").with_duration_hint(95.0),
//!     SessionHost { coordinator: registry, ..host() },
//! );
//!
//! session.toggle_play(); // Idle -> Loading -> Playing
//! session.seek(30.0);
//! session.set_volume(60);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod error;
pub mod events;
pub mod graph;
pub mod loader;
pub mod registry;
pub mod session;
pub mod types;
pub mod volume;
pub mod waveform;

pub use clock::{FrameCallback, FrameScheduler, FrameTask, ProgressClock};
pub use error::{PlaybackError, Result};
pub use events::{EventBus, SessionEvent};
pub use graph::{RenderGraph, SourceNode};
pub use loader::{LoadCallback, MediaLoader};
pub use registry::{PlaybackCoordinator, PlaybackRegistry, StopCallback};
pub use session::{PlaybackSession, SessionHost, SessionOptions};
pub use types::{format_clock, Color, PlayerConfig, SessionSnapshot, SessionState, WaveformPalette};
pub use volume::Volume;
pub use waveform::{MarkerPreview, PeakEnvelope, WaveformCanvas, WaveformFrame, WaveformRenderer};
