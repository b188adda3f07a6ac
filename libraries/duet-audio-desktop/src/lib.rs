//! Duet Audio Desktop
//!
//! Desktop host for the Duet playback engine.
//!
//! # Components
//!
//! - [`CpalOutput`]: default output device, owned by a dedicated audio thread
//! - [`CpalRenderGraph`]: per-session gain stage on the shared [`Mixer`],
//!   clocked by frames actually rendered
//! - [`ThreadedLoader`]: HTTP/file fetch on tokio, decode and resample on
//!   the blocking pool
//! - [`FrameTicker`]: fixed-rate progress/redraw ticks
//! - [`RasterCanvas`]: waveform drawn into an RGBA image
//! - [`DesktopSettings`]: TOML file plus `DUET_*` environment overrides
//!
//! # Example
//!
//! ```rust,no_run
//! use duet_audio_desktop::{DesktopHost, DesktopSettings, RasterCanvas};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = DesktopSettings::load(None)?;
//! let host = DesktopHost::new(settings)?;
//!
//! let canvas = RasterCanvas::new(600, 64);
//! let take_1 = host.mount(host.options("https://media.example.com/take-1.mp3"), Some(Box::new(canvas)));
//! let take_2 = host.mount(host.options("/music/take-2.flac"), None);
//!
//! take_1.toggle_play();
//! take_2.toggle_play(); // take 1 pauses
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod canvas;
mod error;
mod fetch;
mod graph;
mod host;
mod loader;
mod mixer;
mod output;
mod resample;
mod settings;
mod ticker;

pub use canvas::RasterCanvas;
pub use error::{DeviceError, Result};
pub use fetch::{HttpFetcher, LocalFetcher, Locator, SourceFetcher};
pub use graph::CpalRenderGraph;
pub use host::DesktopHost;
pub use loader::ThreadedLoader;
pub use mixer::Mixer;
pub use output::CpalOutput;
pub use resample::{resample, ResamplingQuality};
pub use settings::{DesktopSettings, FetchSettings};
pub use ticker::FrameTicker;
