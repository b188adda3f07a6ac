//! Wires desktop implementations into playback sessions
use crate::error::Result;
use crate::fetch::SourceFetcher;
use crate::loader::ThreadedLoader;
use crate::output::CpalOutput;
use crate::settings::DesktopSettings;
use crate::ticker::FrameTicker;
use duet_audio::SymphoniaDecoder;
use duet_playback::{
    PlaybackRegistry, PlaybackSession, SessionHost, SessionOptions, WaveformCanvas,
};
use std::sync::Arc;

/// One audio device, loader and ticker shared by every mounted player
pub struct DesktopHost {
    settings: DesktopSettings,
    registry: Arc<PlaybackRegistry>,
    loader: Arc<ThreadedLoader>,
    ticker: Arc<FrameTicker>,
    output: CpalOutput,
}

impl DesktopHost {
    /// Open the default output device and start the loader runtime
    ///
    /// Sessions mounted through this host share the process-wide registry,
    /// so only one of them is audible at a time.
    pub fn new(settings: DesktopSettings) -> Result<Self> {
        settings.validate()?;
        let output = CpalOutput::new()?;

        let fetcher = SourceFetcher::new(&settings.fetch)?;
        let loader = ThreadedLoader::new(Arc::new(fetcher), Arc::new(SymphoniaDecoder::new()))?
            .with_target_rate(output.sample_rate(), settings.resampling);
        let ticker = FrameTicker::new(settings.frame_interval());

        tracing::info!(
            sample_rate = output.sample_rate(),
            frame_rate = settings.frame_rate,
            "Desktop host ready"
        );

        Ok(Self {
            settings,
            registry: PlaybackRegistry::global(),
            loader: Arc::new(loader),
            ticker: Arc::new(ticker),
            output,
        })
    }

    /// Active settings
    pub fn settings(&self) -> &DesktopSettings {
        &self.settings
    }

    /// Registry coordinating this host's sessions
    pub fn registry(&self) -> &Arc<PlaybackRegistry> {
        &self.registry
    }

    /// Device output
    pub fn output(&self) -> &CpalOutput {
        &self.output
    }

    /// Session options pre-filled with the host's player defaults
    pub fn options(&self, locator: impl Into<String>) -> SessionOptions {
        SessionOptions::new(locator).with_config(self.settings.player.clone())
    }

    /// Host bundle for one session, with its own render graph
    pub fn session_host(&self, canvas: Option<Box<dyn WaveformCanvas>>) -> SessionHost {
        SessionHost {
            coordinator: self.registry.clone(),
            loader: self.loader.clone(),
            scheduler: self.ticker.clone(),
            graph: Arc::new(self.output.create_graph()),
            canvas,
        }
    }

    /// Mount a player
    pub fn mount(
        &self,
        options: SessionOptions,
        canvas: Option<Box<dyn WaveformCanvas>>,
    ) -> PlaybackSession {
        PlaybackSession::new(options, self.session_host(canvas))
    }
}

impl std::fmt::Debug for DesktopHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesktopHost")
            .field("settings", &self.settings)
            .field("registry", &self.registry)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}
