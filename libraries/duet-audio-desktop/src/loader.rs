//! Background fetch + decode on a tokio runtime
use crate::error::{DeviceError, Result};
use crate::fetch::Locator;
use crate::resample::{resample, ResamplingQuality};
use duet_core::{AudioDecoder, DecodedAudio, MediaFetcher};
use duet_playback::{LoadCallback, MediaLoader, PlaybackError};
use std::sync::Arc;
use tokio::runtime::{Builder, Handle, Runtime};

enum Executor {
    Owned(Runtime),
    Shared(Handle),
}

impl Executor {
    fn handle(&self) -> &Handle {
        match self {
            Self::Owned(runtime) => runtime.handle(),
            Self::Shared(handle) => handle,
        }
    }
}

/// [`MediaLoader`] that fetches asynchronously and decodes on the blocking pool
///
/// Completion callbacks run on a runtime worker thread, never on the caller's.
pub struct ThreadedLoader {
    executor: Executor,
    fetcher: Arc<dyn MediaFetcher>,
    decoder: Arc<dyn AudioDecoder>,
    target: Option<(u32, ResamplingQuality)>,
}

impl ThreadedLoader {
    /// Create a loader with its own multi-threaded runtime
    ///
    /// The owned runtime must not be dropped from inside another runtime.
    pub fn new(fetcher: Arc<dyn MediaFetcher>, decoder: Arc<dyn AudioDecoder>) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("duet-loader")
            .enable_all()
            .build()
            .map_err(|e| DeviceError::Runtime(e.to_string()))?;

        Ok(Self {
            executor: Executor::Owned(runtime),
            fetcher,
            decoder,
            target: None,
        })
    }

    /// Create a loader on an existing runtime
    pub fn with_handle(
        handle: Handle,
        fetcher: Arc<dyn MediaFetcher>,
        decoder: Arc<dyn AudioDecoder>,
    ) -> Self {
        Self {
            executor: Executor::Shared(handle),
            fetcher,
            decoder,
            target: None,
        }
    }

    /// Convert decoded audio to `rate` before handing it to the session
    #[must_use]
    pub fn with_target_rate(mut self, rate: u32, quality: ResamplingQuality) -> Self {
        self.target = Some((rate, quality));
        self
    }

    async fn run(
        locator: String,
        fetcher: Arc<dyn MediaFetcher>,
        decoder: Arc<dyn AudioDecoder>,
        target: Option<(u32, ResamplingQuality)>,
    ) -> std::result::Result<DecodedAudio, PlaybackError> {
        let hint = Locator::parse(&locator).ok().and_then(|l| l.extension());
        let bytes = fetcher.fetch(&locator).await?;
        tracing::debug!(%locator, bytes = bytes.len(), "Fetched track");

        tokio::task::spawn_blocking(move || -> std::result::Result<DecodedAudio, PlaybackError> {
            let audio = decoder.decode(bytes, hint.as_deref())?;
            match target {
                Some((rate, quality)) => resample(audio, rate, quality)
                    .map_err(|e| PlaybackError::Decode(e.to_string())),
                None => Ok(audio),
            }
        })
        .await
        .map_err(|e| PlaybackError::Decode(format!("decode task failed: {e}")))?
    }
}

impl MediaLoader for ThreadedLoader {
    fn load(&self, locator: &str, done: LoadCallback) {
        let locator = locator.to_string();
        let fetcher = Arc::clone(&self.fetcher);
        let decoder = Arc::clone(&self.decoder);
        let target = self.target;

        self.executor.handle().spawn(async move {
            let result = Self::run(locator.clone(), fetcher, decoder, target).await;
            match &result {
                Ok(audio) => tracing::info!(
                    %locator,
                    duration = audio.duration_secs(),
                    "Track ready"
                ),
                Err(e) => tracing::warn!(%locator, "Track failed to load: {}", e),
            }
            done(result);
        });
    }
}

impl std::fmt::Debug for ThreadedLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadedLoader")
            .field("owns_runtime", &matches!(self.executor, Executor::Owned(_)))
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}
