//! Desktop host settings loaded from file and environment
use crate::error::{DeviceError, Result};
use crate::resample::ResamplingQuality;
use duet_playback::PlayerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level desktop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesktopSettings {
    /// Session defaults (volume, end slack, palette)
    #[serde(default)]
    pub player: PlayerConfig,

    /// Progress/redraw ticks per second
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    /// HTTP client settings
    #[serde(default)]
    pub fetch: FetchSettings,

    /// Quality used when decoded audio is converted to the device rate
    #[serde(default)]
    pub resampling: ResamplingQuality,
}

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchSettings {
    /// Whole-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// User-Agent header
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for DesktopSettings {
    fn default() -> Self {
        Self {
            player: PlayerConfig::default(),
            frame_rate: default_frame_rate(),
            fetch: FetchSettings::default(),
            resampling: ResamplingQuality::default(),
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl DesktopSettings {
    /// Load settings from an optional file, overridden by `DUET_*` variables
    ///
    /// Nested keys use a double underscore, e.g. `DUET_PLAYER__VOLUME=50`
    /// or `DUET_FETCH__TIMEOUT_SECS=5`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_prefix(path, "DUET")
    }

    /// Same as [`load`](Self::load) with a custom environment prefix
    pub fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(DeviceError::Config(format!(
                    "settings file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;

        tracing::debug!(
            frame_rate = settings.frame_rate,
            volume = settings.player.volume,
            "Loaded desktop settings"
        );
        Ok(settings)
    }

    /// Validate ranges
    pub fn validate(&self) -> Result<()> {
        if self.frame_rate == 0 || self.frame_rate > 240 {
            return Err(DeviceError::Config(format!(
                "frame_rate must be between 1 and 240, got {}",
                self.frame_rate
            )));
        }

        if self.player.volume > 100 {
            return Err(DeviceError::Config(format!(
                "player.volume must be at most 100, got {}",
                self.player.volume
            )));
        }

        if !self.player.end_epsilon.is_finite() || self.player.end_epsilon < 0.0 {
            return Err(DeviceError::Config(
                "player.end_epsilon must be a non-negative number".to_string(),
            ));
        }

        if !self.player.marker_hit_radius.is_finite() || self.player.marker_hit_radius < 0.0 {
            return Err(DeviceError::Config(
                "player.marker_hit_radius must be a non-negative number".to_string(),
            ));
        }

        if self.fetch.timeout_secs == 0 || self.fetch.connect_timeout_secs == 0 {
            return Err(DeviceError::Config(
                "fetch timeouts must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Interval between frame ticks
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.frame_rate.max(1)))
    }
}

// Default values
fn default_frame_rate() -> u32 {
    60
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("Duet/{} (Desktop)", env!("CARGO_PKG_VERSION"))
}
