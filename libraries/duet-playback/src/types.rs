//! Core types for playback sessions

use serde::{Deserialize, Serialize};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Mounted, nothing decoded yet
    Idle,

    /// Fetch + decode in flight
    Loading,

    /// Decoded, silent, resume offset valid
    Paused,

    /// A source node is producing sound
    Playing,

    /// Played to completion; the next play restarts from the beginning
    Ended,

    /// Fetch, decode or start failed; playing again retries from scratch
    Error,
}

impl SessionState {
    /// Whether decoded audio is resident in this state
    pub fn is_decoded(self) -> bool {
        matches!(self, Self::Paused | Self::Playing | Self::Ended)
    }
}

/// RGBA colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub [u8; 4]);

impl Color {
    /// Opaque colour from RGB components
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }
}

/// Colours used by the waveform renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformPalette {
    /// Canvas background
    pub background: Color,

    /// Envelope not yet played
    pub unplayed: Color,

    /// Envelope already played
    pub played: Color,

    /// Comment marker tick
    pub marker: Color,

    /// Comment marker tick under the pointer
    pub marker_hover: Color,
}

impl Default for WaveformPalette {
    fn default() -> Self {
        Self {
            background: Color([0, 0, 0, 0]),
            unplayed: Color::rgb(0x9c, 0xa3, 0xaf),
            played: Color::rgb(0xf9, 0x73, 0x16),
            marker: Color::rgb(0x60, 0xa5, 0xfa),
            marker_hover: Color::rgb(0xff, 0xff, 0xff),
        }
    }
}

/// Configuration for playback sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Initial volume (0-100, default: 80)
    pub volume: u8,

    /// Slack (seconds) when deciding a finished source reached the end
    /// (default: 0.05)
    pub end_epsilon: f64,

    /// Half-width (pixels) of the clickable area around a marker tick
    /// (default: 4.0)
    pub marker_hit_radius: f32,

    /// Waveform colours
    pub palette: WaveformPalette,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            volume: 80,
            end_epsilon: 0.05,
            marker_hit_radius: 4.0,
            palette: WaveformPalette::default(),
        }
    }
}

/// Point-in-time view of a session for the player UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Current state
    pub state: SessionState,

    /// Live elapsed seconds (resume offset unless playing)
    pub elapsed: f64,

    /// Track length once known (decoded or hinted)
    pub duration: Option<f64>,

    /// `elapsed / duration`, clamped to [0, 1]
    pub played_fraction: f64,

    /// Volume level (0-100)
    pub volume: u8,

    /// Whether output is muted
    pub muted: bool,

    /// User-facing message of the last failure, while in `Error`
    pub error: Option<String>,

    /// `m:ss / m:ss` label
    pub time_label: String,
}

/// Format seconds as `m:ss` (or `h:mm:ss` past an hour)
///
/// Negative and non-finite values render as `0:00`.
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}
