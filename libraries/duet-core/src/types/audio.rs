/// Audio-related types
use serde::{Deserialize, Serialize};

/// Sample rate in Hz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleRate(pub u32);

impl SampleRate {
    /// 44.1 kHz
    pub const CD_QUALITY: Self = Self(44_100);
    /// 48 kHz
    pub const DVD_QUALITY: Self = Self(48_000);

    /// Create a new sample rate
    #[must_use]
    pub fn new(hz: u32) -> Self {
        Self(hz)
    }

    /// Get the sample rate as Hz
    pub fn as_hz(&self) -> u32 {
        self.0
    }
}

/// Audio format information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Sample rate
    pub sample_rate: SampleRate,

    /// Number of channels (1 = mono, 2 = stereo, etc.)
    pub channels: u16,

    /// Bits per sample of the source material
    pub bits_per_sample: u16,
}

impl AudioFormat {
    /// Create a new audio format
    pub fn new(sample_rate: SampleRate, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
        }
    }
}

/// Fully decoded PCM for one track
///
/// Samples are stored as f32 in the range [-1.0, 1.0], interleaved
/// (`[L, R, L, R, ...]` for stereo). Decoding happens once per source and the
/// result is never mutated afterwards, so sessions share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    samples: Vec<f32>,
    format: AudioFormat,
}

impl DecodedAudio {
    /// Wrap interleaved samples
    ///
    /// A trailing partial frame is dropped so `frames()` is always exact.
    pub fn new(mut samples: Vec<f32>, format: AudioFormat) -> Self {
        let channels = usize::from(format.channels.max(1));
        samples.truncate(samples.len() - samples.len() % channels);
        Self { samples, format }
    }

    /// Audio format
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Number of interleaved channels (never zero)
    pub fn channels(&self) -> usize {
        usize::from(self.format.channels.max(1))
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.format.sample_rate.as_hz()
    }

    /// Raw interleaved samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels()
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        let rate = self.sample_rate();
        if rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(rate)
    }

    /// Whether no frames were decoded
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Iterate over the samples of one channel
    ///
    /// Out-of-range channels yield nothing.
    pub fn channel(&self, channel: usize) -> impl Iterator<Item = f32> + '_ {
        let channels = self.channels();
        let skip = if channel < channels {
            channel
        } else {
            self.samples.len()
        };
        self.samples.iter().skip(skip).step_by(channels).copied()
    }

    /// Stereo view of one frame
    ///
    /// Mono material is duplicated to both sides; channels beyond the second
    /// are ignored.
    pub fn stereo_frame(&self, frame: usize) -> Option<(f32, f32)> {
        let channels = self.channels();
        let start = frame.checked_mul(channels)?;
        let left = *self.samples.get(start)?;
        let right = if channels > 1 {
            self.samples.get(start + 1).copied().unwrap_or(left)
        } else {
            left
        };
        Some((left, right))
    }
}
