//! Whole-buffer sample rate conversion to the device rate
use crate::error::{DeviceError, Result};
use duet_core::{AudioFormat, DecodedAudio, SampleRate};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use serde::{Deserialize, Serialize};

/// Resampling quality preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResamplingQuality {
    /// Fast - Low CPU, good for older hardware
    /// 64 taps, 0.90 cutoff
    Fast,
    /// Balanced - Good quality with moderate CPU (default)
    /// 128 taps, 0.95 cutoff
    #[default]
    Balanced,
    /// High - Excellent quality for critical listening
    /// 256 taps, 0.99 cutoff
    High,
}

impl ResamplingQuality {
    /// Sinc filter length
    pub fn sinc_len(&self) -> usize {
        match self {
            Self::Fast => 64,
            Self::Balanced => 128,
            Self::High => 256,
        }
    }

    /// Frequency cutoff relative to Nyquist
    pub fn f_cutoff(&self) -> f32 {
        match self {
            Self::Fast => 0.90,
            Self::Balanced => 0.95,
            Self::High => 0.99,
        }
    }

    /// Oversampling factor
    pub fn oversampling_factor(&self) -> usize {
        match self {
            Self::Fast => 128,
            Self::Balanced => 256,
            Self::High => 512,
        }
    }

    fn interpolation(self) -> SincInterpolationType {
        match self {
            Self::Fast => SincInterpolationType::Linear,
            _ => SincInterpolationType::Cubic,
        }
    }
}

/// Convert `audio` to `target_rate`
///
/// Returns the input unchanged when the rates already match. The output
/// keeps the channel count and lines up with the input in time: the filter
/// delay is trimmed and the length is `frames * target / source`.
pub fn resample(
    audio: DecodedAudio,
    target_rate: u32,
    quality: ResamplingQuality,
) -> Result<DecodedAudio> {
    let source_rate = audio.sample_rate();
    if source_rate == target_rate || audio.is_empty() {
        return Ok(audio);
    }
    if source_rate == 0 || target_rate == 0 {
        return Err(DeviceError::Resample(format!(
            "invalid rates {source_rate} -> {target_rate}"
        )));
    }

    let channels = audio.channels().max(1);
    let frames = audio.frames();
    let ratio = f64::from(target_rate) / f64::from(source_rate);

    let params = SincInterpolationParameters {
        sinc_len: quality.sinc_len(),
        f_cutoff: quality.f_cutoff(),
        interpolation: quality.interpolation(),
        oversampling_factor: quality.oversampling_factor(),
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, frames, channels)
        .map_err(|e| DeviceError::Resample(e.to_string()))?;

    // Deinterleave
    let mut planar = vec![Vec::with_capacity(frames); channels];
    for frame in audio.samples().chunks_exact(channels) {
        for (ch, sample) in frame.iter().enumerate() {
            planar[ch].push(*sample);
        }
    }

    let delay = resampler.output_delay();
    let mut output = resampler
        .process(&planar, None)
        .map_err(|e| DeviceError::Resample(e.to_string()))?;

    // Flush the filter tail
    let tail = resampler
        .process_partial::<Vec<f32>>(None, None)
        .map_err(|e| DeviceError::Resample(e.to_string()))?;
    for (channel, rest) in output.iter_mut().zip(tail) {
        channel.extend(rest);
    }

    let expected = (frames as f64 * ratio).round() as usize;
    let available = output.first().map_or(0, Vec::len).saturating_sub(delay);
    let out_frames = expected.min(available);

    let mut interleaved = Vec::with_capacity(out_frames * channels);
    for frame in delay..delay + out_frames {
        for channel in &output {
            interleaved.push(channel[frame]);
        }
    }

    tracing::debug!(
        from = source_rate,
        to = target_rate,
        frames_in = frames,
        frames_out = out_frames,
        "Resampled decoded audio"
    );

    let format = audio.format();
    Ok(DecodedAudio::new(
        interleaved,
        AudioFormat::new(SampleRate::new(target_rate), format.channels, format.bits_per_sample),
    ))
}
