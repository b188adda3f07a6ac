/// Whole-buffer audio decoder using Symphonia
use crate::error::{AudioError, Result};
use duet_core::{AudioDecoder, AudioFormat, DecodedAudio, SampleRate};
use std::io::Cursor;
use symphonia::core::audio::{AudioBuffer as SymphoniaBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use tracing::{debug, warn};

/// ITU-R BS.775-1 coefficient for center and surround channels (-3 dB)
const SIDE_MIX: f32 = 0.707;

/// Audio decoder using Symphonia
///
/// Supports: MP3, FLAC, OGG/Vorbis, WAV, AAC, MP4/M4A
///
/// Decodes an in-memory byte buffer in one pass. Output is always
/// interleaved stereo f32; mono is duplicated and surround is downmixed.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self
    }

    /// Decode a complete encoded buffer
    ///
    /// # Errors
    /// Returns an error if the container cannot be probed, has no audio
    /// track, fails mid-stream, or yields no frames at all.
    pub fn decode_bytes(&self, bytes: Vec<u8>, hint: Option<&str>) -> Result<DecodedAudio> {
        let byte_len = bytes.len();
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

        let mut probe_hint = Hint::new();
        if let Some(ext) = hint {
            probe_hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &probe_hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| AudioError::UnsupportedFormat(e.to_string()))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| AudioError::DecodeError("No audio track found".to_string()))?;

        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
        let bits_per_sample = track
            .codec_params
            .bits_per_sample
            .and_then(|b| u16::try_from(b).ok())
            .unwrap_or(32);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| AudioError::Symphonia(format!("Failed to create decoder: {}", e)))?;

        let mut samples = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                Err(e) => {
                    return Err(AudioError::Symphonia(format!("Error reading packet: {}", e)));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    if sample_rate == 0 {
                        sample_rate = decoded.spec().rate;
                    }
                    Self::append_stereo(decoded, &mut samples);
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    // A corrupt frame is skipped, the rest of the stream still plays
                    warn!(error = %e, "Skipping undecodable packet");
                }
                Err(e) => return Err(AudioError::DecodeError(e.to_string())),
            }
        }

        if samples.is_empty() || sample_rate == 0 {
            return Err(AudioError::Empty);
        }

        let audio = DecodedAudio::new(
            samples,
            AudioFormat::new(SampleRate::new(sample_rate), 2, bits_per_sample),
        );

        debug!(
            bytes = byte_len,
            frames = audio.frames(),
            sample_rate,
            duration = audio.duration_secs(),
            "Decoded media"
        );

        Ok(audio)
    }

    /// Convert a decoded Symphonia buffer to interleaved stereo f32 and append it
    ///
    /// Signed integers use symmetric scaling (divide by 2^(N-1)) so the
    /// result stays within [-1.0, 1.0).
    fn append_stereo(decoded: AudioBufferRef<'_>, out: &mut Vec<f32>) {
        match decoded {
            AudioBufferRef::F32(buf) => Self::downmix(&buf, |s| s.clamp(-1.0, 1.0), out),
            AudioBufferRef::F64(buf) => Self::downmix(&buf, |s| (s as f32).clamp(-1.0, 1.0), out),
            AudioBufferRef::S32(buf) => Self::downmix(&buf, |s| s as f32 / 2_147_483_648.0, out),
            AudioBufferRef::S24(buf) => Self::downmix(&buf, |s| s.inner() as f32 / 8_388_608.0, out),
            AudioBufferRef::S16(buf) => Self::downmix(&buf, |s| f32::from(s) / 32_768.0, out),
            AudioBufferRef::S8(buf) => Self::downmix(&buf, |s| f32::from(s) / 128.0, out),
            AudioBufferRef::U32(buf) => {
                Self::downmix(&buf, |s| (s as f32 / u32::MAX as f32) * 2.0 - 1.0, out)
            }
            AudioBufferRef::U24(buf) => {
                Self::downmix(&buf, |s| (s.inner() as f32 / 16_777_215.0) * 2.0 - 1.0, out)
            }
            AudioBufferRef::U16(buf) => {
                Self::downmix(&buf, |s| (f32::from(s) / f32::from(u16::MAX)) * 2.0 - 1.0, out)
            }
            AudioBufferRef::U8(buf) => {
                Self::downmix(&buf, |s| (f32::from(s) / f32::from(u8::MAX)) * 2.0 - 1.0, out)
            }
        }
    }

    /// Downmix any channel layout to stereo
    ///
    /// - Mono is duplicated to both sides
    /// - Quad (L, R, SL, SR) folds each surround into its side
    /// - 5.0 (L, R, C, SL, SR) folds center into both sides
    /// - 5.1 and wider (FL, FR, C, LFE, SL, SR, ...) fold center, LFE and any
    ///   extra channels into both sides and surrounds into their side
    fn downmix<T, F>(buf: &SymphoniaBuffer<T>, normalize: F, out: &mut Vec<f32>)
    where
        T: Sample + Copy,
        F: Fn(T) -> f32,
    {
        let channels = buf.spec().channels.count();
        let frames = buf.frames();
        out.reserve(frames * 2);

        match channels {
            0 => out.resize(out.len() + frames * 2, 0.0),
            1 => {
                for &s in &buf.chan(0)[..frames] {
                    let sample = normalize(s);
                    out.push(sample);
                    out.push(sample);
                }
            }
            _ => {
                let planes: Vec<&[T]> = (0..channels).map(|ch| buf.chan(ch)).collect();
                for i in 0..frames {
                    let mut left = normalize(planes[0][i]);
                    let mut right = normalize(planes[1][i]);
                    for (ch, plane) in planes.iter().enumerate().skip(2) {
                        let side = normalize(plane[i]) * SIDE_MIX;
                        match (channels, ch) {
                            (4, 2) | (5, 3) => left += side,
                            (4, 3) | (5, 4) => right += side,
                            (c, 4) if c >= 6 => left += side,
                            (c, 5) if c >= 6 => right += side,
                            _ => {
                                left += side;
                                right += side;
                            }
                        }
                    }
                    out.push(left.clamp(-1.0, 1.0));
                    out.push(right.clamp(-1.0, 1.0));
                }
            }
        }
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn decode(&self, bytes: Vec<u8>, hint: Option<&str>) -> duet_core::Result<DecodedAudio> {
        Ok(self.decode_bytes(bytes, hint)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_is_rejected() {
        let decoder = SymphoniaDecoder::new();
        let result = decoder.decode_bytes(b"definitely not audio".to_vec(), Some("mp3"));
        assert!(matches!(result, Err(AudioError::UnsupportedFormat(_))));
    }

    #[test]
    fn empty_input_is_rejected() {
        let decoder = SymphoniaDecoder::new();
        assert!(decoder.decode_bytes(Vec::new(), None).is_err());
    }

    #[test]
    fn trait_errors_map_to_decode_failures() {
        let decoder = SymphoniaDecoder::new();
        let err = AudioDecoder::decode(&decoder, vec![0u8; 16], None).unwrap_err();
        assert!(!err.is_fetch_failure());
    }
}
