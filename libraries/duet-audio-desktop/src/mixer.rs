//! Voice mixer shared between render graphs and the device callback
//!
//! Every started source becomes a voice. The device callback sums all live
//! voices into the output buffer, scaled by their graph's gain, and advances
//! the hardware clock by the number of frames rendered.

use duet_core::DecodedAudio;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

/// Gain shared lock-free between a graph and its voices
#[derive(Debug)]
pub(crate) struct SharedGain(AtomicU32);

impl SharedGain {
    pub(crate) fn new(gain: f32) -> Self {
        Self(AtomicU32::new(gain.to_bits()))
    }

    pub(crate) fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub(crate) fn set(&self, gain: f32) {
        self.0.store(gain.max(0.0).to_bits(), Ordering::Relaxed);
    }
}

struct Voice {
    id: u64,
    graph: u64,
    audio: Arc<DecodedAudio>,
    /// Read position in source frames
    position: f64,
    /// Source frames consumed per device frame
    step: f64,
    gain: Arc<SharedGain>,
    ended: Arc<AtomicBool>,
}

/// Sums voices into device buffers
pub struct Mixer {
    sample_rate: u32,
    voices: Mutex<Vec<Voice>>,
    frames_rendered: AtomicU64,
    next_id: AtomicU64,
    failed: AtomicBool,
}

impl Mixer {
    /// Create a mixer for a device running at `sample_rate`
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            voices: Mutex::new(Vec::new()),
            frames_rendered: AtomicU64::new(0),
            next_id: AtomicU64::new(1),
            failed: AtomicBool::new(false),
        }
    }

    /// Device sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Hardware clock: frames rendered divided by the device rate
    pub fn current_time(&self) -> f64 {
        self.frames_rendered.load(Ordering::Acquire) as f64 / f64::from(self.sample_rate)
    }

    /// Number of voices currently mixed
    pub fn voice_count(&self) -> usize {
        self.voices.lock().len()
    }

    /// Whether the device stream reported a fatal error
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    pub(crate) fn mark_failed(&self) {
        self.failed.store(true, Ordering::Release);
    }

    pub(crate) fn next_graph_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Add a voice starting `offset` seconds into `audio`
    pub(crate) fn add_voice(
        &self,
        graph: u64,
        audio: Arc<DecodedAudio>,
        offset: f64,
        gain: Arc<SharedGain>,
    ) -> (u64, Arc<AtomicBool>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let source_rate = f64::from(audio.sample_rate().max(1));
        let ended = Arc::new(AtomicBool::new(false));
        self.voices.lock().push(Voice {
            id,
            graph,
            position: offset.max(0.0) * source_rate,
            step: source_rate / f64::from(self.sample_rate),
            audio,
            gain,
            ended: Arc::clone(&ended),
        });
        (id, ended)
    }

    pub(crate) fn remove_voice(&self, id: u64) {
        self.voices.lock().retain(|v| v.id != id);
    }

    pub(crate) fn remove_graph(&self, graph: u64) {
        self.voices.lock().retain(|v| v.graph != graph);
    }

    /// Fill an interleaved f32 device buffer
    ///
    /// Runs on the real-time thread. Stereo voices map onto the first two
    /// device channels; a mono device gets the average of both sides.
    pub fn render(&self, out: &mut [f32], channels: usize) {
        out.fill(0.0);
        let channels = channels.max(1);
        let frames = out.len() / channels;

        {
            let mut voices = self.voices.lock();
            for voice in voices.iter_mut() {
                Self::mix_voice(voice, out, channels);
            }
            voices.retain(|v| !v.ended.load(Ordering::Relaxed));
        }

        self.frames_rendered
            .fetch_add(frames as u64, Ordering::AcqRel);
    }

    fn mix_voice(voice: &mut Voice, out: &mut [f32], channels: usize) {
        let gain = voice.gain.get();
        let total = voice.audio.frames();

        for frame in out.chunks_exact_mut(channels) {
            let index = voice.position as usize;
            if index >= total {
                voice.ended.store(true, Ordering::Relaxed);
                return;
            }

            let (l0, r0) = voice.audio.stereo_frame(index).unwrap_or((0.0, 0.0));
            let (l1, r1) = voice.audio.stereo_frame(index + 1).unwrap_or((l0, r0));
            let t = (voice.position - index as f64) as f32;
            let left = (l0 + (l1 - l0) * t) * gain;
            let right = (r0 + (r1 - r0) * t) * gain;

            if channels == 1 {
                frame[0] += (left + right) * 0.5;
            } else {
                frame[0] += left;
                frame[1] += right;
            }
            voice.position += voice.step;
        }

        if voice.position as usize >= total {
            voice.ended.store(true, Ordering::Relaxed);
        }
    }
}

impl std::fmt::Debug for Mixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mixer")
            .field("sample_rate", &self.sample_rate)
            .field("voices", &self.voice_count())
            .field("time", &self.current_time())
            .finish()
    }
}
