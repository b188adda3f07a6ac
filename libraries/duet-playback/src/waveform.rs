//! Peak-envelope waveform rendering with a comment-marker overlay
//!
//! The first channel of the decoded audio is split into one contiguous
//! bucket per horizontal pixel. Each bucket's `(min, max)` becomes a vertical
//! line, drawn once in the unplayed colour and again, clipped to the played
//! span, in the played colour. Marker ticks are drawn on top.

use crate::types::{format_clock, Color, WaveformPalette};
use duet_core::{DecodedAudio, Marker};
use std::sync::{Arc, Weak};

/// Drawing surface for the waveform
///
/// Coordinates are pixels with the origin at the top-left corner.
pub trait WaveformCanvas: Send {
    /// Width and height in pixels
    fn size(&self) -> (u32, u32);

    /// Fill the whole surface, ignoring any clip
    fn clear(&mut self, color: Color);

    /// Restrict drawing to columns in `[start, end)`; `None` removes the clip
    fn set_clip(&mut self, span: Option<(f32, f32)>);

    /// Draw column `x` from `top` to `bottom` inclusive
    fn vertical_line(&mut self, x: u32, top: f32, bottom: f32, color: Color);

    /// Draw row `y` from `left` to `right`
    fn horizontal_line(&mut self, y: f32, left: f32, right: f32, color: Color);
}

/// Per-pixel `(min, max)` of one channel
#[derive(Debug, Clone, PartialEq)]
pub struct PeakEnvelope {
    peaks: Vec<(f32, f32)>,
}

impl PeakEnvelope {
    /// Bucket the first channel of `audio` into `width` columns
    ///
    /// When there are fewer samples than columns, empty buckets take the
    /// nearest sample so the envelope has no gaps.
    pub fn compute(audio: &DecodedAudio, width: u32) -> Self {
        let samples: Vec<f32> = audio.channel(0).collect();
        Self::from_samples(&samples, width)
    }

    /// Bucket raw mono samples into `width` columns
    pub fn from_samples(samples: &[f32], width: u32) -> Self {
        let width = width as usize;
        if width == 0 || samples.is_empty() {
            return Self {
                peaks: vec![(0.0, 0.0); width],
            };
        }

        let len = samples.len();
        let peaks = (0..width)
            .map(|column| {
                let start = column * len / width;
                let end = ((column + 1) * len / width).min(len);
                if start >= end {
                    let sample = samples[start.min(len - 1)];
                    return (sample, sample);
                }
                samples[start..end]
                    .iter()
                    .fold((f32::MAX, f32::MIN), |(lo, hi), &s| (lo.min(s), hi.max(s)))
            })
            .collect();

        Self { peaks }
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.peaks.len()
    }

    /// `(min, max)` per column
    pub fn peaks(&self) -> &[(f32, f32)] {
        &self.peaks
    }
}

/// What a hovered marker shows
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerPreview {
    /// Comment id
    pub id: String,

    /// Comment text
    pub content: String,

    /// Author display name
    pub author: String,

    /// Author avatar, if any
    pub avatar_url: Option<String>,

    /// Position in seconds
    pub timestamp: f64,

    /// Position formatted as `m:ss`
    pub label: String,
}

impl From<&Marker> for MarkerPreview {
    fn from(marker: &Marker) -> Self {
        Self {
            id: marker.id.clone(),
            content: marker.content.clone(),
            author: marker.author.display_name.clone(),
            avatar_url: marker.author.avatar_url.clone(),
            timestamp: marker.timestamp,
            label: format_clock(marker.timestamp),
        }
    }
}

/// Everything one frame of the waveform depends on
#[derive(Clone, Copy)]
pub struct WaveformFrame<'a> {
    /// Decoded audio, once loaded
    pub audio: Option<&'a Arc<DecodedAudio>>,

    /// Played fraction in `[0, 1]`
    pub progress: f64,

    /// Track length used to place markers
    pub duration: Option<f64>,

    /// Markers sorted by timestamp
    pub markers: &'a [Marker],
}

/// Draws waveforms and answers marker hit-tests
///
/// The envelope is cached per (audio, width) and rebuilt only when either
/// changes.
#[derive(Debug)]
pub struct WaveformRenderer {
    palette: WaveformPalette,
    hit_radius: f32,
    hovered: Option<usize>,
    cache: Option<(Weak<DecodedAudio>, u32, PeakEnvelope)>,
}

impl WaveformRenderer {
    /// Create a renderer
    pub fn new(palette: WaveformPalette, hit_radius: f32) -> Self {
        Self {
            palette,
            hit_radius: hit_radius.max(0.0),
            hovered: None,
            cache: None,
        }
    }

    /// Index of the hovered marker
    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    /// Set the hovered marker; returns whether it changed
    pub fn set_hovered(&mut self, index: Option<usize>) -> bool {
        let changed = self.hovered != index;
        self.hovered = index;
        changed
    }

    /// Forget the cached envelope
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    /// Horizontal position of `timestamp` on a surface `width` pixels wide
    pub fn marker_x(timestamp: f64, duration: f64, width: u32) -> f32 {
        if duration <= 0.0 {
            return 0.0;
        }
        (f64::from(width) * (timestamp / duration).clamp(0.0, 1.0)) as f32
    }

    /// Marker whose tick lies within the hit radius of `x`, nearest first
    pub fn marker_at(&self, x: f32, width: u32, duration: f64, markers: &[Marker]) -> Option<usize> {
        if duration <= 0.0 {
            return None;
        }
        markers
            .iter()
            .enumerate()
            .map(|(index, marker)| {
                let distance = (Self::marker_x(marker.timestamp, duration, width) - x).abs();
                (index, distance)
            })
            .filter(|&(_, distance)| distance <= self.hit_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    /// Draw one frame
    pub fn render(&mut self, canvas: &mut dyn WaveformCanvas, frame: WaveformFrame<'_>) {
        let (width, height) = canvas.size();
        canvas.set_clip(None);
        canvas.clear(self.palette.background);
        if width == 0 || height == 0 {
            return;
        }

        let center = height as f32 / 2.0;
        match frame.audio {
            Some(audio) => {
                let palette = self.palette;
                let envelope = self.envelope(audio, width);
                Self::draw_envelope(canvas, envelope, center, palette.unplayed);

                let played = (f64::from(width) * frame.progress.clamp(0.0, 1.0)) as f32;
                if played > 0.0 {
                    canvas.set_clip(Some((0.0, played)));
                    Self::draw_envelope(canvas, envelope, center, palette.played);
                    canvas.set_clip(None);
                }
            }
            None => {
                canvas.horizontal_line(center, 0.0, width as f32, self.palette.unplayed);
            }
        }

        if let Some(duration) = frame.duration.filter(|d| *d > 0.0) {
            for (index, marker) in frame.markers.iter().enumerate() {
                let x = Self::marker_x(marker.timestamp, duration, width).round() as u32;
                let color = if self.hovered == Some(index) {
                    self.palette.marker_hover
                } else {
                    self.palette.marker
                };
                canvas.vertical_line(x.min(width - 1), 0.0, (height - 1) as f32, color);
            }
        }
    }

    fn envelope(&mut self, audio: &Arc<DecodedAudio>, width: u32) -> &PeakEnvelope {
        let fresh = matches!(
            &self.cache,
            Some((cached, cached_width, _))
                if *cached_width == width && Weak::ptr_eq(cached, &Arc::downgrade(audio))
        );
        if !fresh {
            self.cache = None;
        }
        let (_, _, envelope) = self.cache.get_or_insert_with(|| {
            (Arc::downgrade(audio), width, PeakEnvelope::compute(audio, width))
        });
        envelope
    }

    fn draw_envelope(
        canvas: &mut dyn WaveformCanvas,
        envelope: &PeakEnvelope,
        center: f32,
        color: Color,
    ) {
        for (x, &(min, max)) in envelope.peaks().iter().enumerate() {
            let top = center * (1.0 + min);
            let bottom = center * (1.0 + max);
            canvas.vertical_line(x as u32, top, bottom, color);
        }
    }
}
