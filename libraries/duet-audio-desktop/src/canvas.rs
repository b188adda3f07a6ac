//! RGBA raster surface for waveform drawing
use crate::error::Result;
use duet_playback::{Color, WaveformCanvas};
use image::{ImageFormat, Rgba, RgbaImage};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// [`WaveformCanvas`] over an in-memory `RgbaImage`
///
/// The image is shared so a UI thread can blit it while the session draws.
#[derive(Debug, Clone)]
pub struct RasterCanvas {
    image: Arc<Mutex<RgbaImage>>,
    clip: Option<(f32, f32)>,
}

impl RasterCanvas {
    /// Transparent canvas of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: Arc::new(Mutex::new(RgbaImage::new(width, height))),
            clip: None,
        }
    }

    /// Shared handle to the pixels
    pub fn shared(&self) -> Arc<Mutex<RgbaImage>> {
        Arc::clone(&self.image)
    }

    /// Copy of the current pixels
    pub fn snapshot(&self) -> RgbaImage {
        self.image.lock().clone()
    }

    /// Write the current pixels as PNG
    pub fn save_png(&self, path: &Path) -> Result<()> {
        self.image.lock().save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }

    fn column_visible(&self, x: u32) -> bool {
        match self.clip {
            Some((start, end)) => {
                let x = x as f32;
                x >= start && x < end
            }
            None => true,
        }
    }
}

impl WaveformCanvas for RasterCanvas {
    fn size(&self) -> (u32, u32) {
        self.image.lock().dimensions()
    }

    fn clear(&mut self, color: Color) {
        let pixel = Rgba(color.0);
        for p in self.image.lock().pixels_mut() {
            *p = pixel;
        }
    }

    fn set_clip(&mut self, span: Option<(f32, f32)>) {
        self.clip = span;
    }

    fn vertical_line(&mut self, x: u32, top: f32, bottom: f32, color: Color) {
        if !self.column_visible(x) || top > bottom {
            return;
        }
        let mut image = self.image.lock();
        let (width, height) = image.dimensions();
        if x >= width || height == 0 || bottom < 0.0 {
            return;
        }

        let first = top.max(0.0).floor() as u32;
        let last = (bottom.ceil() as u32).min(height - 1);
        for y in first..=last {
            image.put_pixel(x, y, Rgba(color.0));
        }
    }

    fn horizontal_line(&mut self, y: f32, left: f32, right: f32, color: Color) {
        let visible: Vec<u32> = {
            let (width, _) = self.size();
            let first = left.max(0.0).floor() as u32;
            let end = (right.ceil().max(0.0) as u32).min(width);
            (first..end).filter(|x| self.column_visible(*x)).collect()
        };

        let mut image = self.image.lock();
        let height = image.height();
        if y < 0.0 || height == 0 {
            return;
        }
        let row = (y.round() as u32).min(height - 1);
        for x in visible {
            image.put_pixel(x, row, Rgba(color.0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::rgb(255, 0, 0);
    const BLUE: Color = Color::rgb(0, 0, 255);

    #[test]
    fn clear_fills_everything() {
        let mut canvas = RasterCanvas::new(4, 3);
        canvas.set_clip(Some((0.0, 1.0)));
        canvas.clear(RED);
        assert!(canvas.snapshot().pixels().all(|p| p.0 == RED.0));
    }

    #[test]
    fn vertical_line_is_inclusive_and_clamped() {
        let mut canvas = RasterCanvas::new(3, 10);
        canvas.vertical_line(1, 2.0, 4.0, BLUE);
        canvas.vertical_line(2, -5.0, 50.0, RED);
        canvas.vertical_line(7, 0.0, 5.0, RED);

        let image = canvas.snapshot();
        let painted: Vec<u32> = (0..10).filter(|y| image.get_pixel(1, *y).0 == BLUE.0).collect();
        assert_eq!(painted, vec![2, 3, 4]);
        assert!((0..10).all(|y| image.get_pixel(2, y).0 == RED.0));
    }

    #[test]
    fn clip_limits_columns() {
        let mut canvas = RasterCanvas::new(10, 2);
        canvas.set_clip(Some((0.0, 4.0)));
        for x in 0..10 {
            canvas.vertical_line(x, 0.0, 1.0, RED);
        }
        canvas.set_clip(None);
        canvas.horizontal_line(1.0, 6.0, 10.0, BLUE);

        let image = canvas.snapshot();
        let red: Vec<u32> = (0..10).filter(|x| image.get_pixel(*x, 0).0 == RED.0).collect();
        assert_eq!(red, vec![0, 1, 2, 3]);
        let blue: Vec<u32> = (0..10).filter(|x| image.get_pixel(*x, 1).0 == BLUE.0).collect();
        assert_eq!(blue, vec![6, 7, 8, 9]);
    }

    #[test]
    fn saves_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wave.png");
        let mut canvas = RasterCanvas::new(8, 4);
        canvas.clear(RED);
        canvas.save_png(&path).unwrap();

        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded.dimensions(), (8, 4));
    }
}
