use std::io::Cursor;

use image::{ImageError, ImageFormat, RgbaImage};
use thiserror::Error;

use crate::model::{DataUri, DataUriError};

pub const SNAPSHOT_MIME: &str = "image/png";
/// Snapshots written before drawings switched to PNG.
const LEGACY_SNAPSHOT_MIME: &str = "image/x-portable-arbitrarymap";

pub type Rgba = [u8; 4];

pub const INK_BLACK: Rgba = [0, 0, 0, 255];
pub const INK_WHITE: Rgba = [255, 255, 255, 255];
const TRANSPARENT: Rgba = [0, 0, 0, 0];

/// Radius of the round pen tip; a 2px line width.
const PEN_RADIUS: i32 = 1;

#[derive(Debug, Error)]
pub enum CanvasError {
    #[error(transparent)]
    DataUri(#[from] DataUriError),
    #[error("unsupported snapshot format: {0}")]
    UnsupportedFormat(String),
    #[error("snapshot image is invalid: {0}")]
    Image(#[from] ImageError),
}

/// RGBA raster that starts fully transparent, like an HTML canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = self.offset(x, y);
        let mut rgba = TRANSPARENT;
        rgba.copy_from_slice(&self.pixels[offset..offset + 4]);
        Some(rgba)
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.chunks_exact(4).all(|px| px[3] == 0)
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Changing the size wipes the content.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels = vec![0; width as usize * height as usize * 4];
    }

    /// Strokes a round-capped segment between two points.
    pub fn stroke(&mut self, from: (i32, i32), to: (i32, i32), ink: Rgba) {
        let (mut x, mut y) = from;
        let dx = (to.0 - x).abs();
        let dy = -(to.1 - y).abs();
        let sx = if x < to.0 { 1 } else { -1 };
        let sy = if y < to.1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.stamp(x, y, ink);
            if x == to.0 && y == to.1 {
                break;
            }
            let doubled = 2 * err;
            if doubled >= dy {
                err += dy;
                x += sx;
            }
            if doubled <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    pub fn to_data_uri(&self) -> Result<String, CanvasError> {
        let image = RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .ok_or_else(|| CanvasError::UnsupportedFormat("raster size mismatch".into()))?;
        let mut data = Cursor::new(Vec::new());
        image.write_to(&mut data, ImageFormat::Png)?;
        Ok(DataUri {
            mime: SNAPSHOT_MIME.to_string(),
            data: data.into_inner(),
        }
        .to_string())
    }

    /// Paints a PNG (or older PAM) snapshot at the origin, clipped to the current size.
    pub fn draw_data_uri(&mut self, uri: &str) -> Result<(), CanvasError> {
        let uri: DataUri = uri.parse()?;
        let format = match uri.essence() {
            SNAPSHOT_MIME => ImageFormat::Png,
            LEGACY_SNAPSHOT_MIME => ImageFormat::Pnm,
            other => return Err(CanvasError::UnsupportedFormat(other.to_string())),
        };
        let decoded = image::load_from_memory_with_format(&uri.data, format)?.to_rgba8();
        let cols = decoded.width().min(self.width);
        let rows = decoded.height().min(self.height);
        for y in 0..rows {
            for x in 0..cols {
                let px = decoded.get_pixel(x, y).0;
                if px[3] == 0 {
                    continue;
                }
                let dst = self.offset(x, y);
                self.pixels[dst..dst + 4].copy_from_slice(&px);
            }
        }
        Ok(())
    }

    fn stamp(&mut self, cx: i32, cy: i32, ink: Rgba) {
        for dy in -PEN_RADIUS..=PEN_RADIUS {
            for dx in -PEN_RADIUS..=PEN_RADIUS {
                if dx * dx + dy * dy > PEN_RADIUS * PEN_RADIUS {
                    continue;
                }
                let (x, y) = (cx + dx, cy + dy);
                if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
                    continue;
                }
                let offset = self.offset(x as u32, y as u32);
                self.pixels[offset..offset + 4].copy_from_slice(&ink);
            }
        }
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn stroke_marks_both_endpoints() {
        let mut canvas = Canvas::new(20, 20);
        assert!(canvas.is_blank());
        canvas.stroke((2, 2), (15, 9), INK_BLACK);
        assert_eq!(canvas.pixel(2, 2), Some(INK_BLACK));
        assert_eq!(canvas.pixel(15, 9), Some(INK_BLACK));
        assert_eq!(canvas.pixel(19, 0), Some(TRANSPARENT));
        assert!(!canvas.is_blank());
    }

    #[test]
    fn strokes_clip_at_edges() {
        let mut canvas = Canvas::new(4, 4);
        canvas.stroke((-3, 0), (10, 0), INK_WHITE);
        assert_eq!(canvas.pixel(0, 0), Some(INK_WHITE));
        assert_eq!(canvas.pixel(3, 1), Some(INK_WHITE));
        assert_eq!(canvas.pixel(4, 0), None);
    }

    #[test]
    fn snapshot_redraws_identically() -> anyhow::Result<()> {
        let mut canvas = Canvas::new(12, 8);
        canvas.stroke((1, 1), (10, 6), INK_WHITE);
        let snapshot = canvas.to_data_uri()?;
        assert!(snapshot.starts_with("data:image/png;base64,"));

        let mut restored = Canvas::new(12, 8);
        restored.draw_data_uri(&snapshot)?;
        assert_eq!(restored, canvas);
        Ok(())
    }

    #[test]
    fn snapshot_is_clipped_into_smaller_canvas() -> anyhow::Result<()> {
        let mut canvas = Canvas::new(10, 10);
        canvas.stroke((8, 8), (8, 8), INK_BLACK);
        canvas.stroke((1, 1), (1, 1), INK_BLACK);
        let snapshot = canvas.to_data_uri()?;

        let mut small = Canvas::new(5, 5);
        small.draw_data_uri(&snapshot)?;
        assert_eq!(small.pixel(1, 1), Some(INK_BLACK));
        assert_eq!(small.pixel(4, 4), Some(TRANSPARENT));
        Ok(())
    }

    #[test]
    fn draws_png_produced_elsewhere() -> anyhow::Result<()> {
        let mut source = RgbaImage::new(1, 1);
        source.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        let mut data = Cursor::new(Vec::new());
        source.write_to(&mut data, ImageFormat::Png)?;
        let uri = DataUri {
            mime: "image/png".into(),
            data: data.into_inner(),
        };

        let mut canvas = Canvas::new(4, 4);
        canvas.draw_data_uri(&uri.to_string())?;
        assert_eq!(canvas.pixel(0, 0), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(1, 0), Some(TRANSPARENT));
        Ok(())
    }

    #[test]
    fn draws_older_pam_snapshots() -> anyhow::Result<()> {
        let mut data =
            b"P7\nWIDTH 2\nHEIGHT 1\nDEPTH 4\nMAXVAL 255\nTUPLTYPE RGB_ALPHA\nENDHDR\n".to_vec();
        data.extend_from_slice(&[0, 0, 0, 255, 0, 0, 0, 0]);
        let uri = DataUri {
            mime: LEGACY_SNAPSHOT_MIME.into(),
            data,
        };

        let mut canvas = Canvas::new(3, 3);
        canvas.draw_data_uri(&uri.to_string())?;
        assert_eq!(canvas.pixel(0, 0), Some(INK_BLACK));
        assert_eq!(canvas.pixel(1, 0), Some(TRANSPARENT));
        Ok(())
    }

    #[test]
    fn foreign_images_are_rejected() {
        let mut canvas = Canvas::new(2, 2);
        assert_matches!(
            canvas.draw_data_uri("data:image/gif;base64,R0lGODlh"),
            Err(CanvasError::UnsupportedFormat(_))
        );
        assert_matches!(
            canvas.draw_data_uri("data:image/png;base64,iVBORw0KGgo="),
            Err(CanvasError::Image(_))
        );
        assert_matches!(
            canvas.draw_data_uri("not a uri"),
            Err(CanvasError::DataUri(_))
        );
    }
}
