use std::io::Cursor;
use std::path::Path;
use image::{ImageResult, RgbaImage};
use crate::framebuffer::{Canvas, Color};
use crate::types::{PixelSample, SignalFloat};

/// 4x4 ordered dither thresholds.
const BAYER: [[u8; 4]; 4] = [
    [0, 8, 2, 10],
    [12, 4, 14, 6],
    [3, 11, 1, 9],
    [15, 7, 13, 5],
];

/// A still image reduced to luma, ready to be dithered into double-density pixels.
pub struct Picture {
    width: usize,
    height: usize,
    luma: Vec<SignalFloat>,
}

impl Picture {
    /// Decode an image from a buffer (e.g. obtained from include_bytes!).
    pub fn from_image_buf(buf: &[u8]) -> ImageResult<Self> {
        let img = image::io::Reader::new(Cursor::new(buf))
            .with_guessed_format()?
            .decode()?
            .into_rgba8();
        Ok(Self::from_rgba(&img))
    }

    pub fn open(path: &Path) -> ImageResult<Self> {
        Ok(Self::from_rgba(&image::open(path)?.into_rgba8()))
    }

    pub fn from_rgba(img: &RgbaImage) -> Self {
        let luma = img
            .pixels()
            .map(|p| Self::luma((p[0], p[1], p[2], p[3])))
            .collect();
        Self {
            width: img.width() as usize,
            height: img.height() as usize,
            luma,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Stretch over the whole canvas and dither to double-density black and white.
    pub fn draw(&self, canvas: &mut Canvas) {
        if self.width == 0 || self.height == 0 {
            return;
        }
        let (cw, ch) = (canvas.width(), canvas.height());
        for y in 0..ch {
            for x in 0..cw {
                let luma = self.luma[(y * self.height / ch) * self.width + x * self.width / cw];
                let threshold = (BAYER[y % 4][x % 4] as SignalFloat + 0.5) / 16.0;
                let color = if luma > threshold { Color::DdWhite } else { Color::DdBlack };
                canvas.set(x, y, color);
            }
        }
    }

    /// Luma of an rgba pixel, 0.0 to 1.0.
    fn luma((r, g, b, _): PixelSample) -> SignalFloat {
        let r = r as SignalFloat / 255.0;
        let g = g as SignalFloat / 255.0;
        let b = b as SignalFloat / 255.0;

        // https://en.wikipedia.org/wiki/YIQ
        0.3 * r + 0.59 * g + 0.11 * b
    }
}
