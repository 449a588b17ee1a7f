//! Drawing surface used by the compositor.
//!
//! `RasterSurface` is the small set of 2D-canvas operations the composite
//! needs. `Canvas` implements it in software over an `RgbaImage`, so the
//! output is byte-for-byte reproducible on every platform.

use super::RenderError;
use crate::geometry::PixelRect;
use image::imageops::{self, FilterType};
use image::{GrayImage, ImageFormat, Luma, Rgba, RgbaImage};
use std::io::Cursor;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Paint {
    Solid(Rgba<u8>),
    /// Horizontal gradient from x = 0 to x = width.
    LinearGradient { from: Rgba<u8>, to: Rgba<u8> },
}

/// Axis-aligned rectangle with circular corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundedRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub radius: f32,
}

impl RoundedRect {
    /// Anti-aliased coverage of the pixel centred at (`px`, `py`), in 0..=1.
    pub fn coverage(&self, px: f32, py: f32) -> f32 {
        let half_w = self.width / 2.0;
        let half_h = self.height / 2.0;
        let r = self.radius.clamp(0.0, half_w.min(half_h));

        let qx = (px - (self.x + half_w)).abs() - (half_w - r);
        let qy = (py - (self.y + half_h)).abs() - (half_h - r);
        let outside = qx.max(0.0).hypot(qy.max(0.0));
        let inside = qx.max(qy).min(0.0);
        let distance = outside + inside - r;

        (0.5 - distance).clamp(0.0, 1.0)
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}

/// Canvas-style drop shadow. `blur` is the canvas `shadowBlur` value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropShadow {
    pub color: Rgba<u8>,
    pub blur: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

pub trait RasterSurface: Sized {
    fn create(width: u32, height: u32) -> Self;
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Fill the whole surface (respecting the clip).
    fn fill(&mut self, paint: &Paint);
    /// Draw `source` scaled to cover the whole surface.
    fn draw_stretched(&mut self, source: &RgbaImage);
    /// Draw the blurred silhouette of `shape`. Shadows ignore the clip.
    fn draw_shadow(&mut self, shape: &RoundedRect, shadow: &DropShadow);
    fn set_clip(&mut self, clip: Option<RoundedRect>);
    /// Copy `region` of `source` so its top-left lands on (`dst_x`, `dst_y`).
    fn draw_region(&mut self, source: &RgbaImage, region: PixelRect, dst_x: i64, dst_y: i64);
    fn encode_png(&self) -> Result<Vec<u8>, RenderError>;
    fn into_image(self) -> RgbaImage;
}

/// Software `RasterSurface`.
#[derive(Debug, Clone)]
pub struct Canvas {
    pixels: RgbaImage,
    clip: Option<RoundedRect>,
}

impl Canvas {
    fn clip_coverage(&self, x: u32, y: u32) -> f32 {
        match &self.clip {
            Some(clip) => clip.coverage(x as f32 + 0.5, y as f32 + 0.5),
            None => 1.0,
        }
    }

    fn paint_at(&self, paint: &Paint, x: u32) -> Rgba<u8> {
        match *paint {
            Paint::Solid(color) => color,
            Paint::LinearGradient { from, to } => {
                let t = (x as f32 + 0.5) / self.pixels.width().max(1) as f32;
                lerp_color(from, to, t)
            }
        }
    }
}

impl RasterSurface for Canvas {
    fn create(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
            clip: None,
        }
    }

    fn width(&self) -> u32 {
        self.pixels.width()
    }

    fn height(&self) -> u32 {
        self.pixels.height()
    }

    fn fill(&mut self, paint: &Paint) {
        for y in 0..self.pixels.height() {
            for x in 0..self.pixels.width() {
                let coverage = self.clip_coverage(x, y);
                if coverage <= 0.0 {
                    continue;
                }
                let color = self.paint_at(paint, x);
                blend(self.pixels.get_pixel_mut(x, y), color, coverage);
            }
        }
    }

    fn draw_stretched(&mut self, source: &RgbaImage) {
        let (w, h) = self.pixels.dimensions();
        if w == 0 || h == 0 || source.width() == 0 || source.height() == 0 {
            return;
        }
        let scaled = imageops::resize(source, w, h, FilterType::Triangle);
        for (x, y, src) in scaled.enumerate_pixels() {
            let coverage = self.clip_coverage(x, y);
            if coverage > 0.0 {
                blend(self.pixels.get_pixel_mut(x, y), *src, coverage);
            }
        }
    }

    fn draw_shadow(&mut self, shape: &RoundedRect, shadow: &DropShadow) {
        let (w, h) = self.pixels.dimensions();
        if w == 0 || h == 0 || shadow.color.0[3] == 0 {
            return;
        }

        let moved = shape.translated(shadow.offset_x, shadow.offset_y);
        let mask = GrayImage::from_fn(w, h, |x, y| {
            Luma([(moved.coverage(x as f32 + 0.5, y as f32 + 0.5) * 255.0).round() as u8])
        });

        // Canvas shadowBlur is twice the Gaussian standard deviation.
        let sigma = shadow.blur / 2.0;
        let mask = if sigma >= 0.5 {
            imageops::blur(&mask, sigma)
        } else {
            mask
        };

        for (x, y, m) in mask.enumerate_pixels() {
            if m.0[0] == 0 {
                continue;
            }
            blend(self.pixels.get_pixel_mut(x, y), shadow.color, m.0[0] as f32 / 255.0);
        }
    }

    fn set_clip(&mut self, clip: Option<RoundedRect>) {
        self.clip = clip;
    }

    fn draw_region(&mut self, source: &RgbaImage, region: PixelRect, dst_x: i64, dst_y: i64) {
        let (w, h) = (self.pixels.width() as i64, self.pixels.height() as i64);
        for ry in 0..region.height as i64 {
            let (sy, dy) = (region.y + ry, dst_y + ry);
            if sy < 0 || sy >= source.height() as i64 || dy < 0 || dy >= h {
                continue;
            }
            for rx in 0..region.width as i64 {
                let (sx, dx) = (region.x + rx, dst_x + rx);
                if sx < 0 || sx >= source.width() as i64 || dx < 0 || dx >= w {
                    continue;
                }
                let coverage = self.clip_coverage(dx as u32, dy as u32);
                if coverage <= 0.0 {
                    continue;
                }
                let src = *source.get_pixel(sx as u32, sy as u32);
                blend(self.pixels.get_pixel_mut(dx as u32, dy as u32), src, coverage);
            }
        }
    }

    fn encode_png(&self) -> Result<Vec<u8>, RenderError> {
        let mut png_bytes: Vec<u8> = Vec::new();
        self.pixels
            .write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
            .map_err(|e| RenderError::Encode(e.to_string()))?;
        Ok(png_bytes)
    }

    fn into_image(self) -> RgbaImage {
        self.pixels
    }
}

fn lerp_color(from: Rgba<u8>, to: Rgba<u8>, t: f32) -> Rgba<u8> {
    let t = t.clamp(0.0, 1.0);
    let mut out = [0u8; 4];
    for (i, channel) in out.iter_mut().enumerate() {
        let a = from.0[i] as f32;
        let b = to.0[i] as f32;
        *channel = (a + (b - a) * t).round() as u8;
    }
    Rgba(out)
}

/// Source-over compositing of `src` (scaled by `coverage`) onto `dst`.
fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>, coverage: f32) {
    let sa = src.0[3] as f32 / 255.0 * coverage;
    if sa <= 0.0 {
        return;
    }
    let da = dst.0[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);

    for i in 0..3 {
        let sc = src.0[i] as f32;
        let dc = dst.0[i] as f32;
        let c = (sc * sa + dc * da * (1.0 - sa)) / out_a;
        dst.0[i] = c.round().clamp(0.0, 255.0) as u8;
    }
    dst.0[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}
