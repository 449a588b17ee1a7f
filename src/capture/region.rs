//! Pure region cropping logic: functional core.
//!
//! This module has zero infrastructure dependencies.
//! It takes pixel data in, returns pixel data out.

use crate::geometry::PixelRect;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;

/// A crop may overhang the viewport, but neither side may exceed this many
/// times the viewport's longer side.
pub const MAX_OVERHANG_FACTOR: u64 = 4;

/// Copies `rect` out of `source` into a new buffer of exactly
/// `rect.width × rect.height` pixels, with the region's top-left at (0,0).
///
/// Pixels of `rect` that fall outside `source` stay fully transparent,
/// the same as drawing a partially off-canvas source region. No resampling.
/// Rectangles far larger than the viewport are rejected with
/// [`CropError::TooLarge`] before anything is allocated.
pub fn crop(source: &RgbaImage, rect: PixelRect) -> Result<RgbaImage, CropError> {
    if rect.is_empty() {
        return Err(CropError::ZeroDimension);
    }

    let limit = source.width().max(source.height()).max(1) as u64 * MAX_OVERHANG_FACTOR;
    if rect.width as u64 > limit || rect.height as u64 > limit {
        return Err(CropError::TooLarge {
            width: rect.width,
            height: rect.height,
            limit,
        });
    }

    let mut out = RgbaImage::new(rect.width, rect.height);

    let (src_w, src_h) = (source.width() as i64, source.height() as i64);
    let x0 = rect.x.max(0);
    let y0 = rect.y.max(0);
    let x1 = rect.x.saturating_add(rect.width as i64).min(src_w);
    let y1 = rect.y.saturating_add(rect.height as i64).min(src_h);

    if x0 >= x1 || y0 >= y1 {
        log::warn!(
            "[CAPTURE] Crop rectangle ({},{},{},{}) lies outside the {}x{} viewport",
            rect.x, rect.y, rect.width, rect.height, src_w, src_h
        );
        return Ok(out);
    }

    let row_len = ((x1 - x0) * 4) as usize;
    let src_stride = source.width() as usize * 4;
    let dst_stride = rect.width as usize * 4;
    let src_raw = source.as_raw();
    let dst_raw: &mut [u8] = &mut out;

    for y in y0..y1 {
        let src_start = y as usize * src_stride + x0 as usize * 4;
        let dst_start = (y - rect.y) as usize * dst_stride + (x0 - rect.x) as usize * 4;
        dst_raw[dst_start..dst_start + row_len]
            .copy_from_slice(&src_raw[src_start..src_start + row_len]);
    }

    Ok(out)
}

/// Crops a viewport capture to `rect` and returns PNG bytes.
///
/// This is a pure function with no side effects.
pub fn crop_to_png_bytes(source: &RgbaImage, rect: PixelRect) -> Result<Vec<u8>, CropError> {
    let cropped = crop(source, rect)?;
    encode_png(&cropped)
}

/// Lossless PNG encoding of an RGBA buffer.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, CropError> {
    let mut png_bytes: Vec<u8> = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
        .map_err(|e| CropError::EncodingFailed(e.to_string()))?;
    Ok(png_bytes)
}

#[derive(Debug, thiserror::Error)]
pub enum CropError {
    #[error("Crop rectangle has zero width or height")]
    ZeroDimension,

    #[error("Crop rectangle {width}x{height} exceeds the {limit}px limit for this viewport")]
    TooLarge { width: u32, height: u32, limit: u64 },

    #[error("PNG encoding failed: {0}")]
    EncodingFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient_viewport(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| Rgba([x as u8, y as u8, (x ^ y) as u8, 255]))
    }

    #[test]
    fn crop_valid_region() {
        let img = gradient_viewport(100, 100);
        let rect = PixelRect { x: 10, y: 20, width: 50, height: 30 };
        let out = crop(&img, rect).unwrap();
        assert_eq!(out.dimensions(), (50, 30));
        assert_eq!(out.get_pixel(0, 0), img.get_pixel(10, 20));
        assert_eq!(out.get_pixel(49, 29), img.get_pixel(59, 49));
    }

    #[test]
    fn crop_png_has_magic_bytes() {
        let img = gradient_viewport(100, 100);
        let bytes = crop_to_png_bytes(&img, PixelRect { x: 10, y: 10, width: 50, height: 50 }).unwrap();
        assert_eq!(&bytes[..4], &[0x89, 0x50, 0x4E, 0x47]);
    }

    #[test]
    fn crop_zero_dimension_fails() {
        let img = gradient_viewport(100, 100);
        let result = crop(&img, PixelRect { x: 0, y: 0, width: 0, height: 50 });
        assert!(matches!(result, Err(CropError::ZeroDimension)));
    }

    #[test]
    fn crop_past_the_edge_is_transparent() {
        let img = gradient_viewport(100, 100);
        let out = crop(&img, PixelRect { x: 80, y: -10, width: 30, height: 30 }).unwrap();
        assert_eq!(out.dimensions(), (30, 30));
        // Above the viewport.
        assert_eq!(out.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
        // Right of the viewport.
        assert_eq!(out.get_pixel(25, 15), &Rgba([0, 0, 0, 0]));
        // Inside.
        assert_eq!(out.get_pixel(0, 10), img.get_pixel(80, 0));
        assert_eq!(out.get_pixel(19, 29), img.get_pixel(99, 19));
    }

    #[test]
    fn crop_entirely_outside_is_blank() {
        let img = gradient_viewport(10, 10);
        let out = crop(&img, PixelRect { x: 50, y: 50, width: 4, height: 4 }).unwrap();
        assert!(out.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn crop_far_off_screen_does_not_overflow() {
        let img = gradient_viewport(10, 10);
        let out = crop(&img, PixelRect { x: i64::MAX, y: i64::MIN, width: 5, height: 5 }).unwrap();
        assert_eq!(out.dimensions(), (5, 5));
        assert!(out.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn crop_much_larger_than_viewport_is_rejected() {
        let img = gradient_viewport(10, 10);
        let result = crop(&img, PixelRect { x: 0, y: 0, width: 2_000_000, height: 2_000_000 });
        assert!(matches!(
            result,
            Err(CropError::TooLarge { width: 2_000_000, height: 2_000_000, limit: 40 })
        ));
        // Within the overhang allowance is fine.
        assert!(crop(&img, PixelRect { x: -5, y: -5, width: 40, height: 40 }).is_ok());
    }

    #[test]
    fn crop_is_idempotent_under_identical_inputs() {
        let img = gradient_viewport(64, 48);
        let rect = PixelRect { x: 5, y: 7, width: 20, height: 11 };
        let first = crop_to_png_bytes(&img, rect).unwrap();
        let second = crop_to_png_bytes(&img, rect).unwrap();
        assert_eq!(first, second);
    }
}
