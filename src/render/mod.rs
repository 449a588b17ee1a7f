//! Composite rendering: the cropped capture on a styled background.
//!
//! `render` is a pure function of (image, style, resolved wallpaper).
//! Fetching wallpapers is the caller's job; see `wallpaper`.

mod background;
mod surface;
pub mod wallpaper;

pub use background::{format_color, parse_color, Background, BackgroundParseError, PLACEHOLDER_COLOR};
pub use surface::{Canvas, DropShadow, Paint, RasterSurface, RoundedRect};
pub use wallpaper::{HttpWallpaperProvider, NoWallpapers, WallpaperProvider};

use crate::geometry::PixelRect;
use crate::settings::{StyleParams, MAX_PADDING, MAX_SHADOW};
use image::{Rgba, RgbaImage};

/// rgba(0, 0, 0, 0.4)
pub const SHADOW_COLOR: Rgba<u8> = Rgba([0, 0, 0, 102]);

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Background fetch failed: {0}")]
    BackgroundFetch(String),

    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

/// One rendered frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeResult {
    pub image: RgbaImage,
    /// False while a wallpaper background is shown as the placeholder fill.
    pub background_resolved: bool,
}

impl CompositeResult {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, RenderError> {
        crate::capture::encode_png(&self.image).map_err(|e| RenderError::Encode(e.to_string()))
    }

    pub fn to_data_url(&self) -> Result<String, RenderError> {
        Ok(crate::storage::to_png_data_url(&self.encode_png()?))
    }
}

/// Corner radius actually used: never more than half the shorter side.
pub fn effective_radius(width: u32, height: u32, border_radius: u32) -> f32 {
    let limit = width.min(height) as f32 / 2.0;
    (border_radius as f32).min(limit)
}

/// Render with the software canvas.
pub fn render(image: &RgbaImage, style: &StyleParams, wallpaper: Option<&RgbaImage>) -> CompositeResult {
    let canvas: Canvas = render_on(image, style, wallpaper);
    CompositeResult {
        image: canvas.into_image(),
        background_resolved: !style.background.is_wallpaper() || wallpaper.is_some(),
    }
}

/// Draw the composite onto any `RasterSurface`.
///
/// Padding and shadow above the popup's slider range are clamped.
pub fn render_on<S: RasterSurface>(
    image: &RgbaImage,
    style: &StyleParams,
    wallpaper: Option<&RgbaImage>,
) -> S {
    let (w, h) = image.dimensions();
    let padding = style.padding.min(MAX_PADDING);
    let border = padding * 2;
    let mut surface = S::create(w.saturating_add(border), h.saturating_add(border));

    match (&style.background, wallpaper) {
        (Background::Solid(color), _) => surface.fill(&Paint::Solid(*color)),
        (Background::Gradient { from, to }, _) => surface.fill(&Paint::LinearGradient {
            from: *from,
            to: *to,
        }),
        (Background::Wallpaper(_), Some(resolved)) => {
            surface.fill(&Paint::Solid(PLACEHOLDER_COLOR));
            surface.draw_stretched(resolved);
        }
        (Background::Wallpaper(_), None) => surface.fill(&Paint::Solid(PLACEHOLDER_COLOR)),
    }

    let shape = RoundedRect {
        x: padding as f32,
        y: padding as f32,
        width: w as f32,
        height: h as f32,
        radius: effective_radius(w, h, style.border_radius),
    };

    if style.shadow > 0 {
        let intensity = style.shadow.min(MAX_SHADOW) as f32;
        surface.draw_shadow(
            &shape,
            &DropShadow {
                color: SHADOW_COLOR,
                blur: intensity * 1.5,
                offset_x: 0.0,
                offset_y: intensity / 2.0,
            },
        );
    }

    surface.set_clip(Some(shape));
    surface.draw_region(
        image,
        PixelRect { x: 0, y: 0, width: w, height: h },
        padding as i64,
        padding as i64,
    );
    surface.set_clip(None);

    log::debug!(
        "[RENDER] Composite {}x{} (padding={}, radius={}, shadow={}, background={})",
        surface.width(),
        surface.height(),
        padding,
        shape.radius,
        style.shadow,
        style.background
    );

    surface
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| Rgba([(x * 7) as u8, (y * 5) as u8, 128, 255]))
    }

    fn style(padding: u32, border_radius: u32, shadow: u32, background: &str) -> StyleParams {
        StyleParams {
            padding,
            border_radius,
            shadow,
            background: Background::parse(background).unwrap(),
        }
    }

    #[test]
    fn radius_is_clamped_to_half_the_short_side() {
        assert_eq!(effective_radius(200, 100, 500), 50.0);
        assert_eq!(effective_radius(200, 100, 20), 20.0);
        assert_eq!(effective_radius(7, 30, 100), 3.5);
    }

    #[test]
    fn canvas_grows_by_twice_the_padding() {
        let out = render(&sample(30, 20), &style(40, 0, 0, "#ffffff"), None);
        assert_eq!((out.width(), out.height()), (110, 100));
        assert!(out.background_resolved);
    }

    #[test]
    fn image_lands_at_padded_offset() {
        let img = sample(30, 20);
        let out = render(&img, &style(10, 0, 0, "#000000"), None);
        assert_eq!(out.image.get_pixel(10, 10), img.get_pixel(0, 0));
        assert_eq!(out.image.get_pixel(39, 29), img.get_pixel(29, 19));
        assert_eq!(out.image.get_pixel(5, 5).0, [0, 0, 0, 255]);
    }

    #[test]
    fn rounded_corners_show_background() {
        let img = RgbaImage::from_pixel(40, 40, Rgba([255, 0, 0, 255]));
        let out = render(&img, &style(10, 15, 0, "#0000ff"), None);
        // Top-left corner of the image area is cut away.
        assert_eq!(out.image.get_pixel(10, 10).0, [0, 0, 255, 255]);
        // Centre is the image.
        assert_eq!(out.image.get_pixel(30, 30).0, [255, 0, 0, 255]);
    }

    #[test]
    fn shadow_falls_below_the_image() {
        let img = RgbaImage::from_pixel(20, 20, Rgba([255, 255, 255, 255]));
        let out = render(&img, &style(30, 0, 10, "#ffffff"), None);
        let below = out.image.get_pixel(40, 52);
        let above = out.image.get_pixel(40, 22);
        assert!(below.0[0] < above.0[0], "below={:?} above={:?}", below, above);
    }

    #[test]
    fn out_of_range_style_is_clamped() {
        let out = render(&sample(4, 4), &style(u32::MAX, u32::MAX, u32::MAX, "#000000"), None);
        assert_eq!((out.width(), out.height()), (304, 304));
    }

    #[test]
    fn unresolved_wallpaper_uses_placeholder() {
        let out = render(&sample(10, 10), &style(5, 0, 0, "https://example.com/w.png"), None);
        assert!(!out.background_resolved);
        assert_eq!(*out.image.get_pixel(0, 0), PLACEHOLDER_COLOR);
    }

    #[test]
    fn resolved_wallpaper_is_stretched() {
        let wall = RgbaImage::from_pixel(3, 3, Rgba([0, 200, 0, 255]));
        let out = render(&sample(10, 10), &style(5, 0, 0, "https://example.com/w.png"), Some(&wall));
        assert!(out.background_resolved);
        assert_eq!(out.image.get_pixel(0, 0).0, [0, 200, 0, 255]);
        assert_eq!(out.image.get_pixel(19, 19).0, [0, 200, 0, 255]);
    }

    #[test]
    fn render_is_deterministic() {
        let img = sample(64, 48);
        let s = style(24, 12, 25, "linear-gradient(to right, #fc00ff, #00dbde)");
        let a = render(&img, &s, None).encode_png().unwrap();
        let b = render(&img, &s, None).encode_png().unwrap();
        assert_eq!(a, b);
    }
}
