//! Screen capture domain: public API.
//!
//! This module owns the capture → decode → crop → encode pipeline.
//! External code should only use the items exported here.

mod region;
mod screenshot;

pub use region::{crop, crop_to_png_bytes, encode_png, CropError};
#[cfg(feature = "desktop-capture")]
pub use screenshot::DesktopViewport;
pub use screenshot::{StaticViewport, ViewportSource};

use crate::geometry::{scale_to_device_pixels, SelectionRect};
use crate::host::WindowId;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// What the selection layer asks the orchestrator to capture.
///
/// Serialized as the flat `{left, top, width, height, devicePixelRatio}`
/// payload of a `CAPTURE` message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptureRequest {
    #[serde(flatten)]
    pub rect: SelectionRect,
    #[serde(rename = "devicePixelRatio")]
    pub pixel_ratio: f64,
}

impl CaptureRequest {
    pub fn new(rect: SelectionRect, pixel_ratio: f64) -> Self {
        Self { rect, pixel_ratio }
    }

    /// Pixel ratio to crop with. Anything non-finite or ≤ 0 is treated as 1.
    pub fn effective_pixel_ratio(&self) -> f64 {
        if self.pixel_ratio.is_finite() && self.pixel_ratio > 0.0 {
            self.pixel_ratio
        } else {
            log::warn!(
                "[CAPTURE] Invalid device pixel ratio {}, using 1.0",
                self.pixel_ratio
            );
            1.0
        }
    }
}

/// The selected region as lossless PNG bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CroppedImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl CroppedImage {
    /// Decode back into pixels for compositing.
    pub fn decode(&self) -> Result<RgbaImage, CaptureError> {
        decode_raster(&self.png)
    }

    pub fn to_data_url(&self) -> String {
        crate::storage::to_png_data_url(&self.png)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Capture unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("Failed to decode captured image: {0}")]
    Decode(String),

    #[error(transparent)]
    Crop(#[from] CropError),

    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

/// Decode an encoded raster (PNG, JPEG, …) into RGBA pixels.
pub fn decode_raster(bytes: &[u8]) -> Result<RgbaImage, CaptureError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| CaptureError::Decode(e.to_string()))
}

/// Runs the capture sequence against a viewport source.
pub struct CaptureOrchestrator<V> {
    source: V,
}

impl<V: ViewportSource> CaptureOrchestrator<V> {
    pub fn new(source: V) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &V {
        &self.source
    }

    /// Capture the visible viewport of `window` and crop it to `request`.
    ///
    /// Each stage fails independently; nothing is persisted here.
    pub async fn capture(
        &self,
        request: &CaptureRequest,
        window: WindowId,
    ) -> Result<CroppedImage, CaptureError> {
        let start = std::time::Instant::now();

        // Step 1: Capture the visible viewport
        let encoded = self.source.capture_visible(window).await?;
        let capture_ms = start.elapsed().as_millis();

        // Step 2: Decode to a bitmap
        let viewport = decode_raster(&encoded)?;
        let decode_ms = start.elapsed().as_millis() - capture_ms;

        // Step 3: CSS pixels → device pixels
        let pixel_rect =
            scale_to_device_pixels(request.rect, request.effective_pixel_ratio()).to_pixel_rect();

        // Steps 4 + 5: Crop and encode
        let cropped = crop(&viewport, pixel_rect)?;
        let png = encode_png(&cropped).map_err(|e| CaptureError::Encode(e.to_string()))?;

        log::info!(
            "[CAPTURE] Cropped {}x{} at {},{} from {}x{} viewport (capture={}ms, decode={}ms, total={}ms, {} bytes)",
            pixel_rect.width,
            pixel_rect.height,
            pixel_rect.x,
            pixel_rect.y,
            viewport.width(),
            viewport.height(),
            capture_ms,
            decode_ms,
            start.elapsed().as_millis(),
            png.len()
        );

        Ok(CroppedImage {
            png,
            width: cropped.width(),
            height: cropped.height(),
        })
    }
}
