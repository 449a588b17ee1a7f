//! Viewport sources: where the full-viewport raster comes from.
//!
//! The browser shell hands over an already-encoded capture of the visible
//! tab. The desktop build asks `xcap` for the primary monitor instead.

use super::CaptureError;
use crate::host::WindowId;
use std::future::Future;

/// Produces an encoded (PNG) capture of the visible viewport of a window.
pub trait ViewportSource {
    fn capture_visible(
        &self,
        window: WindowId,
    ) -> impl Future<Output = Result<Vec<u8>, CaptureError>> + Send;
}

/// Serves a fixed encoded viewport. Used when the host captured the page
/// itself, and by tests and the bench tool.
#[derive(Debug, Clone, Default)]
pub struct StaticViewport {
    encoded: Option<Vec<u8>>,
}

impl StaticViewport {
    pub fn new(encoded: Vec<u8>) -> Self {
        Self {
            encoded: Some(encoded),
        }
    }

    /// A source that behaves like a protected page: every capture fails.
    pub fn unavailable() -> Self {
        Self { encoded: None }
    }
}

impl ViewportSource for StaticViewport {
    async fn capture_visible(&self, window: WindowId) -> Result<Vec<u8>, CaptureError> {
        self.encoded.clone().ok_or_else(|| {
            CaptureError::CaptureUnavailable(format!("window {} cannot be captured", window))
        })
    }
}

/// Captures the primary monitor using the `xcap` crate.
///
/// This is the infrastructure layer; it talks to the OS. The window id is
/// ignored: the visible desktop is the viewport.
#[cfg(feature = "desktop-capture")]
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopViewport;

#[cfg(feature = "desktop-capture")]
impl ViewportSource for DesktopViewport {
    async fn capture_visible(&self, _window: WindowId) -> Result<Vec<u8>, CaptureError> {
        let start = std::time::Instant::now();

        let image = tokio::task::spawn_blocking(capture_primary_monitor)
            .await
            .map_err(|e| CaptureError::CaptureUnavailable(format!("Capture task failed: {}", e)))??;

        let png_bytes = super::region::encode_png(&image)
            .map_err(|e| CaptureError::Encode(e.to_string()))?;

        log::info!(
            "[CAPTURE] Desktop captured {}x{} in {}ms ({} bytes)",
            image.width(),
            image.height(),
            start.elapsed().as_millis(),
            png_bytes.len()
        );
        Ok(png_bytes)
    }
}

#[cfg(feature = "desktop-capture")]
fn capture_primary_monitor() -> Result<image::RgbaImage, CaptureError> {
    use xcap::Monitor;

    let monitors = Monitor::all()
        .map_err(|e| CaptureError::CaptureUnavailable(format!("Failed to enumerate monitors: {}", e)))?;

    let mut monitors = monitors.into_iter();
    let first = monitors
        .next()
        .ok_or_else(|| CaptureError::CaptureUnavailable("No monitor found".to_string()))?;
    // Fallback: if no monitor reports as primary, use the first one
    let primary = if first.is_primary().unwrap_or(false) {
        first
    } else {
        monitors
            .find(|m| m.is_primary().unwrap_or(false))
            .unwrap_or(first)
    };

    primary
        .capture_image()
        .map_err(|e| CaptureError::CaptureUnavailable(format!("Screen capture failed: {}", e)))
}
