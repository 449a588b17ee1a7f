//! Wallpaper backgrounds: fetched images behind the capture.
//!
//! Providers are pluggable; availability is never assumed. A failed fetch
//! only means the placeholder fill stays up until the next render.

use super::RenderError;
use image::RgbaImage;
use std::future::Future;

pub trait WallpaperProvider {
    fn fetch(&self, reference: &str) -> impl Future<Output = Result<RgbaImage, RenderError>> + Send;
}

/// Downloads wallpapers over HTTP(S).
#[derive(Debug, Clone, Default)]
pub struct HttpWallpaperProvider {
    client: reqwest::Client,
}

impl HttpWallpaperProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl WallpaperProvider for HttpWallpaperProvider {
    async fn fetch(&self, reference: &str) -> Result<RgbaImage, RenderError> {
        let start = std::time::Instant::now();

        let resp = self
            .client
            .get(reference)
            .send()
            .await
            .map_err(|e| RenderError::BackgroundFetch(format!("request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(RenderError::BackgroundFetch(format!("HTTP {}", resp.status())));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| RenderError::BackgroundFetch(format!("body read failed: {}", e)))?;

        let image = image::load_from_memory(&bytes)
            .map_err(|e| RenderError::BackgroundFetch(format!("decode failed: {}", e)))?
            .to_rgba8();

        log::info!(
            "[RENDER] Wallpaper {} loaded ({}x{}, {} bytes) in {}ms",
            reference,
            image.width(),
            image.height(),
            bytes.len(),
            start.elapsed().as_millis()
        );
        Ok(image)
    }
}

/// Provider for setups without wallpapers; every fetch fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWallpapers;

impl WallpaperProvider for NoWallpapers {
    async fn fetch(&self, reference: &str) -> Result<RgbaImage, RenderError> {
        Err(RenderError::BackgroundFetch(format!(
            "no wallpaper provider configured for {}",
            reference
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_wallpapers_always_fails() {
        let err = NoWallpapers.fetch("https://example.com/a.png").await.unwrap_err();
        assert!(matches!(err, RenderError::BackgroundFetch(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_fetch_failure() {
        let provider = HttpWallpaperProvider::new();
        let err = provider.fetch("http://127.0.0.1:9/wallpaper.png").await.unwrap_err();
        assert!(matches!(err, RenderError::BackgroundFetch(_)));
    }
}
