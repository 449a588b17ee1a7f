//! Crate-level error type returned at the orchestration boundary.
//!
//! Domain modules keep their own `thiserror` enums; this wraps them so a
//! host shell gets one type, serializable as a plain message.

use serde::Serialize;

use crate::capture::CaptureError;
use crate::downloads::DownloadError;
use crate::render::RenderError;
use crate::storage::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    /// No tab to act on (e.g. every window is minimised).
    #[error("No active tab")]
    NoActiveTab,

    /// The page context could not be reached after injection.
    #[error("Failed to message page: {0}")]
    Messaging(String),

    #[error("No captured image available")]
    NoImage,
}

impl AppError {
    /// Protected pages and other capture refusals the user should see.
    pub fn is_capture_unavailable(&self) -> bool {
        matches!(self, Self::Capture(CaptureError::CaptureUnavailable(_)))
    }
}

/// Host shells need errors as strings.
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
