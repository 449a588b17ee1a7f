//! Liquid Glass: select a region of the page, capture it, and compose it
//! onto a styled background.
//!
//! The pieces, in the order a capture flows through them:
//! - Selection overlay and drag state machine (selection/)
//! - Background worker routing messages (background.rs)
//! - Viewport capture and crop (capture/)
//! - Composite rendering (render/)
//! - Popup controller and persisted settings (popup.rs, settings.rs, storage.rs)
//!
//! The browser or desktop shell plugs in through the traits in `host`,
//! `selection::PageOverlay`, `capture::ViewportSource`, `storage::Store`,
//! `downloads::Downloads` and `render::WallpaperProvider`.

pub mod background;
pub mod capture;
pub mod config;
pub mod downloads;
pub mod error;
pub mod geometry;
pub mod host;
pub mod messages;
pub mod popup;
pub mod render;
pub mod selection;
pub mod settings;
pub mod storage;

pub use error::AppError;

/// Initialise `env_logger`. Honours `RUST_LOG`; defaults to `info`.
///
/// Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
}
