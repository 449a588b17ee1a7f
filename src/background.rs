//! Background worker: routes messages between the popup, the page and the
//! platform.
//!
//! Flow:
//! 1. Shortcut or popup asks for a capture → inject the selection layer
//!    into the active tab and tell it to start.
//! 2. Page commits a region → capture the viewport, crop, persist as the
//!    "last captured image".
//! 3. Popup asks for a download → decode the data URL and save it.
//!
//! Failures are logged here and returned; nothing is half-written.

use std::path::PathBuf;
use std::time::Instant;

use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::capture::{CaptureError, CaptureOrchestrator, CaptureRequest, CroppedImage, ViewportSource};
use crate::config::Config;
use crate::downloads::{DirectoryDownloads, Downloads, DOWNLOAD_FILENAME};
use crate::error::AppError;
use crate::geometry::AspectConstraint;
use crate::host::{MessageSender, PageHost, TabId};
use crate::messages::{Envelope, Message};
use crate::settings::UserSettings;
use crate::storage::{decode_data_url, FileStore, Store, CROPPED_IMAGE_KEY, USER_SETTINGS_KEY};

/// Name of the keyboard command that starts a capture.
pub const SCREENSHOT_COMMAND: &str = "take-screenshot";

pub struct BackgroundWorker<H, V, S, D> {
    host: H,
    capture: CaptureOrchestrator<V>,
    store: S,
    downloads: D,
}

impl<H, V, S, D> BackgroundWorker<H, V, S, D>
where
    H: PageHost,
    V: ViewportSource,
    S: Store,
    D: Downloads,
{
    pub fn new(host: H, source: V, store: S, downloads: D) -> Self {
        Self {
            host,
            capture: CaptureOrchestrator::new(source),
            store,
            downloads,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Keyboard command. Uses the aspect ratio from the last saved settings.
    pub async fn on_command(&self, command: &str) -> Result<(), AppError> {
        if command != SCREENSHOT_COMMAND {
            log::debug!("[BACKGROUND] Ignoring command {:?}", command);
            return Ok(());
        }

        let settings = UserSettings::from_value(self.store.get(USER_SETTINGS_KEY).await?);
        log::info!(
            "[BACKGROUND] Shortcut pressed, starting selection (aspect {})",
            settings.aspect_ratio
        );
        self.initiate_capture(settings.aspect_ratio).await
    }

    /// Start a selection in the active tab.
    pub async fn initiate_capture(&self, constraint: AspectConstraint) -> Result<(), AppError> {
        let active = self.host.active_tab().await.ok_or(AppError::NoActiveTab)?;
        self.activate(active.tab, constraint).await
    }

    /// Inject the selection layer into `tab` and arm it.
    ///
    /// Injection failure (protected pages) surfaces as `CaptureUnavailable`.
    pub async fn activate(&self, tab: TabId, constraint: AspectConstraint) -> Result<(), AppError> {
        if let Err(reason) = self.host.inject(tab).await {
            log::warn!("[BACKGROUND] Cannot inject into tab {}: {}", tab, reason);
            return Err(CaptureError::CaptureUnavailable(reason).into());
        }

        self.host
            .send(tab, Message::StartSelection { aspect_ratio: constraint })
            .await
            .map_err(AppError::Messaging)?;

        log::info!("[BACKGROUND] Selection started in tab {}", tab);
        Ok(())
    }

    /// Capture `request` from the sender's window and persist the result,
    /// replacing any earlier capture.
    pub async fn capture_region(
        &self,
        request: &CaptureRequest,
        sender: Option<MessageSender>,
    ) -> Result<CroppedImage, AppError> {
        let start = Instant::now();

        let window = match sender {
            Some(sender) => sender.window,
            None => self.host.active_tab().await.ok_or(AppError::NoActiveTab)?.window,
        };

        let cropped = self.capture.capture(request, window).await?;
        self.store
            .set(CROPPED_IMAGE_KEY, Value::String(cropped.to_data_url()))
            .await?;

        log::info!(
            "[BACKGROUND] Stored {}x{} capture in {}ms",
            cropped.width,
            cropped.height,
            start.elapsed().as_millis()
        );
        Ok(cropped)
    }

    /// Save a PNG data URL through the downloads facility.
    pub async fn download(&self, data_url: &str) -> Result<PathBuf, AppError> {
        let bytes = decode_data_url(data_url)?;
        let path = self.downloads.download(bytes, DOWNLOAD_FILENAME, true).await?;
        Ok(path)
    }

    /// Handle one message. Errors are logged before being returned.
    pub async fn handle(&self, envelope: Envelope) -> Result<(), AppError> {
        let Envelope { message, sender } = envelope;

        let result = match message {
            Message::InitiateCapture { aspect_ratio } => self.initiate_capture(aspect_ratio).await,
            Message::Capture(request) => self.capture_region(&request, sender).await.map(|_| ()),
            Message::DownloadImage { data_url } => self.download(&data_url).await.map(|_| ()),
            Message::StartSelection { .. } => {
                log::debug!("[BACKGROUND] START_SELECTION is page-bound, ignoring");
                Ok(())
            }
        };

        if let Err(e) = &result {
            log::error!("[BACKGROUND] {}", e);
        }
        result
    }

    /// Serve messages until every sender is dropped.
    pub async fn run(&self, mut inbox: UnboundedReceiver<Envelope>) {
        log::info!("[BACKGROUND] Worker running");
        while let Some(envelope) = inbox.recv().await {
            // Already logged by `handle`.
            let _ = self.handle(envelope).await;
        }
        log::info!("[BACKGROUND] Inbox closed, worker stopping");
    }
}

impl<H: PageHost, V: ViewportSource> BackgroundWorker<H, V, FileStore, DirectoryDownloads> {
    /// Persist under `config.data_dir` and save downloads into
    /// `config.download_dir`.
    pub fn from_config(config: &Config, host: H, source: V) -> Self {
        let store = FileStore::in_dir(&config.data_dir);
        log::info!(
            "[BACKGROUND] Storage at {}, downloads to {}",
            store.path().display(),
            config.download_dir.display()
        );
        Self::new(host, source, store, DirectoryDownloads::new(&config.download_dir))
    }
}
