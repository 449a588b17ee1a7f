//! Popup controller: styles the last capture and hands it off.
//!
//! Frames go out on a `watch` channel. Rendering never waits on the
//! network: a wallpaper that is not cached yet is drawn with the placeholder
//! fill and fetched in a background task, which publishes a redraw only if
//! that wallpaper is still the selected background. Fetched wallpapers are
//! kept for the life of the popup; failed fetches are retried on the next
//! render.
//!
//! Must be used inside a Tokio runtime.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use image::RgbaImage;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::capture::decode_raster;
use crate::error::AppError;
use crate::geometry::AspectConstraint;
use crate::messages::{Envelope, Message};
use crate::render::{render, Background, CompositeResult, WallpaperProvider};
use crate::settings::{StyleParams, UserSettings};
use crate::storage::{decode_data_url, Store, CROPPED_IMAGE_KEY, USER_SETTINGS_KEY};

pub type Frame = Option<Arc<CompositeResult>>;

type WallpaperCache = Arc<Mutex<HashMap<String, Arc<RgbaImage>>>>;

/// The style most recently asked for, bumped on every refresh.
#[derive(Debug, Default)]
struct Latest {
    generation: u64,
    style: StyleParams,
}

pub struct Popup<S, W> {
    store: S,
    wallpapers: Arc<W>,
    runtime: UnboundedSender<Envelope>,
    settings: UserSettings,
    image: Option<Arc<RgbaImage>>,
    resolved: WallpaperCache,
    latest: Arc<Mutex<Latest>>,
    frames: Arc<watch::Sender<Frame>>,
    // Wallpaper being fetched, if any.
    fetching: Option<(String, JoinHandle<()>)>,
}

impl<S, W> Popup<S, W>
where
    S: Store,
    W: WallpaperProvider + Send + Sync + 'static,
{
    /// Load the last settings and capture, then render the first frame.
    pub async fn open(store: S, wallpapers: W, runtime: UnboundedSender<Envelope>) -> Result<Self, AppError> {
        let settings = UserSettings::from_value(store.get(USER_SETTINGS_KEY).await?);
        let image = load_capture(store.get(CROPPED_IMAGE_KEY).await?);

        match &image {
            Some(img) => log::info!("[POPUP] Opened with {}x{} capture", img.width(), img.height()),
            None => log::info!("[POPUP] Opened with no capture"),
        }

        let (frames, _) = watch::channel(None);
        let mut popup = Self {
            store,
            wallpapers: Arc::new(wallpapers),
            runtime,
            settings,
            image: image.map(Arc::new),
            resolved: WallpaperCache::default(),
            latest: Arc::new(Mutex::new(Latest::default())),
            frames: Arc::new(frames),
            fetching: None,
        };
        popup.refresh();
        Ok(popup)
    }

    pub fn settings(&self) -> &UserSettings {
        &self.settings
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Frame> {
        self.frames.subscribe()
    }

    /// The most recently published frame.
    pub fn current_frame(&self) -> Frame {
        self.frames.borrow().clone()
    }

    /// Apply a new style, save it, and redraw.
    pub async fn set_style(&mut self, style: StyleParams) -> Result<Frame, AppError> {
        self.settings.style = style;
        self.save().await?;
        Ok(self.refresh())
    }

    /// Remember the aspect ratio for the next selection.
    pub async fn set_aspect_ratio(&mut self, constraint: AspectConstraint) -> Result<(), AppError> {
        self.settings.aspect_ratio = constraint;
        self.save().await
    }

    /// Render with the current style and publish. Returns the frame just
    /// published, or `None` without a capture. An uncached wallpaper is
    /// drawn as the placeholder and fetched in the background.
    pub fn refresh(&mut self) -> Frame {
        let style = self.settings.style.clone();
        {
            let mut latest = lock(&self.latest);
            latest.generation += 1;
            latest.style = style.clone();
        }

        let image = self.image.clone()?;
        let cached = match &style.background {
            Background::Wallpaper(reference) => lock(&self.resolved).get(reference).cloned(),
            _ => None,
        };
        let frame = Arc::new(render(&image, &style, cached.as_deref()));
        self.frames.send_replace(Some(frame.clone()));

        if let (Background::Wallpaper(reference), None) = (&style.background, &cached) {
            self.fetch_in_background(reference, image);
        }
        Some(frame)
    }

    /// Wait for the wallpaper fetch started by the last refresh, if any, and
    /// return whatever frame is current afterwards.
    pub async fn wait_for_wallpaper(&mut self) -> Frame {
        if let Some((_, task)) = self.fetching.take() {
            let _ = task.await;
        }
        self.current_frame()
    }

    /// Ask the background worker to save the current frame.
    pub fn download(&self) -> Result<(), AppError> {
        let frame = self.current_frame().ok_or(AppError::NoImage)?;
        let data_url = frame.to_data_url()?;
        self.send(Message::DownloadImage { data_url })?;
        log::info!("[POPUP] Download requested ({}x{})", frame.width(), frame.height());
        Ok(())
    }

    /// Start a fresh selection with the remembered aspect ratio. The popup
    /// closes.
    pub fn capture_new_area(self) -> Result<(), AppError> {
        self.send(Message::InitiateCapture {
            aspect_ratio: self.settings.aspect_ratio,
        })
    }

    fn fetch_in_background(&mut self, reference: &str, image: Arc<RgbaImage>) {
        if let Some((pending, task)) = &self.fetching {
            if pending == reference && !task.is_finished() {
                return;
            }
        }
        if let Some((_, task)) = self.fetching.take() {
            task.abort();
        }

        let reference = reference.to_string();
        let provider = Arc::clone(&self.wallpapers);
        let cache = Arc::clone(&self.resolved);
        let latest = Arc::clone(&self.latest);
        let frames = Arc::clone(&self.frames);
        let wanted = reference.clone();

        let task = tokio::spawn(async move {
            let wallpaper = match provider.fetch(&wanted).await {
                Ok(wallpaper) => Arc::new(wallpaper),
                Err(e) => {
                    log::warn!("[POPUP] Keeping placeholder background: {}", e);
                    return;
                }
            };
            lock(&cache).insert(wanted.clone(), Arc::clone(&wallpaper));

            // Redraw with whatever style is current, unless the user moved
            // to another background meanwhile.
            loop {
                let (generation, style) = {
                    let latest = lock(&latest);
                    (latest.generation, latest.style.clone())
                };
                if !matches!(&style.background, Background::Wallpaper(r) if *r == wanted) {
                    log::debug!("[POPUP] Wallpaper {} arrived after the background changed", wanted);
                    return;
                }

                let frame = Arc::new(render(&image, &style, Some(&*wallpaper)));
                let published = frames.send_if_modified(|current| {
                    if lock(&latest).generation != generation {
                        return false;
                    }
                    *current = Some(Arc::clone(&frame));
                    true
                });
                if published {
                    return;
                }
            }
        });
        self.fetching = Some((reference, task));
    }

    async fn save(&self) -> Result<(), AppError> {
        self.store.set(USER_SETTINGS_KEY, self.settings.to_value()).await?;
        Ok(())
    }

    fn send(&self, message: Message) -> Result<(), AppError> {
        self.runtime
            .send(Envelope::from_extension(message))
            .map_err(|_| AppError::Messaging("background worker is gone".to_string()))
    }
}

impl<S, W> Drop for Popup<S, W> {
    fn drop(&mut self) {
        if let Some((_, task)) = self.fetching.take() {
            task.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn load_capture(stored: Option<Value>) -> Option<RgbaImage> {
    let url = match stored? {
        Value::String(url) => url,
        other => {
            log::warn!("[POPUP] Ignoring non-string capture: {}", other);
            return None;
        }
    };

    let decoded = decode_data_url(&url)
        .map_err(AppError::from)
        .and_then(|bytes| decode_raster(&bytes).map_err(AppError::from));
    match decoded {
        Ok(img) => Some(img),
        Err(e) => {
            log::warn!("[POPUP] Stored capture is unreadable: {}", e);
            None
        }
    }
}
