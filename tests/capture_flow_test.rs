//! End-to-end capture flow: shortcut → selection → capture → popup → download.
//!
//! The platform is faked: a page that records overlay calls, a static
//! viewport bitmap, an in-memory store and a temp download directory.

use std::path::PathBuf;
use std::sync::Mutex;

use image::{Rgba, RgbaImage};
use tokio::sync::mpsc::unbounded_channel;

use liquid_glass_lib::background::{BackgroundWorker, SCREENSHOT_COMMAND};
use liquid_glass_lib::capture::{encode_png, StaticViewport};
use liquid_glass_lib::downloads::{DirectoryDownloads, DOWNLOAD_FILENAME};
use liquid_glass_lib::geometry::{AspectConstraint, PointerPoint, SelectionRect};
use liquid_glass_lib::host::{MessageSender, PageHost, TabId};
use liquid_glass_lib::messages::Message;
use liquid_glass_lib::popup::Popup;
use liquid_glass_lib::render::{Background, NoWallpapers};
use liquid_glass_lib::selection::{ContentScript, Key, Listener, PageOverlay, SelectionEvent, Transition};
use liquid_glass_lib::settings::StyleParams;
use liquid_glass_lib::storage::{MemoryStore, Store, CROPPED_IMAGE_KEY};

const TAB: MessageSender = MessageSender { tab: 1, window: 9 };

/// Messages the worker sends to the page are queued here.
#[derive(Default)]
struct QueueHost {
    outbox: Mutex<Vec<Message>>,
}

impl PageHost for QueueHost {
    async fn active_tab(&self) -> Option<MessageSender> {
        Some(TAB)
    }

    async fn inject(&self, _tab: TabId) -> Result<(), String> {
        Ok(())
    }

    async fn send(&self, _tab: TabId, message: Message) -> Result<(), String> {
        self.outbox.lock().unwrap().push(message);
        Ok(())
    }
}

#[derive(Default)]
struct Page {
    mounted: bool,
    listeners: Vec<Listener>,
    pixel_ratio: f64,
}

impl PageOverlay for Page {
    fn mount(&mut self) {
        self.mounted = true;
    }

    fn unmount(&mut self) {
        self.mounted = false;
    }

    fn attach(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    fn detach(&mut self, listener: Listener) {
        self.listeners.retain(|l| *l != listener);
    }

    fn draw_selection(&mut self, _rect: &SelectionRect) {}

    fn device_pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }
}

/// 400x300 device-pixel viewport; each pixel encodes its coordinates.
fn viewport() -> StaticViewport {
    let img = RgbaImage::from_fn(400, 300, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255]));
    StaticViewport::new(encode_png(&img).unwrap())
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("liquid-glass-flow-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn pt(x: f64, y: f64) -> PointerPoint {
    PointerPoint::new(x, y)
}

#[tokio::test]
async fn shortcut_to_download() {
    let dir = temp_dir("full");
    let worker = BackgroundWorker::new(
        QueueHost::default(),
        viewport(),
        MemoryStore::new(),
        DirectoryDownloads::new(&dir),
    );
    let (runtime, mut inbox) = unbounded_channel();

    // Shortcut: the worker injects and tells the page to start.
    worker.on_command(SCREENSHOT_COMMAND).await.unwrap();
    let start = worker.host().outbox.lock().unwrap().remove(0);

    let mut script = ContentScript::new(
        Page {
            pixel_ratio: 2.0,
            ..Page::default()
        },
        TAB,
        runtime.clone(),
    );
    script.on_message(start);
    assert!(script.is_active());
    assert!(script.page().mounted);

    // Drag 10,10 → 60,40 in CSS pixels.
    script.dispatch(SelectionEvent::PointerDown(pt(10.0, 10.0)));
    script.dispatch(SelectionEvent::PointerMove(pt(40.0, 30.0)));
    let done = script.dispatch(SelectionEvent::PointerUp(pt(60.0, 40.0)));
    assert!(matches!(done, Transition::Committed(_)));
    assert!(!script.page().mounted);
    assert!(script.page().listeners.is_empty());

    // Worker captures at 2x: 100x60 device pixels from (20, 20).
    let envelope = inbox.try_recv().unwrap();
    assert_eq!(envelope.sender, Some(TAB));
    worker.handle(envelope).await.unwrap();

    // Popup opens on the stored capture.
    let mut popup = Popup::open(worker.store(), NoWallpapers, runtime.clone())
        .await
        .unwrap();
    let frame = popup
        .set_style(StyleParams {
            padding: 10,
            border_radius: 0,
            shadow: 0,
            background: Background::Solid(Rgba([0, 0, 0, 255])),
        })
        .await
        .unwrap()
        .unwrap();
    assert_eq!((frame.width(), frame.height()), (120, 80));
    assert_eq!(frame.image.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
    assert_eq!(frame.image.get_pixel(10, 10), &Rgba([20, 20, 128, 255]));

    // Download goes through the worker to disk.
    popup.download().unwrap();
    worker.handle(inbox.try_recv().unwrap()).await.unwrap();

    let saved = image::open(dir.join(DOWNLOAD_FILENAME)).unwrap().to_rgba8();
    assert_eq!(saved.dimensions(), (120, 80));
    assert_eq!(saved.get_pixel(10, 10), &Rgba([20, 20, 128, 255]));

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn escape_leaves_nothing_behind() {
    let worker = BackgroundWorker::new(
        QueueHost::default(),
        viewport(),
        MemoryStore::new(),
        DirectoryDownloads::new(temp_dir("escape")),
    );
    let (runtime, mut inbox) = unbounded_channel();

    worker.initiate_capture(AspectConstraint::Unconstrained).await.unwrap();
    let start = worker.host().outbox.lock().unwrap().remove(0);

    let mut script = ContentScript::new(Page::default(), TAB, runtime);
    script.on_message(start);
    script.dispatch(SelectionEvent::PointerDown(pt(5.0, 5.0)));
    let done = script.dispatch(SelectionEvent::KeyDown(Key::Escape));

    assert_eq!(done, Transition::Cancelled);
    assert!(!script.is_active());
    assert!(!script.page().mounted);
    assert!(script.page().listeners.is_empty());
    assert!(inbox.try_recv().is_err());
    assert_eq!(worker.store().get(CROPPED_IMAGE_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn aspect_constrained_selection_is_captured_at_ratio() {
    let worker = BackgroundWorker::new(
        QueueHost::default(),
        viewport(),
        MemoryStore::new(),
        DirectoryDownloads::new(temp_dir("ratio")),
    );
    let (runtime, mut inbox) = unbounded_channel();

    worker
        .initiate_capture(AspectConstraint::Ratio { w: 16.0, h: 9.0 })
        .await
        .unwrap();
    let start = worker.host().outbox.lock().unwrap().remove(0);

    let mut script = ContentScript::new(
        Page {
            pixel_ratio: 1.0,
            ..Page::default()
        },
        TAB,
        runtime,
    );
    script.on_message(start);
    script.dispatch(SelectionEvent::PointerDown(pt(100.0, 100.0)));
    let done = script.dispatch(SelectionEvent::PointerUp(pt(260.0, 50.0)));

    let Transition::Committed(request) = done else {
        panic!("expected commit, got {:?}", done);
    };
    assert_eq!(request.rect, SelectionRect::new(100.0, 10.0, 160.0, 90.0));

    let cropped = worker
        .capture_region(&request, inbox.try_recv().unwrap().sender)
        .await
        .unwrap();
    assert_eq!((cropped.width, cropped.height), (160, 90));
}
