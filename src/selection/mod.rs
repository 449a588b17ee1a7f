//! Region selection: the page-side half of a capture.
//!
//! `SelectionMachine` runs one drag gesture. `ContentScript` is what gets
//! injected into a page: it owns at most one machine, creates it on
//! `START_SELECTION` and drops it as soon as the gesture ends.

mod machine;

pub use machine::{SelectionMachine, SelectionState, Transition};

use crate::geometry::{AspectConstraint, PointerPoint, SelectionRect};
use crate::host::MessageSender;
use crate::messages::{Envelope, Message};
use tokio::sync::mpsc::UnboundedSender;

/// Page listeners the machine attaches and detaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listener {
    PointerDown = 0,
    PointerMove = 1,
    PointerUp = 2,
    KeyDown = 3,
}

impl Listener {
    pub const ALL: [Listener; 4] = [
        Listener::PointerDown,
        Listener::PointerMove,
        Listener::PointerUp,
        Listener::KeyDown,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionEvent {
    PointerDown(PointerPoint),
    PointerMove(PointerPoint),
    PointerUp(PointerPoint),
    KeyDown(Key),
}

impl SelectionEvent {
    /// The listener that has to be attached for this event to be delivered.
    pub fn listener(&self) -> Listener {
        match self {
            Self::PointerDown(_) => Listener::PointerDown,
            Self::PointerMove(_) => Listener::PointerMove,
            Self::PointerUp(_) => Listener::PointerUp,
            Self::KeyDown(_) => Listener::KeyDown,
        }
    }
}

/// The document the selection is drawn over.
pub trait PageOverlay {
    /// Show the dimming overlay, an empty selection box and the crosshair cursor.
    fn mount(&mut self);
    /// Remove everything `mount` added.
    fn unmount(&mut self);
    fn attach(&mut self, listener: Listener);
    fn detach(&mut self, listener: Listener);
    /// Called on every pointer move; must not allocate.
    fn draw_selection(&mut self, rect: &SelectionRect);
    fn device_pixel_ratio(&self) -> f64;
}

/// The selection layer injected into one page.
pub struct ContentScript<O: PageOverlay> {
    page: O,
    origin: MessageSender,
    machine: Option<SelectionMachine>,
    runtime: UnboundedSender<Envelope>,
}

impl<O: PageOverlay> ContentScript<O> {
    /// `origin` identifies this page; `runtime` is the channel to the
    /// background worker.
    pub fn new(page: O, origin: MessageSender, runtime: UnboundedSender<Envelope>) -> Self {
        Self {
            page,
            origin,
            machine: None,
            runtime,
        }
    }

    pub fn page(&self) -> &O {
        &self.page
    }

    pub fn is_active(&self) -> bool {
        self.machine.is_some()
    }

    /// Handle a message from the background worker.
    pub fn on_message(&mut self, message: Message) {
        match message {
            Message::StartSelection { aspect_ratio } => {
                self.start_selection(aspect_ratio);
            }
            other => log::debug!("[SELECTION] Ignoring message {:?}", other),
        }
    }

    /// Create and arm a machine unless one is already running.
    pub fn start_selection(&mut self, constraint: AspectConstraint) -> bool {
        if self.machine.is_some() {
            log::debug!("[SELECTION] Selection already in progress");
            return false;
        }
        let mut machine = SelectionMachine::new();
        machine.arm(&mut self.page, constraint);
        self.machine = Some(machine);
        true
    }

    /// Deliver a page event. On commit the capture request is posted to the
    /// runtime without waiting for the capture itself.
    pub fn dispatch(&mut self, event: SelectionEvent) -> Transition {
        let Some(machine) = self.machine.as_mut() else {
            return Transition::Ignored;
        };

        let transition = machine.handle(&mut self.page, event);

        if let Transition::Committed(request) = transition {
            let envelope = Envelope::from_page(Message::Capture(request), self.origin);
            if self.runtime.send(envelope).is_err() {
                log::error!("[SELECTION] Background worker is gone, capture request dropped");
            }
        }
        if transition.is_terminal() {
            self.machine = None;
        }
        transition
    }
}

impl<O: PageOverlay> Drop for ContentScript<O> {
    fn drop(&mut self) {
        if let Some(mut machine) = self.machine.take() {
            log::warn!("[SELECTION] Page unloaded mid-selection");
            machine.cleanup(&mut self.page);
        }
    }
}
