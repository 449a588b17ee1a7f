//! The drag-to-select gesture as an explicit state machine.

use super::{Key, Listener, PageOverlay, SelectionEvent};
use crate::capture::CaptureRequest;
use crate::geometry::{selection_rect, AspectConstraint, PointerPoint, SelectionRect};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionState {
    Idle,
    Armed,
    Dragging {
        anchor: PointerPoint,
        rect: SelectionRect,
    },
}

/// What a single event did to the machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    /// No listener for this event is attached in the current state.
    Ignored,
    /// Pointer-down recorded the anchor.
    DragStarted(PointerPoint),
    /// The selection box was redrawn.
    Moved(SelectionRect),
    /// Pointer-up with a non-zero area. Cleanup already ran.
    Committed(CaptureRequest),
    /// Escape, or pointer-up with zero area. Cleanup already ran.
    Cancelled,
}

impl Transition {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed(_) | Self::Cancelled)
    }
}

/// Listeners currently attached to the page, as a bit set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ListenerSet(u8);

impl ListenerSet {
    fn bit(listener: Listener) -> u8 {
        1 << listener as u8
    }

    fn insert(&mut self, listener: Listener) {
        self.0 |= Self::bit(listener);
    }

    fn remove(&mut self, listener: Listener) {
        self.0 &= !Self::bit(listener);
    }

    fn contains(&self, listener: Listener) -> bool {
        self.0 & Self::bit(listener) != 0
    }
}

/// One selection gesture. Page side effects go through the overlay passed
/// to each call; the machine itself only tracks state and listeners.
///
/// Dropping a machine does not touch the page. Whoever owns the overlay
/// calls [`SelectionMachine::cleanup`] first (see `ContentScript`'s `Drop`).
#[derive(Debug)]
pub struct SelectionMachine {
    state: SelectionState,
    constraint: AspectConstraint,
    listeners: ListenerSet,
}

impl Default for SelectionMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionMachine {
    pub fn new() -> Self {
        Self {
            state: SelectionState::Idle,
            constraint: AspectConstraint::Unconstrained,
            listeners: ListenerSet::default(),
        }
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn constraint(&self) -> AspectConstraint {
        self.constraint
    }

    /// Armed or Dragging.
    pub fn is_active(&self) -> bool {
        !matches!(self.state, SelectionState::Idle)
    }

    pub fn is_listening(&self, listener: Listener) -> bool {
        self.listeners.contains(listener)
    }

    /// Idle → Armed: mount the overlay and wait for a single pointer-down.
    ///
    /// Returns `false` (and does nothing) when a gesture is already running.
    pub fn arm<O: PageOverlay + ?Sized>(&mut self, overlay: &mut O, constraint: AspectConstraint) -> bool {
        if self.is_active() {
            log::debug!("[SELECTION] Already active, ignoring re-activation");
            return false;
        }

        self.constraint = constraint;
        overlay.mount();
        self.attach(overlay, Listener::PointerDown);
        self.attach(overlay, Listener::KeyDown);
        self.state = SelectionState::Armed;

        log::info!("[SELECTION] Armed (aspect ratio {})", constraint);
        true
    }

    /// Feed one page event. Events whose listener is not attached are ignored.
    pub fn handle<O: PageOverlay + ?Sized>(&mut self, overlay: &mut O, event: SelectionEvent) -> Transition {
        if !self.listeners.contains(event.listener()) {
            return Transition::Ignored;
        }

        match (self.state, event) {
            (_, SelectionEvent::KeyDown(Key::Escape)) => {
                log::info!("[SELECTION] Cancelled by Escape");
                self.cleanup(overlay);
                Transition::Cancelled
            }
            (_, SelectionEvent::KeyDown(Key::Other)) => Transition::Ignored,

            (SelectionState::Armed, SelectionEvent::PointerDown(anchor)) => {
                // Pointer-down fires once; the drag owns move and up from here.
                self.detach(overlay, Listener::PointerDown);
                let rect = SelectionRect::new(anchor.x, anchor.y, 0.0, 0.0);
                overlay.draw_selection(&rect);
                self.attach(overlay, Listener::PointerMove);
                self.attach(overlay, Listener::PointerUp);
                self.state = SelectionState::Dragging { anchor, rect };
                Transition::DragStarted(anchor)
            }

            (SelectionState::Dragging { anchor, .. }, SelectionEvent::PointerMove(current)) => {
                let rect = selection_rect(anchor, current, self.constraint);
                overlay.draw_selection(&rect);
                self.state = SelectionState::Dragging { anchor, rect };
                Transition::Moved(rect)
            }

            (SelectionState::Dragging { anchor, .. }, SelectionEvent::PointerUp(current)) => {
                let rect = selection_rect(anchor, current, self.constraint);
                let pixel_ratio = overlay.device_pixel_ratio();
                self.cleanup(overlay);

                if rect.is_committable() {
                    log::info!(
                        "[SELECTION] Committed {}x{} at {},{} (dpr {})",
                        rect.width, rect.height, rect.left, rect.top, pixel_ratio
                    );
                    Transition::Committed(CaptureRequest::new(rect, pixel_ratio))
                } else {
                    log::debug!("[SELECTION] Zero-area selection discarded");
                    Transition::Cancelled
                }
            }

            _ => Transition::Ignored,
        }
    }

    /// Remove the overlay, restore the cursor, detach every listener and
    /// return to Idle. Safe to call in any state.
    pub fn cleanup<O: PageOverlay + ?Sized>(&mut self, overlay: &mut O) {
        if self.is_active() {
            overlay.unmount();
        }
        for listener in Listener::ALL {
            if self.listeners.contains(listener) {
                self.detach(overlay, listener);
            }
        }
        self.state = SelectionState::Idle;
    }

    fn attach<O: PageOverlay + ?Sized>(&mut self, overlay: &mut O, listener: Listener) {
        overlay.attach(listener);
        self.listeners.insert(listener);
    }

    fn detach<O: PageOverlay + ?Sized>(&mut self, overlay: &mut O, listener: Listener) {
        overlay.detach(listener);
        self.listeners.remove(listener);
    }
}
