//! Seams to the platform shell: tab/window identity and script injection.

use crate::messages::Message;
use std::future::Future;

pub type TabId = u32;
pub type WindowId = u32;

/// Which page a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageSender {
    pub tab: TabId,
    pub window: WindowId,
}

/// The platform side of a page: injecting the selection layer and talking to it.
pub trait PageHost {
    /// The tab the user is looking at, if any.
    fn active_tab(&self) -> impl Future<Output = Option<MessageSender>> + Send;

    /// Inject the selection layer (script and styles) into `tab`.
    ///
    /// Protected pages refuse injection; the error text is shown to the user.
    fn inject(&self, tab: TabId) -> impl Future<Output = Result<(), String>> + Send;

    /// Deliver a message to the page context of `tab`.
    fn send(&self, tab: TabId, message: Message) -> impl Future<Output = Result<(), String>> + Send;
}
