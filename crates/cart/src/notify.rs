//! User-facing failure notices.
//!
//! The store reports every failed operation through a [`Notifier`]. Delivery
//! is fire-and-forget: nothing a notifier does can affect the cart.

use std::fmt;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// A message shown to the shopper when an operation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Notice {
    /// Requested quantity exceeds available stock.
    OutOfStock,
    /// Adding a product failed.
    AddFailed,
    /// Removing a product failed.
    RemoveFailed,
    /// Changing a product quantity failed.
    UpdateFailed,
}

impl Notice {
    /// The message text.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::OutOfStock => "Requested quantity is out of stock",
            Self::AddFailed => "Failed to add product",
            Self::RemoveFailed => "Failed to remove product",
            Self::UpdateFailed => "Failed to change product quantity",
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Side channel for user-facing notices.
pub trait Notifier: Send + Sync {
    /// Deliver a notice.
    fn notify(&self, notice: Notice);
}

impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    fn notify(&self, notice: Notice) {
        (**self).notify(notice);
    }
}

/// Notifier that emits notices as `tracing` warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        tracing::warn!(notice = ?notice, "{notice}");
    }
}

/// Notifier that forwards notices into a bounded channel for a UI to drain.
///
/// When the channel is full the notice is dropped and logged, so a UI that
/// stops draining cannot grow memory without bound.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::Sender<Notice>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiving end of its channel.
    ///
    /// A `capacity` of zero is treated as one.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Notice>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notice: Notice) {
        match self.tx.try_send(notice) {
            Ok(()) => {}
            Err(TrySendError::Full(notice)) => {
                tracing::warn!(notice = ?notice, "Notice channel full, dropping notice");
            }
            Err(TrySendError::Closed(notice)) => {
                tracing::debug!(notice = ?notice, "Notice receiver dropped");
            }
        }
    }
}
