//! Synchronous publish/subscribe hub for domain events.
//!
//! The protocol engine publishes typed events here — connection state
//! changes, parsed input events, clipboard updates — and collaborators (the
//! input-injection layer, a UI) subscribe to them. Delivery is synchronous on
//! the publisher's thread, in subscription order; there is no batching or
//! reordering. Subscribers must unsubscribe with the handle returned at
//! registration, or the bus keeps their callback alive for its own lifetime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::clipboard::data::ClipboardData;

/// Keyboard event forwarded by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyboardEvent {
    Down { id: u16, mask: u16, button: u16 },
    Up { id: u16, mask: u16, button: u16 },
    Repeat { id: u16, mask: u16, count: u16, button: u16 },
}

/// Mouse event forwarded by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MouseEvent {
    Down { button: u8 },
    Up { button: u8 },
    Move { x: i16, y: i16 },
    RelativeMove { x: i16, y: i16 },
    Wheel { x_delta: i16, y_delta: i16 },
}

/// Every event the engine publishes to its collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Transport established a connection to the server.
    Connected,
    /// Transport lost (or never established) its connection.
    Disconnected,
    /// The server's cursor entered this screen.
    ScreenEntered,
    /// The server's cursor left this screen.
    ScreenLeft,
    /// The server acknowledged the handshake info exchange.
    HandshakeAcknowledged,
    Keyboard(KeyboardEvent),
    Mouse(MouseEvent),
    /// A clipboard transfer from the server completed.
    ClipboardSet(ClipboardData),
}

/// Handle identifying one subscription; pass back to
/// [`EventBus::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

type Callback = Arc<dyn Fn(&Event) + Send + Sync>;

/// Process-scoped synchronous event hub.
///
/// Shared as an `Arc`; it outlives any single client instance.
pub struct EventBus {
    subscribers: Mutex<Vec<(u64, Callback)>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers `callback` and returns its subscription handle.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push((id, Arc::new(callback)));
        Subscription(id)
    }

    /// Removes the subscription; unknown handles are ignored.
    pub fn unsubscribe(&self, subscription: Subscription) {
        self.lock().retain(|(id, _)| *id != subscription.0);
    }

    /// Delivers `event` to every subscriber, in registration order, on the
    /// calling thread.
    pub fn publish(&self, event: &Event) {
        // Snapshot outside the lock so a subscriber may itself subscribe or
        // unsubscribe without deadlocking.
        let snapshot: Vec<Callback> =
            self.lock().iter().map(|(_, cb)| Arc::clone(cb)).collect();
        for callback in snapshot {
            callback(event);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(u64, Callback)>> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
