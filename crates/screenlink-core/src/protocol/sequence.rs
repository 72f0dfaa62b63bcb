//! Thread-safe sequence counter for clipboard transfer numbering.
//!
//! Both sides of the connection stamp clipboard grabs and transfers with a
//! monotonically increasing u32. The counter additionally *observes* sequence
//! numbers arriving from the peer and jumps past them, so numbers this client
//! hands out never collide with numbers the server has already used.

use std::sync::atomic::{AtomicU32, Ordering};

/// A monotonically increasing counter that can be advanced past peer-observed
/// values.
///
/// `Relaxed` ordering is sufficient: the values only number transfers, they
/// are not used for memory synchronization between threads.
#[derive(Debug, Default)]
pub struct SequenceCounter {
    inner: AtomicU32,
}

impl SequenceCounter {
    /// Creates a new counter starting at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next sequence number and increments the counter,
    /// wrapping at `u32::MAX` without panicking.
    pub fn next(&self) -> u32 {
        self.inner.fetch_add(1, Ordering::Relaxed)
    }

    /// Records a sequence number seen from the peer, advancing the counter
    /// to `max(seen, current) + 1`.
    pub fn observe(&self, seen: u32) {
        let _ = self
            .inner
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                Some(current.max(seen).wrapping_add(1))
            });
    }

    /// Returns the current value without incrementing. Diagnostics only.
    pub fn current(&self) -> u32 {
        self.inner.load(Ordering::Relaxed)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
