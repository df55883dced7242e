//! External memory accounting.
//!
//! Pixel storage lives outside the host's own heap, so the host is told how
//! much memory each image holds. Every image announces its
//! `estimated_size` when it is created and retracts exactly that amount when
//! it is destroyed, through a [`MemoryTicket`].

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Host allocator hint.
pub trait ExternalMemory {
    /// Adjusts the externally allocated total by `delta` bytes and returns
    /// the new total.
    fn adjust(&self, delta: i64) -> i64;
}

/// Counts the announced total.
///
/// ```rust
/// use carta_host::{ExternalMemory, MemoryCounter};
///
/// let counter = MemoryCounter::new();
/// counter.adjust(64);
/// counter.adjust(-16);
/// assert_eq!(counter.total(), 48);
/// ```
#[derive(Debug, Default)]
pub struct MemoryCounter {
    total: Cell<i64>,
}

impl MemoryCounter {
    /// Creates a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current announced total.
    pub fn total(&self) -> i64 {
        self.total.get()
    }
}

impl ExternalMemory for MemoryCounter {
    fn adjust(&self, delta: i64) -> i64 {
        let total = self.total.get() + delta;
        self.total.set(total);
        total
    }
}

/// Backend for hosts without an allocator hint.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMemory;

impl ExternalMemory for NoopMemory {
    fn adjust(&self, _delta: i64) -> i64 {
        0
    }
}

/// Announcement of one image's size, retracted on drop.
pub struct MemoryTicket {
    memory: Rc<dyn ExternalMemory>,
    size: i64,
}

impl MemoryTicket {
    /// Announces `size` bytes.
    pub fn announce(memory: Rc<dyn ExternalMemory>, size: usize) -> Self {
        let size = i64::try_from(size).unwrap_or(i64::MAX);
        let total = memory.adjust(size);
        tracing::trace!(size, total, "external memory announced");
        Self { memory, size }
    }

    /// Announced size in bytes.
    pub fn size(&self) -> i64 {
        self.size
    }
}

impl Drop for MemoryTicket {
    fn drop(&mut self) {
        let total = self.memory.adjust(-self.size);
        tracing::trace!(size = self.size, total, "external memory retracted");
    }
}

impl fmt::Debug for MemoryTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryTicket").field("size", &self.size).finish()
    }
}
