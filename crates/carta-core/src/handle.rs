//! Shared-ownership handle to a pixel buffer.
//!
//! A single [`RgbaBuffer`] may be observed at once by several wrappers,
//! worker jobs, views and compositing sources. [`BufferHandle`] is the
//! reference-counted, thread-safe pointer they all hold.
//!
//! Lock poisoning is ignored: a job that panicked mid-operation leaves the
//! pixels in whatever state it reached, and later users proceed with it.

use crate::{Color, RgbaBuffer};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Cheaply clonable, `Send + Sync` handle to an [`RgbaBuffer`].
#[derive(Debug, Clone)]
pub struct BufferHandle {
    inner: Arc<RwLock<RgbaBuffer>>,
}

impl BufferHandle {
    /// Wraps a buffer.
    pub fn new(buffer: RgbaBuffer) -> Self {
        Self {
            inner: Arc::new(RwLock::new(buffer)),
        }
    }

    /// Shared access to the pixels.
    pub fn read(&self) -> RwLockReadGuard<'_, RgbaBuffer> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive access to the pixels.
    pub fn write(&self) -> RwLockWriteGuard<'_, RgbaBuffer> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` if both handles point to the same buffer.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of live handles to this buffer.
    #[inline]
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Current `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        let buf = self.read();
        (buf.width(), buf.height())
    }

    /// Current background color.
    pub fn background(&self) -> Option<Color> {
        self.read().background()
    }

    /// Copies the buffer out.
    pub fn snapshot(&self) -> RgbaBuffer {
        self.read().clone()
    }
}

impl From<RgbaBuffer> for BufferHandle {
    fn from(buffer: RgbaBuffer) -> Self {
        Self::new(buffer)
    }
}
