use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::shared::frame::Frame;

/// Single-slot, overwrite-on-write holder for the freshest frame.
///
/// One acquisition thread publishes, any number of readers take copies.
/// The lock is held only while moving a frame in or cloning it out, so a
/// reader always sees a whole frame, old or new, and never a mix of two.
#[derive(Default)]
pub struct FrameBuffer {
    last_frame: Mutex<Option<Frame>>,
    published: AtomicU64,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored frame. The previous frame is dropped after the
    /// lock is released.
    pub fn publish(&self, frame: Frame) {
        let previous = self.slot().replace(frame);
        self.published.fetch_add(1, Ordering::Release);
        drop(previous);
    }

    /// A copy of the most recently published frame, or `None` before the
    /// first publish.
    pub fn latest(&self) -> Option<Frame> {
        self.slot().as_ref().cloned()
    }

    /// Number of frames published so far.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Acquire)
    }

    // The slot is only ever swapped whole, so a poisoned lock still guards
    // a complete frame.
    fn slot(&self) -> MutexGuard<'_, Option<Frame>> {
        self.last_frame
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
