//! Single-slot frame hand-off between the reader thread and consumers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::frame::Frame;

/// Holds only the newest frame. Publishing replaces the slot wholesale, so a
/// reader either sees the previous frame or the new one, never a mix.
#[derive(Debug, Default)]
pub struct FrameMailbox {
    slot: Mutex<Option<Arc<Frame>>>,
    sequence: AtomicU64,
}

impl FrameMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `frame` as the latest, stamping it with the next sequence number.
    pub fn publish(&self, frame: Frame) -> u64 {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let frame = Arc::new(frame.with_sequence(sequence));
        *self.lock() = Some(frame);
        sequence
    }

    pub fn latest(&self) -> Option<Arc<Frame>> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().take();
    }

    /// Number of frames published so far.
    pub fn published(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<Frame>>> {
        // the slot is a plain Option, a panicked writer cannot leave it torn
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
