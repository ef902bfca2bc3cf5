//! Per-frame rate limiting of outbound messages.
//!
//! Messages are queued as they are produced and released at most `per_frame`
//! at a time, once per frame tick, so a large batch cannot flood the receiving
//! side in one burst.
use std::collections::VecDeque;

/// FIFO queue released in frame-sized slices.
pub struct FrameQueue<T> {
    pending: VecDeque<T>,
    per_frame: usize,
}

impl<T> FrameQueue<T> {
    /// Queue releasing at most `per_frame` items per frame (at least one).
    pub fn new(per_frame: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            per_frame: per_frame.max(1),
        }
    }

    /// Append items in order.
    pub fn extend(&mut self, items: impl IntoIterator<Item = T>) {
        self.pending.extend(items);
    }

    /// Items released for the current frame, oldest first.
    pub fn drain_frame(&mut self) -> std::collections::vec_deque::Drain<'_, T> {
        let n = self.pending.len().min(self.per_frame);
        self.pending.drain(..n)
    }

    /// Drop everything still queued.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Items waiting for a frame.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// `true` when nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
