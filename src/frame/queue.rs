//! Pending frame queue
//!
//! Decouples a slow, possibly-blocking acquisition step from the CPU-only
//! processing step: a slow capture never stalls processing of frames already
//! captured, and vice versa. Insertion order is processing order.
//!
//! The queue is bounded. On overflow the oldest frame is dropped and handed
//! back to the caller, so the freshest frames always survive when processing
//! cannot keep up with acquisition.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use super::Frame;

/// Default bound on queued frames
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Bounded FIFO queue of frames awaiting processing
///
/// Safe under the concurrent producer/consumer access pattern of two
/// independent timers; a single mutex guards the sequence.
#[derive(Debug)]
pub struct FrameQueue {
    capacity: usize,
    inner: Mutex<VecDeque<Frame>>,
}

impl FrameQueue {
    /// Create a queue with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Create a queue bounded at `capacity` frames (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(VecDeque::new()),
        }
    }

    /// Append a frame to the tail; never blocks the producer
    ///
    /// Returns the evicted oldest frame when the queue was full.
    pub fn push(&self, frame: Frame) -> Option<Frame> {
        let mut queue = self.lock();
        let evicted = if queue.len() >= self.capacity {
            queue.pop_front()
        } else {
            None
        };
        queue.push_back(frame);
        evicted
    }

    /// Remove and return the head, or `None` without blocking
    pub fn try_pop(&self) -> Option<Frame> {
        self.lock().pop_front()
    }

    /// Current depth; advisory only, may be stale the instant it is read
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove and return every queued frame; used at shutdown
    pub fn drain(&self) -> Vec<Frame> {
        self.lock().drain(..).collect()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Frame>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for FrameQueue {
    fn default() -> Self {
        Self::new()
    }
}
