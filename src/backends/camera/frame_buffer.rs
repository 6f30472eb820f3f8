// SPDX-License-Identifier: GPL-3.0-only

//! Recent-frame storage shared between the capture thread and readers
//!
//! Two independent locks guard two structures:
//!
//! - [`FrameRing`]: the last few processed frames, read with a timed lock so
//!   a busy producer never stalls a caller for long.
//! - [`FrameSlot`]: the newest frame plus a generation counter, paired with
//!   a condition variable that wakes every waiter on each publish.
//!
//! The producer updates the ring first, then the slot, and never holds both
//! locks at once.

use super::types::Frame;
use crate::constants::buffer::RING_CAPACITY;
use crate::constants::capture::LOCK_TIMEOUT;
use crate::constants::zoom::MIN_ZOOM;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A processed frame together with the frame it was rendered from
#[derive(Debug, Clone)]
pub struct BufferedFrame {
    pub processed: Arc<Frame>,
    /// Zoomed but not tone-adjusted
    pub source: Arc<Frame>,
}

/// Bounded ring of recent frames, newest last
#[derive(Debug)]
pub struct FrameRing {
    entries: VecDeque<BufferedFrame>,
    capacity: usize,
}

impl FrameRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Append a frame, evicting the oldest when full
    pub fn push(&mut self, entry: BufferedFrame) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn newest(&self) -> Option<&BufferedFrame> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate from newest to oldest
    pub fn iter_newest_first(&self) -> impl Iterator<Item = &BufferedFrame> {
        self.entries.iter().rev()
    }
}

/// Newest-frame slot guarded by the notification lock
#[derive(Debug)]
pub struct FrameSlot {
    pub latest: Option<Arc<Frame>>,
    pub available: bool,
    /// Incremented on every publish
    pub generation: u64,
    /// Zoom applied to frames processed after this point
    pub zoom: f32,
}

impl Default for FrameSlot {
    fn default() -> Self {
        Self {
            latest: None,
            available: false,
            generation: 0,
            zoom: MIN_ZOOM,
        }
    }
}

/// Ring, slot and condition variable shared by producer and consumers
#[derive(Debug)]
pub struct FrameBuffer {
    ring: Mutex<FrameRing>,
    slot: Mutex<FrameSlot>,
    frame_ready: Condvar,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::with_capacity(RING_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ring: Mutex::new(FrameRing::new(capacity)),
            slot: Mutex::new(FrameSlot::default()),
            frame_ready: Condvar::new(),
        }
    }

    /// Publish a new frame: ring first, then slot, then wake all waiters
    pub fn publish(&self, entry: BufferedFrame) {
        let processed = Arc::clone(&entry.processed);
        self.ring.lock().push(entry);

        let mut slot = self.slot.lock();
        slot.latest = Some(processed);
        slot.available = true;
        slot.generation = slot.generation.wrapping_add(1);
        drop(slot);

        self.frame_ready.notify_all();
    }

    /// Try to take the buffer lock within `timeout`
    pub fn try_lock_ring_for(&self, timeout: Duration) -> Option<MutexGuard<'_, FrameRing>> {
        self.ring.try_lock_for(timeout)
    }

    /// Newest processed frame
    ///
    /// Gives up and returns `None` when the buffer lock stays busy longer
    /// than the normal capture lock timeout.
    pub fn newest(&self) -> Option<Arc<Frame>> {
        self.newest_entry().map(|entry| entry.processed)
    }

    /// Newest ring entry, `None` when empty or the lock stays busy
    pub fn newest_entry(&self) -> Option<BufferedFrame> {
        self.ring.try_lock_for(LOCK_TIMEOUT)?.newest().cloned()
    }

    pub fn ring_len(&self) -> usize {
        self.ring.lock().len()
    }

    /// Current publish generation
    pub fn generation(&self) -> u64 {
        self.slot.lock().generation
    }

    /// Wait for a frame published after `seen_generation`
    ///
    /// Returns the latest frame when the generation moved past
    /// `seen_generation` before `timeout`, otherwise `None`. Every waiter is
    /// woken by each publish, so concurrent waiters never steal frames from
    /// each other.
    pub fn wait_for_new(&self, seen_generation: u64, timeout: Duration) -> Option<Arc<Frame>> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock();
        while slot.generation == seen_generation {
            if self.frame_ready.wait_until(&mut slot, deadline).timed_out() {
                break;
            }
        }
        if slot.generation != seen_generation && slot.available {
            slot.latest.clone()
        } else {
            None
        }
    }

    pub fn zoom(&self) -> f32 {
        self.slot.lock().zoom
    }

    pub fn set_zoom(&self, level: f32) {
        self.slot.lock().zoom = level;
    }

    pub fn has_frame(&self) -> bool {
        self.slot.lock().available
    }

    /// Drop all buffered frames; zoom and generation are kept
    pub fn clear(&self) {
        self.ring.lock().clear();
        let mut slot = self.slot.lock();
        slot.latest = None;
        slot.available = false;
    }
}
