//! Per-source bounded FIFO of frames.
//!
//! Uses index-based separation:
//! - HeapRb stores lightweight metadata (timestamp + slab key), oldest first
//! - Slab stores the actual SourceFrame
//!
//! Frames must arrive with strictly increasing capture timestamps; a frame
//! that does not is treated as late/duplicate and rejected.

use std::fmt;

use contracts::SourceFrame;
use ringbuf::{traits::*, HeapRb};
use slab::Slab;

#[derive(Debug, Clone, Copy)]
struct FrameMeta {
    timestamp: f64,
    slab_key: usize,
}

/// Result of [`FrameBuffer::push`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Accepted,
    /// Accepted after evicting the oldest frame
    AcceptedWithEviction,
    /// Timestamp not newer than the last accepted frame
    RejectedOutOfOrder,
}

pub struct FrameBuffer {
    index: HeapRb<FrameMeta>,
    storage: Slab<SourceFrame>,
    capacity: usize,
    last_timestamp: Option<f64>,
    dropped_overflow: u64,
    dropped_out_of_order: u64,
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("len", &self.index.occupied_len())
            .field("capacity", &self.capacity)
            .field("dropped_overflow", &self.dropped_overflow)
            .finish()
    }
}

impl FrameBuffer {
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            index: HeapRb::new(capacity),
            storage: Slab::with_capacity(capacity),
            capacity,
            last_timestamp: None,
            dropped_overflow: 0,
            dropped_out_of_order: 0,
        }
    }

    /// Append a frame, evicting the oldest one when full.
    pub fn push(&mut self, frame: SourceFrame) -> PushOutcome {
        let timestamp = frame.capture_timestamp;
        if let Some(last) = self.last_timestamp {
            if !(timestamp > last) {
                self.dropped_out_of_order += 1;
                return PushOutcome::RejectedOutOfOrder;
            }
        }
        self.last_timestamp = Some(timestamp);

        let mut outcome = PushOutcome::Accepted;
        if self.index.is_full() {
            if let Some(old) = self.index.try_pop() {
                self.storage.remove(old.slab_key);
            }
            self.dropped_overflow += 1;
            outcome = PushOutcome::AcceptedWithEviction;
        }

        let slab_key = self.storage.insert(frame);
        let _ = self.index.try_push(FrameMeta {
            timestamp,
            slab_key,
        });
        outcome
    }

    /// Capture timestamp of the oldest buffered frame
    pub fn front_timestamp(&self) -> Option<f64> {
        self.index.iter().next().map(|m| m.timestamp)
    }

    /// Buffered timestamps, oldest first
    pub fn timestamps(&self) -> impl Iterator<Item = f64> + '_ {
        self.index.iter().map(|m| m.timestamp)
    }

    pub fn pop_front(&mut self) -> Option<SourceFrame> {
        let meta = self.index.try_pop()?;
        Some(self.storage.remove(meta.slab_key))
    }

    /// Drop the `n` oldest frames, returning how many were removed.
    pub fn discard_front(&mut self, n: usize) -> usize {
        let mut removed = 0;
        while removed < n && self.pop_front().is_some() {
            removed += 1;
        }
        removed
    }

    pub fn clear(&mut self) {
        while self.index.try_pop().is_some() {}
        self.storage.clear();
    }

    pub fn len(&self) -> usize {
        self.index.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Newest timestamp ever accepted (survives eviction and clear)
    pub fn last_timestamp(&self) -> Option<f64> {
        self.last_timestamp
    }

    pub fn dropped_overflow(&self) -> u64 {
        self.dropped_overflow
    }

    pub fn dropped_out_of_order(&self) -> u64 {
        self.dropped_out_of_order
    }

    pub fn reset_counters(&mut self) {
        self.dropped_overflow = 0;
        self.dropped_out_of_order = 0;
    }
}
