//! Per-sink counters, shared between the handle and its worker.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use contracts::SinkHealth;

#[derive(Debug, Default)]
pub struct SinkMetrics {
    queue_len: AtomicUsize,
    written: AtomicU64,
    failed: AtomicU64,
    /// Events evicted from a full queue
    evicted: AtomicU64,
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_queue(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Count the outcome of one `EventSink::write`
    pub fn record_write(&self, ok: bool) {
        let counter = if ok { &self.written } else { &self.failed };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn write_count(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn dropped_count(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    /// Health entry for the sink called `name`
    pub fn health(&self, name: &str) -> SinkHealth {
        SinkHealth {
            name: name.to_string(),
            queue_len: self.queue_len.load(Ordering::Relaxed),
            write_count: self.write_count(),
            failure_count: self.failure_count(),
            dropped_count: self.dropped_count(),
        }
    }
}
