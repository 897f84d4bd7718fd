//! Per-source ingestion counters

use std::sync::atomic::{AtomicU64, Ordering};

use sync_engine::IngestOutcome;

/// Ingestion metrics of one source
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Frames handed over by the source
    pub frames_received: AtomicU64,

    /// Frames that evicted the oldest buffered frame
    pub frames_evicted: AtomicU64,

    /// Late or duplicate frames
    pub frames_out_of_order: AtomicU64,

    /// Frames the synchronizer refused (wrong source or payload kind)
    pub frames_rejected: AtomicU64,

    /// Capture timestamp of the last frame, stored as f64 bits
    last_timestamp_bits: AtomicU64,
}

impl IngestionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self, timestamp: f64) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.last_timestamp_bits
            .store(timestamp.to_bits(), Ordering::Relaxed);
    }

    pub fn record_outcome(&self, outcome: IngestOutcome) {
        match outcome {
            IngestOutcome::Buffered => {}
            IngestOutcome::BufferedWithEviction => {
                self.frames_evicted.fetch_add(1, Ordering::Relaxed);
            }
            IngestOutcome::DroppedOutOfOrder => {
                self.frames_out_of_order.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn record_rejected(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let received = self.frames_received.load(Ordering::Relaxed);
        MetricsSnapshot {
            frames_received: received,
            frames_evicted: self.frames_evicted.load(Ordering::Relaxed),
            frames_out_of_order: self.frames_out_of_order.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            last_timestamp: (received > 0)
                .then(|| f64::from_bits(self.last_timestamp_bits.load(Ordering::Relaxed))),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub frames_received: u64,
    pub frames_evicted: u64,
    pub frames_out_of_order: u64,
    pub frames_rejected: u64,
    pub last_timestamp: Option<f64>,
}

impl MetricsSnapshot {
    /// Frames that never reached the matcher
    pub fn dropped(&self) -> u64 {
        self.frames_out_of_order + self.frames_rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcomes_are_counted() {
        let metrics = IngestionMetrics::new();
        assert_eq!(metrics.snapshot().last_timestamp, None);

        metrics.record_received(10.5);
        metrics.record_outcome(IngestOutcome::Buffered);
        metrics.record_received(10.6);
        metrics.record_outcome(IngestOutcome::BufferedWithEviction);
        metrics.record_received(10.4);
        metrics.record_outcome(IngestOutcome::DroppedOutOfOrder);
        metrics.record_rejected();

        let snap = metrics.snapshot();
        assert_eq!(snap.frames_received, 3);
        assert_eq!(snap.frames_evicted, 1);
        assert_eq!(snap.frames_out_of_order, 1);
        assert_eq!(snap.dropped(), 2);
        assert_eq!(snap.last_timestamp, Some(10.4));
    }
}
