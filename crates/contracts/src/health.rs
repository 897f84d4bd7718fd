//! Health surface consumed by operational tooling.

use serde::{Deserialize, Serialize};

use crate::{SourceSyncStats, TrackCounts};

/// Per-sink dispatcher counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkHealth {
    pub name: String,
    pub queue_len: usize,
    pub write_count: u64,
    pub failure_count: u64,
    pub dropped_count: u64,
}

/// Point-in-time copy of pipeline health
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthSnapshot {
    /// Wall clock when taken, seconds since the Unix epoch
    pub taken_at: f64,
    pub sources: Vec<SourceSyncStats>,
    pub pairs_processed: u64,
    pub video_only_processed: u64,
    pub tracks: TrackCounts,
    /// Wall clock minus capture time of the last processed frame, ms
    pub pipeline_lag_ms: f64,
    pub events_emitted: u64,
    pub sinks: Vec<SinkHealth>,
    /// True while running without depth
    pub degraded: bool,
}

impl HealthSnapshot {
    pub fn total_dropped_frames(&self) -> u64 {
        self.sources.iter().map(|s| s.dropped_total()).sum()
    }
}
