//! SyncedPair - synchronizer output
//!
//! A 2D frame and a 3D frame whose capture timestamps fall inside the
//! tolerance window, plus the diagnostics exposed by the synchronizer.

use serde::{Deserialize, Serialize};

use crate::{SourceFrame, SourceId, SourceKind};

/// Synchronized 2D/3D frame pair. Transient: built by the synchronizer and
/// consumed immediately by fusion.
#[derive(Debug, Clone)]
pub struct SyncedPair {
    pub frame_2d: SourceFrame,
    pub frame_3d: SourceFrame,
    /// |t_2d - t_3d| in seconds
    pub delta_t: f64,
    pub quality: SyncQuality,
}

impl SyncedPair {
    /// Reference time of the pair (the 2D capture time).
    pub fn timestamp(&self) -> f64 {
        self.frame_2d.capture_timestamp
    }
}

/// Pair quality relative to the tolerance window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncQuality {
    Excellent,
    Good,
    Acceptable,
    Poor,
}

impl SyncQuality {
    /// Grade `delta_t` against `tolerance` (both seconds).
    pub fn grade(delta_t: f64, tolerance: f64) -> Self {
        if tolerance <= 0.0 {
            return SyncQuality::Poor;
        }
        let ratio = delta_t.abs() / tolerance;
        if ratio <= 0.25 {
            SyncQuality::Excellent
        } else if ratio <= 0.5 {
            SyncQuality::Good
        } else if ratio <= 0.75 {
            SyncQuality::Acceptable
        } else {
            SyncQuality::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncQuality::Excellent => "excellent",
            SyncQuality::Good => "good",
            SyncQuality::Acceptable => "acceptable",
            SyncQuality::Poor => "poor",
        }
    }
}

/// Per-source synchronizer counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceSyncStats {
    pub source_id: SourceId,
    pub kind: Option<SourceKind>,
    pub buffer_depth: usize,
    pub capacity: usize,
    pub received: u64,
    /// Evicted because the buffer was full
    pub dropped_overflow: u64,
    /// Discarded as too old to ever pair
    pub dropped_stale: u64,
    /// Late or duplicate arrival (timestamp not increasing)
    pub dropped_out_of_order: u64,
    pub paired: u64,
    pub last_timestamp: Option<f64>,
}

impl SourceSyncStats {
    pub fn dropped_total(&self) -> u64 {
        self.dropped_overflow + self.dropped_stale + self.dropped_out_of_order
    }

    /// Buffer fill ratio in percent
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.buffer_depth as f64 / self.capacity as f64 * 100.0
        }
    }
}

/// Read-only synchronizer snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStats {
    pub sources: Vec<SourceSyncStats>,
    pub pairs_emitted: u64,
    pub video_only_emitted: u64,
    pub unknown_source_rejects: u64,
    pub mean_delta_ms: f64,
    pub max_delta_ms: f64,
    /// Grade of the most recent pair
    pub last_quality: Option<SyncQuality>,
}

impl SyncStats {
    pub fn source(&self, source_id: &str) -> Option<&SourceSyncStats> {
        self.sources.iter().find(|s| s.source_id == source_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_grades() {
        assert_eq!(SyncQuality::grade(0.02, 0.1), SyncQuality::Excellent);
        assert_eq!(SyncQuality::grade(0.05, 0.1), SyncQuality::Good);
        assert_eq!(SyncQuality::grade(-0.07, 0.1), SyncQuality::Acceptable);
        assert_eq!(SyncQuality::grade(0.1, 0.1), SyncQuality::Poor);
    }

    #[test]
    fn test_utilization() {
        let s = SourceSyncStats {
            buffer_depth: 15,
            capacity: 60,
            ..Default::default()
        };
        assert!((s.utilization() - 25.0).abs() < 1e-9);
    }
}
