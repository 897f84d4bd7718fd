//! Track lifecycle types
//!
//! The track table itself lives in the tracker; these are the notices and
//! read-only snapshots it hands out.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Point3;

pub type ObjectId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackState {
    New,
    Active,
    Idle,
    Lost,
}

impl fmt::Display for TrackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrackState::New => "NEW",
            TrackState::Active => "ACTIVE",
            TrackState::Idle => "IDLE",
            TrackState::Lost => "LOST",
        };
        f.write_str(s)
    }
}

/// Internal lifecycle notice (not a user-facing event)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackEventKind {
    Created,
    Activated,
    BecameIdle,
    Resumed,
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackEvent {
    pub object_id: ObjectId,
    pub kind: TrackEventKind,
    pub timestamp: f64,
}

/// Per-track summary for health readers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub object_id: ObjectId,
    pub state: TrackState,
    pub class: String,
    pub position: Option<Point3>,
    pub current_speed: f64,
    pub cumulative_distance: f64,
    pub last_update_time: f64,
}

/// Active / idle / lost counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackCounts {
    pub new: usize,
    pub active: usize,
    pub idle: usize,
    /// Tracks evicted as LOST since start
    pub lost_total: u64,
}

/// Read-only copy of the track table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerSnapshot {
    pub timestamp: f64,
    pub counts: TrackCounts,
    pub tracks: Vec<TrackSummary>,
}
