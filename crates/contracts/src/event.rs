//! Event - terminal artifact of the pipeline
//!
//! Shared envelope plus a tagged payload. Serialized shape:
//!
//! ```json
//! {"timestamp": "2024-05-01T12:00:00.250Z", "camera_id": "cam-01",
//!  "object_id": 7, "confidence": 0.86, "position": {"x": 1.0, "y": 2.0, "z": 0.0},
//!  "type": "zone_entry", "metadata": {"zone_id": "dock", ...}}
//! ```

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ObjectId, Point3, ZoneType};

/// Behavioral event. Never mutated after emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub camera_id: String,
    pub object_id: ObjectId,
    /// 0.0 - 1.0
    pub confidence: f64,
    /// `null` for events raised from 2D-only state
    pub position: Option<Point3>,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    pub fn event_type(&self) -> EventType {
        self.kind.event_type()
    }
}

/// Type-specific payload; `type` + `metadata` on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "metadata", rename_all = "snake_case")]
pub enum EventKind {
    ZoneEntry(ZoneTransition),
    ZoneExit(ZoneTransition),
    Idle(IdleDetails),
    Fall(FallDetails),
    DistanceChange(DistanceDetails),
    SpeedAlert(SpeedDetails),
    NewObject(NewObjectDetails),
}

impl EventKind {
    pub fn event_type(&self) -> EventType {
        match self {
            EventKind::ZoneEntry(_) => EventType::ZoneEntry,
            EventKind::ZoneExit(_) => EventType::ZoneExit,
            EventKind::Idle(_) => EventType::Idle,
            EventKind::Fall(_) => EventType::Fall,
            EventKind::DistanceChange(_) => EventType::DistanceChange,
            EventKind::SpeedAlert(_) => EventType::SpeedAlert,
            EventKind::NewObject(_) => EventType::NewObject,
        }
    }

    /// Zone id for zone transitions
    pub fn zone_id(&self) -> Option<&str> {
        match self {
            EventKind::ZoneEntry(z) | EventKind::ZoneExit(z) => Some(&z.zone_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ZoneEntry,
    ZoneExit,
    Idle,
    Fall,
    DistanceChange,
    SpeedAlert,
    NewObject,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ZoneEntry => "zone_entry",
            EventType::ZoneExit => "zone_exit",
            EventType::Idle => "idle",
            EventType::Fall => "fall",
            EventType::DistanceChange => "distance_change",
            EventType::SpeedAlert => "speed_alert",
            EventType::NewObject => "new_object",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneTransition {
    pub zone_id: String,
    pub zone_name: String,
    pub zone_type: ZoneType,
    pub priority: u8,
    /// Consecutive agreeing evaluations that confirmed the transition
    pub confirmations: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdleDetails {
    pub idle_duration_sec: f64,
    pub idle_threshold_m: f64,
    pub idle_threshold_sec: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallDetails {
    pub body_angle_deg: f64,
    pub height_drop_m: f64,
    pub window_sec: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceDetails {
    /// Displacement since the previous distance_change for this object
    pub distance_m: f64,
    pub threshold_m: f64,
    pub cumulative_distance_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedDetails {
    pub speed_ms: f64,
    pub threshold_ms: f64,
    pub direction: Option<Point3>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewObjectDetails {
    pub class: String,
    pub has_position: bool,
}

/// Capture-clock seconds to UTC; out-of-range input clamps to the epoch.
pub fn epoch_to_utc(seconds: f64) -> DateTime<Utc> {
    if !seconds.is_finite() || seconds.abs() > i64::MAX as f64 / 2.0 {
        return DateTime::<Utc>::UNIX_EPOCH;
    }
    let mut secs = seconds.floor() as i64;
    let mut nanos = ((seconds - seconds.floor()) * 1e9).round() as u32;
    if nanos >= 1_000_000_000 {
        secs += 1;
        nanos -= 1_000_000_000;
    }
    Utc.timestamp_opt(secs, nanos)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Wall clock in capture-clock units (seconds since the Unix epoch)
pub fn wall_clock_secs() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1e6
}
