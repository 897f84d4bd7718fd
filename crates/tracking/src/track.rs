//! Track - one tracked object and its kinematic history.
//!
//! Position history is a bounded ring buffer:
//! - only 3D-positioned observations enter the history
//! - 2D-only observations refresh presence (`last_seen`, bbox) only

use std::fmt;

use contracts::{Axis, BBox, FusedObservation, ObjectId, Point3, TrackState, TrackSummary};
use ringbuf::{traits::*, HeapRb};

/// Below this displacement (meters) a window has no direction
const MIN_DIRECTION_NORM: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSample {
    pub timestamp: f64,
    pub position: Point3,
}

/// Sliding-window kinematics
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Kinematics {
    /// Path length inside the window (meters)
    pub window_distance: f64,
    /// window_distance / window elapsed time (m/s)
    pub speed: f64,
    /// Unit vector oldest → newest, `None` when nearly stationary
    pub direction: Option<Point3>,
}

pub struct Track {
    pub object_id: ObjectId,
    pub state: TrackState,
    pub class: String,

    pub first_seen: f64,
    /// Latest match of any kind
    pub last_seen: f64,
    /// Liveness clock; see [`crate::Tracker`]
    pub last_update_time: f64,

    pub position: Option<Point3>,
    pub bbox: Option<BBox>,
    pub detector_confidence: f64,
    pub projection_validity: f64,
    pub body_angle_deg: Option<f64>,

    pub kinematics: Kinematics,
    pub cumulative_distance: f64,
    pub max_speed: f64,

    /// Consecutive update cycles with a match
    pub consecutive_matches: u32,
    pub total_matches: u64,

    /// Start of the current stationary period
    idle_anchor: Option<PositionSample>,
    history: HeapRb<PositionSample>,
}

impl fmt::Debug for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Track")
            .field("object_id", &self.object_id)
            .field("state", &self.state)
            .field("position", &self.position)
            .field("speed", &self.kinematics.speed)
            .field("history_len", &self.history.occupied_len())
            .finish()
    }
}

impl Track {
    pub(crate) fn spawn(
        object_id: ObjectId,
        observation: &FusedObservation,
        timestamp: f64,
        history_capacity: usize,
    ) -> Self {
        let mut track = Self {
            object_id,
            state: TrackState::New,
            class: observation.class.clone(),
            first_seen: timestamp,
            last_seen: timestamp,
            last_update_time: timestamp,
            position: None,
            bbox: observation.bbox,
            detector_confidence: observation.detector_confidence,
            projection_validity: observation.projection_validity,
            body_angle_deg: observation.body_angle_deg,
            kinematics: Kinematics::default(),
            cumulative_distance: 0.0,
            max_speed: 0.0,
            consecutive_matches: 0,
            total_matches: 0,
            idle_anchor: None,
            history: HeapRb::new(history_capacity.max(2)),
        };
        if let Some(position) = observation.position {
            track.push_position(position, timestamp, f64::INFINITY);
        }
        track
    }

    /// Any 3D position ever recorded
    pub fn has_spatial_history(&self) -> bool {
        self.position.is_some()
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self.state, TrackState::Active | TrackState::Idle)
    }

    /// Position history, oldest first
    pub fn history(&self) -> impl Iterator<Item = &PositionSample> + '_ {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.occupied_len()
    }

    /// Seconds spent in the current stationary period
    pub fn stationary_for(&self, now: f64) -> f64 {
        self.idle_anchor
            .map(|a| (now - a.timestamp).max(0.0))
            .unwrap_or(0.0)
    }

    /// Mean speed over the whole spatial lifetime
    pub fn average_speed(&self) -> f64 {
        let first = self.history.iter().next().map(|s| s.timestamp);
        match first {
            Some(t0) if self.last_update_time > t0 => {
                self.cumulative_distance / (self.last_update_time - t0)
            }
            _ => 0.0,
        }
    }

    /// Drop of the coordinate along `axis` from its peak within the last
    /// `window_sec` to the current position. Never negative.
    pub fn height_drop(&self, axis: Axis, window_sec: f64, now: f64) -> f64 {
        let Some(current) = self.position else {
            return 0.0;
        };
        let peak = self
            .history
            .iter()
            .filter(|s| s.timestamp >= now - window_sec)
            .map(|s| s.position.along(axis))
            .fold(f64::NEG_INFINITY, f64::max);
        if peak.is_finite() {
            (peak - current.along(axis)).max(0.0)
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> TrackSummary {
        TrackSummary {
            object_id: self.object_id,
            state: self.state,
            class: self.class.clone(),
            position: self.position,
            current_speed: self.kinematics.speed,
            cumulative_distance: self.cumulative_distance,
            last_update_time: self.last_update_time,
        }
    }

    /// Apply a matched observation. Returns the distance moved when the
    /// observation carried a position.
    pub(crate) fn apply(
        &mut self,
        observation: &FusedObservation,
        timestamp: f64,
        kinematics_window_sec: f64,
    ) -> Option<f64> {
        self.last_seen = timestamp;
        self.consecutive_matches = self.consecutive_matches.saturating_add(1);
        self.total_matches += 1;
        self.class.clone_from(&observation.class);
        if observation.bbox.is_some() {
            self.bbox = observation.bbox;
        }
        self.detector_confidence = observation.detector_confidence;
        self.projection_validity = observation.projection_validity;
        self.body_angle_deg = observation.body_angle_deg;

        match observation.position {
            Some(position) => Some(self.push_position(position, timestamp, kinematics_window_sec)),
            None => {
                if !self.has_spatial_history() {
                    self.last_update_time = timestamp;
                }
                None
            }
        }
    }

    fn push_position(&mut self, position: Point3, timestamp: f64, window_sec: f64) -> f64 {
        let step = self.position.map(|p| p.distance(&position)).unwrap_or(0.0);
        self.cumulative_distance += step;
        self.position = Some(position);
        self.last_update_time = timestamp;
        self.history.push_overwrite(PositionSample {
            timestamp,
            position,
        });
        self.kinematics = self.window_kinematics(timestamp, window_sec);
        self.max_speed = self.max_speed.max(self.kinematics.speed);
        step
    }

    fn window_kinematics(&self, now: f64, window_sec: f64) -> Kinematics {
        let mut window = self
            .history
            .iter()
            .skip_while(|s| s.timestamp < now - window_sec);
        let Some(oldest) = window.next() else {
            return Kinematics::default();
        };
        let (newest, window_distance) = window.fold((oldest, 0.0), |(prev, sum), s| {
            (s, sum + prev.position.distance(&s.position))
        });

        let elapsed = newest.timestamp - oldest.timestamp;
        let speed = if elapsed > 0.0 {
            window_distance / elapsed
        } else {
            0.0
        };
        let displacement = newest.position - oldest.position;
        let norm = displacement.norm();
        let direction = (norm > MIN_DIRECTION_NORM).then(|| displacement.scale(1.0 / norm));

        Kinematics {
            window_distance,
            speed,
            direction,
        }
    }

    /// Idle bookkeeping after a 3D update. Returns the new state when it
    /// changed.
    pub(crate) fn update_idle(
        &mut self,
        timestamp: f64,
        idle_threshold_m: f64,
        idle_duration_sec: f64,
    ) -> Option<TrackState> {
        let position = self.position?;
        let anchor = match self.idle_anchor {
            Some(anchor) if anchor.position.distance(&position) < idle_threshold_m => anchor,
            _ => {
                // moved: restart the stationary period here
                self.idle_anchor = Some(PositionSample {
                    timestamp,
                    position,
                });
                if self.state == TrackState::Idle {
                    self.state = TrackState::Active;
                    return Some(TrackState::Active);
                }
                return None;
            }
        };

        if self.state == TrackState::Active && timestamp - anchor.timestamp >= idle_duration_sec {
            self.state = TrackState::Idle;
            return Some(TrackState::Idle);
        }
        None
    }
}
