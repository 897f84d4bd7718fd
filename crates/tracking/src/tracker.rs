//! Tracker - single-owner track table.
//!
//! Per update cycle:
//! 1. Expire tracks whose liveness clock is older than `lost_timeout_sec`
//! 2. Associate observations to tracks, closest gated pair first
//!    - 3D: world distance under `max_speed_ms × dt + min_gate_m`
//!    - 2D: bbox IoU ≥ `image_gate_iou` where either side lacks a position
//! 3. Spawn NEW tracks for leftover observations
//!
//! Liveness: a track with 3D history is only kept alive by 3D matches; a
//! track without one is kept alive by any match.

use std::collections::{BTreeMap, BTreeSet};

use contracts::{
    FusedObservation, ObjectId, TrackCounts, TrackEvent, TrackEventKind, TrackState,
    TrackerConfig, TrackerSnapshot,
};
use tracing::{debug, info, instrument};

use crate::track::Track;

#[derive(Debug)]
pub struct Tracker {
    config: TrackerConfig,
    tracks: BTreeMap<ObjectId, Track>,
    next_id: ObjectId,
    lost_total: u64,
    last_timestamp: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    object_id: ObjectId,
    observation: usize,
    cost: f64,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            tracks: BTreeMap::new(),
            next_id: 1,
            lost_total: 0,
            last_timestamp: None,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Run one update cycle.
    #[instrument(
        name = "tracker_update",
        skip(self, observations),
        fields(t = timestamp, observations = observations.len(), tracks = self.tracks.len())
    )]
    pub fn update(&mut self, observations: &[FusedObservation], timestamp: f64) -> Vec<TrackEvent> {
        let mut events = Vec::new();
        self.last_timestamp = Some(timestamp);

        self.expire(timestamp, &mut events);

        let (assigned, matched_tracks) = self.associate(observations, timestamp);

        for (idx, object_id) in assigned.iter().enumerate() {
            let Some(object_id) = object_id else { continue };
            let Some(track) = self.tracks.get_mut(object_id) else {
                continue;
            };
            let moved = track.apply(&observations[idx], timestamp, self.config.kinematics_window_sec);

            if track.state == TrackState::New
                && track.consecutive_matches >= self.config.activation_matches
            {
                track.state = TrackState::Active;
                events.push(notice(*object_id, TrackEventKind::Activated, timestamp));
                debug!(object_id, "Track activated");
            }
            if moved.is_some() {
                let change = track.update_idle(
                    timestamp,
                    self.config.idle_threshold_m,
                    self.config.idle_duration_sec,
                );
                match change {
                    Some(TrackState::Idle) => {
                        events.push(notice(*object_id, TrackEventKind::BecameIdle, timestamp));
                    }
                    Some(TrackState::Active) => {
                        events.push(notice(*object_id, TrackEventKind::Resumed, timestamp));
                    }
                    _ => {}
                }
            }
        }

        // NEW tracks need consecutive matches
        for (object_id, track) in self.tracks.iter_mut() {
            if !matched_tracks.contains(object_id) && track.state == TrackState::New {
                track.consecutive_matches = 0;
            }
        }

        for (idx, observation) in observations.iter().enumerate() {
            if assigned[idx].is_some() {
                continue;
            }
            let object_id = self.next_id;
            self.next_id += 1;
            let mut track = Track::spawn(
                object_id,
                observation,
                timestamp,
                self.config.history_capacity,
            );
            track.update_idle(
                timestamp,
                self.config.idle_threshold_m,
                self.config.idle_duration_sec,
            );
            self.tracks.insert(object_id, track);
            events.push(notice(object_id, TrackEventKind::Created, timestamp));
            debug!(object_id, has_position = observation.has_position(), "Track created");
        }

        observability::record_track_counts(&self.counts());
        events
    }

    fn expire(&mut self, timestamp: f64, events: &mut Vec<TrackEvent>) {
        let timeout = self.config.lost_timeout_sec;
        let lost: Vec<ObjectId> = self
            .tracks
            .values()
            .filter(|t| timestamp - t.last_update_time > timeout)
            .map(|t| t.object_id)
            .collect();

        for object_id in lost {
            if let Some(mut track) = self.tracks.remove(&object_id) {
                track.state = TrackState::Lost;
                self.lost_total += 1;
                info!(
                    object_id,
                    silent_for = timestamp - track.last_update_time,
                    "Track lost"
                );
                events.push(notice(object_id, TrackEventKind::Lost, timestamp));
            }
        }
    }

    /// Global greedy association. Returns the track assigned to each
    /// observation and the set of matched track ids.
    fn associate(
        &self,
        observations: &[FusedObservation],
        timestamp: f64,
    ) -> (Vec<Option<ObjectId>>, BTreeSet<ObjectId>) {
        let mut spatial: Vec<Candidate> = Vec::new();
        let mut image: Vec<Candidate> = Vec::new();

        for track in self.tracks.values() {
            let dt = (timestamp - track.last_update_time).max(0.0);
            let gate = self.config.max_speed_ms * dt + self.config.min_gate_m;
            for (idx, obs) in observations.iter().enumerate() {
                if obs.class != track.class {
                    continue;
                }
                match (obs.position, track.position) {
                    (Some(p), Some(q)) => {
                        let d = p.distance(&q);
                        if d <= gate {
                            spatial.push(Candidate {
                                object_id: track.object_id,
                                observation: idx,
                                cost: d,
                            });
                        }
                    }
                    _ => {
                        let (Some(a), Some(b)) = (obs.bbox, track.bbox) else {
                            continue;
                        };
                        let iou = a.iou(&b);
                        if iou >= self.config.image_gate_iou && iou > 0.0 {
                            image.push(Candidate {
                                object_id: track.object_id,
                                observation: idx,
                                cost: 1.0 - iou,
                            });
                        }
                    }
                }
            }
        }

        let mut assigned: Vec<Option<ObjectId>> = vec![None; observations.len()];
        let mut matched = BTreeSet::new();
        for mut candidates in [spatial, image] {
            candidates.sort_by(|a, b| {
                a.cost
                    .total_cmp(&b.cost)
                    .then(a.object_id.cmp(&b.object_id))
                    .then(a.observation.cmp(&b.observation))
            });
            for c in candidates {
                if assigned[c.observation].is_some() || !matched.insert(c.object_id) {
                    continue;
                }
                assigned[c.observation] = Some(c.object_id);
            }
        }
        (assigned, matched)
    }

    pub fn get(&self, object_id: ObjectId) -> Option<&Track> {
        self.tracks.get(&object_id)
    }

    /// Live tracks ordered by object id
    pub fn tracks(&self) -> impl Iterator<Item = &Track> + '_ {
        self.tracks.values()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn counts(&self) -> TrackCounts {
        let mut counts = TrackCounts {
            lost_total: self.lost_total,
            ..Default::default()
        };
        for track in self.tracks.values() {
            match track.state {
                TrackState::New => counts.new += 1,
                TrackState::Active => counts.active += 1,
                TrackState::Idle => counts.idle += 1,
                TrackState::Lost => {}
            }
        }
        counts
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            timestamp: self.last_timestamp.unwrap_or(0.0),
            counts: self.counts(),
            tracks: self.tracks.values().map(Track::summary).collect(),
        }
    }

    /// Drop every track; ids keep increasing.
    pub fn clear(&mut self) {
        self.tracks.clear();
    }
}

fn notice(object_id: ObjectId, kind: TrackEventKind, timestamp: f64) -> TrackEvent {
    TrackEvent {
        object_id,
        kind,
        timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BBox, ObservationOrigin, Point3};

    fn make_observation(x: f64, y: f64) -> FusedObservation {
        FusedObservation {
            candidate_id: 0,
            position: Some(Point3::new(x, y, 0.0)),
            bbox: Some(BBox::new(100.0, 100.0, 140.0, 200.0)),
            class: "person".into(),
            confidence: 0.9,
            detector_confidence: 0.9,
            projection_validity: 1.0,
            source_timestamp: 0.0,
            origin: ObservationOrigin::Fused,
            body_angle_deg: None,
        }
    }

    fn make_video_only() -> FusedObservation {
        FusedObservation {
            position: None,
            projection_validity: 0.5,
            origin: ObservationOrigin::VideoOnly,
            ..make_observation(0.0, 0.0)
        }
    }

    fn kinds(events: &[TrackEvent]) -> Vec<TrackEventKind> {
        events.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_spawn_then_activate() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        let events = tracker.update(&[make_observation(0.0, 0.0)], 0.0);
        assert_eq!(kinds(&events), vec![TrackEventKind::Created]);
        let id = events[0].object_id;
        assert_eq!(tracker.get(id).unwrap().state, TrackState::New);

        assert!(tracker.update(&[make_observation(0.1, 0.0)], 0.1).is_empty());
        let events = tracker.update(&[make_observation(0.2, 0.0)], 0.2);
        assert_eq!(kinds(&events), vec![TrackEventKind::Activated]);
        assert_eq!(events[0].object_id, id);
        assert_eq!(tracker.counts().active, 1);
    }

    #[test]
    fn test_missed_cycle_resets_activation() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        tracker.update(&[make_observation(0.0, 0.0)], 0.0);
        tracker.update(&[make_observation(0.1, 0.0)], 0.1);
        tracker.update(&[], 0.2);
        assert!(tracker.update(&[make_observation(0.2, 0.0)], 0.3).is_empty());
        let events = tracker.update(&[make_observation(0.3, 0.0)], 0.4);
        assert_eq!(kinds(&events), vec![TrackEventKind::Activated]);
    }

    #[test]
    fn test_ids_stable_and_never_reused() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        tracker.update(&[make_observation(0.0, 0.0), make_observation(5.0, 0.0)], 0.0);
        let ids: Vec<ObjectId> = tracker.tracks().map(|t| t.object_id).collect();
        assert_eq!(ids, vec![1, 2]);

        // swapped input order, positions still decide
        tracker.update(&[make_observation(5.1, 0.0), make_observation(0.1, 0.0)], 0.1);
        assert!((tracker.get(1).unwrap().position.unwrap().x - 0.1).abs() < 1e-9);
        assert!((tracker.get(2).unwrap().position.unwrap().x - 5.1).abs() < 1e-9);

        // both lost, a newcomer gets a fresh id
        let events = tracker.update(&[make_observation(20.0, 0.0)], 10.0);
        let created: Vec<ObjectId> = events
            .iter()
            .filter(|e| e.kind == TrackEventKind::Created)
            .map(|e| e.object_id)
            .collect();
        assert_eq!(created, vec![3]);
        assert_eq!(tracker.counts().lost_total, 2);
    }

    #[test]
    fn test_gate_scales_with_elapsed_time() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        tracker.update(&[make_observation(0.0, 0.0)], 0.0);
        // 0.5 + 5 × 0.1 = 1.0 m allowed
        let events = tracker.update(&[make_observation(1.5, 0.0)], 0.1);
        assert_eq!(kinds(&events), vec![TrackEventKind::Created]);
        // after 1 s the same jump fits
        let mut tracker = Tracker::new(TrackerConfig::default());
        tracker.update(&[make_observation(0.0, 0.0)], 0.0);
        assert!(tracker.update(&[make_observation(1.5, 0.0)], 1.0).is_empty());
    }

    #[test]
    fn test_closest_pair_wins() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        tracker.update(&[make_observation(0.0, 0.0), make_observation(0.8, 0.0)], 0.0);
        tracker.update(&[make_observation(0.75, 0.0), make_observation(0.05, 0.0)], 0.1);
        assert!((tracker.get(1).unwrap().position.unwrap().x - 0.05).abs() < 1e-9);
        assert!((tracker.get(2).unwrap().position.unwrap().x - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_video_only_keeps_presence_but_not_liveness() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        tracker.update(&[make_observation(0.0, 0.0)], 0.0);

        let mut t = 0.5;
        let mut lost_at = None;
        while t <= 7.0 {
            let events = tracker.update(&[make_video_only()], t);
            if events.iter().any(|e| e.kind == TrackEventKind::Lost) {
                lost_at = Some(t);
                // the orphaned 2D detection starts a new track right away
                assert!(events
                    .iter()
                    .any(|e| e.kind == TrackEventKind::Created && e.object_id == 2));
                break;
            }
            t += 0.5;
        }
        assert_eq!(lost_at, Some(5.5));
        assert!(tracker.get(1).is_none());
        assert!(tracker.get(2).is_some());
    }

    #[test]
    fn test_idle_after_stationary_period() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        let mut idle_events = Vec::new();
        for i in 0..=120 {
            let t = i as f64 * 0.1;
            let jitter = if i % 2 == 0 { 0.02 } else { -0.02 };
            for e in tracker.update(&[make_observation(jitter, 0.0)], t) {
                if e.kind == TrackEventKind::BecameIdle {
                    idle_events.push(e.timestamp);
                }
            }
        }
        assert_eq!(idle_events.len(), 1);
        assert!((idle_events[0] - 10.0).abs() < 0.11);
        assert_eq!(tracker.counts().idle, 1);

        let events = tracker.update(&[make_observation(0.5, 0.0)], 12.1);
        assert_eq!(kinds(&events), vec![TrackEventKind::Resumed]);
    }

    #[test]
    fn test_snapshot() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        tracker.update(&[make_observation(0.0, 0.0), make_video_only()], 1.0);
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.timestamp, 1.0);
        assert_eq!(snapshot.counts.new, 2);
        assert_eq!(snapshot.tracks.len(), 2);
        assert!(snapshot.tracks[1].position.is_none());
    }
}
