//! RuleEngine - per-track rule evaluation with hysteresis and cool-down.

use std::collections::{HashMap, VecDeque};

use contracts::{
    epoch_to_utc, DistanceDetails, Event, EventKind, EventType, FallDetails, IdleDetails,
    NewObjectDetails, ObjectId, RulesConfig, SpeedDetails, SystemBlueprint, TrackState,
    TrackerConfig, Zone, ZoneTransition,
};
use tracing::{debug, info, instrument};
use tracking::Track;

use crate::geometry::zone_contains;
use crate::zones::ZoneSet;

const ZONE_CERTAINTY: f64 = 0.95;
const IDLE_CERTAINTY: f64 = 0.9;
const FALL_CERTAINTY: f64 = 0.85;
const DISTANCE_CERTAINTY: f64 = 0.95;
const SPEED_CERTAINTY: f64 = 0.9;
const NEW_OBJECT_CERTAINTY: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CooldownKey {
    object_id: ObjectId,
    event_type: EventType,
    zone_id: Option<String>,
}

#[derive(Debug, Default)]
struct ZoneMembership {
    /// Confirmed membership
    inside: bool,
    /// Consecutive samples disagreeing with `inside`
    streak: u32,
    /// Recent raw samples, newest last
    recent: VecDeque<bool>,
}

impl ZoneMembership {
    /// Feed one raw sample; returns `Some(strength)` when membership flips.
    fn observe(&mut self, sample: bool, confirmations: u32) -> Option<f64> {
        let window = (confirmations as usize * 2).max(1);
        self.recent.push_back(sample);
        while self.recent.len() > window {
            self.recent.pop_front();
        }

        if sample == self.inside {
            self.streak = 0;
            return None;
        }
        self.streak += 1;
        if self.streak < confirmations {
            return None;
        }
        self.inside = sample;
        self.streak = 0;
        let agreeing = self.recent.iter().filter(|s| **s == sample).count();
        Some(agreeing as f64 / self.recent.len() as f64)
    }
}

/// State change committed only once a candidate survives both gates.
#[derive(Debug, Clone, Copy)]
enum OnEmit {
    Nothing,
    DisarmSpeed,
    DisarmFall,
    ResetDistance(f64),
}

#[derive(Debug)]
struct ObjectRuleState {
    last_state: TrackState,
    announced: bool,
    zones: HashMap<String, ZoneMembership>,
    speed_armed: bool,
    fall_armed: bool,
    /// Cumulative distance at the last distance_change
    distance_baseline: Option<f64>,
    /// `last_seen` of the sample zones were last fed with
    last_sample_at: Option<f64>,
}

impl ObjectRuleState {
    fn new() -> Self {
        Self {
            last_state: TrackState::New,
            announced: false,
            zones: HashMap::new(),
            speed_armed: true,
            fall_armed: true,
            distance_baseline: None,
            last_sample_at: None,
        }
    }

    fn commit(&mut self, effect: OnEmit) {
        match effect {
            OnEmit::Nothing => {}
            OnEmit::DisarmSpeed => self.speed_armed = false,
            OnEmit::DisarmFall => self.fall_armed = false,
            OnEmit::ResetDistance(cumulative) => self.distance_baseline = Some(cumulative),
        }
    }
}

pub struct RuleEngine {
    camera_id: String,
    config: RulesConfig,
    idle_threshold_m: f64,
    idle_duration_sec: f64,
    objects: HashMap<ObjectId, ObjectRuleState>,
    last_emitted: HashMap<CooldownKey, f64>,
    suppressed: u64,
}

impl RuleEngine {
    /// `tracker` supplies the idle thresholds reported in idle metadata.
    pub fn new(camera_id: impl Into<String>, config: RulesConfig, tracker: &TrackerConfig) -> Self {
        Self {
            camera_id: camera_id.into(),
            config,
            idle_threshold_m: tracker.idle_threshold_m,
            idle_duration_sec: tracker.idle_duration_sec,
            objects: HashMap::new(),
            last_emitted: HashMap::new(),
            suppressed: 0,
        }
    }

    pub fn from_blueprint(blueprint: &SystemBlueprint) -> Self {
        Self::new(
            blueprint.system.camera_id.clone(),
            blueprint.rules.clone(),
            &blueprint.tracker,
        )
    }

    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    /// Evaluate every enabled rule for one track at cycle time `now`.
    #[instrument(
        name = "rule_engine_evaluate",
        skip(self, track, zones),
        fields(object_id = track.object_id, state = %track.state)
    )]
    pub fn evaluate(&mut self, track: &Track, zones: &ZoneSet, now: f64) -> Vec<Event> {
        let mut candidates: Vec<(EventKind, f64, OnEmit)> = Vec::new();
        let config = &self.config;
        let state = self
            .objects
            .entry(track.object_id)
            .or_insert_with(ObjectRuleState::new);
        // zones only count samples from a new match
        let fresh = state.last_sample_at.map_or(true, |t| track.last_seen > t);
        state.last_sample_at = Some(track.last_seen);

        if track.is_confirmed() {
            // new object
            if !state.announced {
                state.announced = true;
                if config.new_object.enabled {
                    candidates.push((
                        EventKind::NewObject(NewObjectDetails {
                            class: track.class.clone(),
                            has_position: track.position.is_some(),
                        }),
                        NEW_OBJECT_CERTAINTY,
                        OnEmit::Nothing,
                    ));
                }
            }

            // idle, once per episode
            if config.idle.enabled
                && track.state == TrackState::Idle
                && state.last_state != TrackState::Idle
            {
                candidates.push((
                    EventKind::Idle(IdleDetails {
                        idle_duration_sec: track.stationary_for(now),
                        idle_threshold_m: self.idle_threshold_m,
                        idle_threshold_sec: self.idle_duration_sec,
                    }),
                    IDLE_CERTAINTY,
                    OnEmit::Nothing,
                ));
            }

            if config.zone.enabled && fresh {
                for (kind, strength) in zone_transitions(state, track, zones, config.zone.confirmations) {
                    candidates.push((kind, ZONE_CERTAINTY * strength, OnEmit::Nothing));
                }
            }

            if track.position.is_some() {
                // speed, edge-triggered; the edge stays pending until emitted
                let speed = track.kinematics.speed;
                if speed <= config.speed.threshold_ms {
                    state.speed_armed = true;
                } else if state.speed_armed && config.speed.enabled {
                    candidates.push((
                        EventKind::SpeedAlert(SpeedDetails {
                            speed_ms: speed,
                            threshold_ms: config.speed.threshold_ms,
                            direction: track.kinematics.direction,
                        }),
                        SPEED_CERTAINTY,
                        OnEmit::DisarmSpeed,
                    ));
                }

                // distance since last emission
                if config.distance.enabled {
                    let baseline = *state.distance_baseline.get_or_insert(track.cumulative_distance);
                    let moved = track.cumulative_distance - baseline;
                    if moved > config.distance.threshold_m {
                        candidates.push((
                            EventKind::DistanceChange(DistanceDetails {
                                distance_m: moved,
                                threshold_m: config.distance.threshold_m,
                                cumulative_distance_m: track.cumulative_distance,
                            }),
                            DISTANCE_CERTAINTY,
                            OnEmit::ResetDistance(track.cumulative_distance),
                        ));
                    }
                }

                // fall, needs the pose signal
                if let Some(angle) = track.body_angle_deg {
                    let fall = &config.fall;
                    if angle >= fall.body_angle_deg {
                        state.fall_armed = true;
                    } else if state.fall_armed && fall.enabled {
                        let drop = track.height_drop(fall.vertical_axis, fall.window_sec, now);
                        if drop > fall.height_drop_m {
                            candidates.push((
                                EventKind::Fall(FallDetails {
                                    body_angle_deg: angle,
                                    height_drop_m: drop,
                                    window_sec: fall.window_sec,
                                }),
                                FALL_CERTAINTY,
                                OnEmit::DisarmFall,
                            ));
                        }
                    }
                }
            }
        }
        state.last_state = track.state;

        let base_confidence = track.detector_confidence * track.projection_validity;
        let mut events = Vec::with_capacity(candidates.len());
        for (kind, certainty, effect) in candidates {
            let confidence = (base_confidence * certainty).clamp(0.0, 1.0);
            if confidence < self.config.min_confidence {
                debug!(event_type = %kind.event_type(), confidence, "Event below min_confidence");
                continue;
            }
            if !self.pass_cooldown(track.object_id, &kind, now) {
                self.suppressed += 1;
                debug!(event_type = %kind.event_type(), "Event suppressed by cool-down");
                continue;
            }
            if let Some(state) = self.objects.get_mut(&track.object_id) {
                state.commit(effect);
            }
            let event = Event {
                timestamp: epoch_to_utc(now),
                camera_id: self.camera_id.clone(),
                object_id: track.object_id,
                confidence,
                position: track.position,
                kind,
            };
            info!(
                object_id = event.object_id,
                event_type = %event.event_type(),
                confidence = event.confidence,
                "Event emitted"
            );
            observability::record_event_emitted(event.event_type());
            events.push(event);
        }
        events
    }

    fn pass_cooldown(&mut self, object_id: ObjectId, kind: &EventKind, now: f64) -> bool {
        let key = CooldownKey {
            object_id,
            event_type: kind.event_type(),
            zone_id: kind.zone_id().map(str::to_owned),
        };
        if let Some(last) = self.last_emitted.get(&key) {
            if now - last < self.config.cooldown_sec {
                return false;
            }
        }
        self.last_emitted.insert(key, now);
        true
    }

    /// Drop all rule state of a LOST object
    pub fn forget(&mut self, object_id: ObjectId) {
        self.objects.remove(&object_id);
        self.last_emitted.retain(|k, _| k.object_id != object_id);
    }

    /// Objects with rule state
    pub fn tracked_objects(&self) -> usize {
        self.objects.len()
    }

    /// Emissions dropped by the cool-down since start
    pub fn suppressed_count(&self) -> u64 {
        self.suppressed
    }

    pub fn reset(&mut self) {
        self.objects.clear();
        self.last_emitted.clear();
        self.suppressed = 0;
    }
}

fn zone_transitions(
    state: &mut ObjectRuleState,
    track: &Track,
    zones: &ZoneSet,
    default_confirmations: u32,
) -> Vec<(EventKind, f64)> {
    // zones removed from the set drop their membership silently
    state.zones.retain(|zone_id, _| zones.contains(zone_id));

    let mut out = Vec::new();
    for zone in zones.iter() {
        let Some(sample) = zone_contains(&zone.geometry, track.position, track.bbox) else {
            continue;
        };
        let confirmations = zone
            .rules
            .confirmations
            .unwrap_or(default_confirmations)
            .max(1);
        let membership = state.zones.entry(zone.zone_id.clone()).or_default();
        let Some(strength) = membership.observe(sample, confirmations) else {
            continue;
        };
        let transition = transition_details(zone, confirmations);
        if membership.inside && zone.rules.entry {
            out.push((EventKind::ZoneEntry(transition), strength));
        } else if !membership.inside && zone.rules.exit {
            out.push((EventKind::ZoneExit(transition), strength));
        }
    }
    out
}

fn transition_details(zone: &Zone, confirmations: u32) -> ZoneTransition {
    ZoneTransition {
        zone_id: zone.zone_id.clone(),
        zone_name: zone.name.clone(),
        zone_type: zone.zone_type,
        priority: zone.priority,
        confirmations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        BBox, FusedObservation, ObservationOrigin, Point3, ReferencePlane, ZoneGeometry,
        ZoneRules, ZoneType,
    };
    use tracking::Tracker;

    fn make_zone() -> Zone {
        Zone {
            zone_id: "dock".into(),
            name: "Loading Dock".into(),
            geometry: ZoneGeometry::FloorPolygon {
                plane: ReferencePlane::Xy,
                points: vec![[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]],
            },
            rules: ZoneRules::default(),
            enabled: true,
            zone_type: ZoneType::Restricted,
            priority: 8,
        }
    }

    fn make_observation(x: f64, y: f64, z: f64) -> FusedObservation {
        FusedObservation {
            candidate_id: 0,
            position: Some(Point3::new(x, y, z)),
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

    struct Harness {
        tracker: Tracker,
        rules: RuleEngine,
        zones: ZoneSet,
    }

    impl Harness {
        fn new(config: RulesConfig) -> Self {
            let tracker_config = TrackerConfig {
                max_speed_ms: 50.0,
                ..Default::default()
            };
            Self {
                rules: RuleEngine::new("cam-01", config, &tracker_config),
                tracker: Tracker::new(tracker_config),
                zones: ZoneSet::new(vec![make_zone()]),
            }
        }

        fn step(&mut self, obs: FusedObservation, t: f64) -> Vec<Event> {
            self.tracker.update(&[obs], t);
            let mut out = Vec::new();
            for track in self.tracker.tracks() {
                out.extend(self.rules.evaluate(track, &self.zones, t));
            }
            out
        }

        /// A cycle with no observations
        fn miss(&mut self, t: f64) -> Vec<Event> {
            self.tracker.update(&[], t);
            self.reevaluate(t)
        }

        /// Evaluate again without feeding the tracker
        fn reevaluate(&mut self, t: f64) -> Vec<Event> {
            let mut out = Vec::new();
            for track in self.tracker.tracks() {
                out.extend(self.rules.evaluate(track, &self.zones, t));
            }
            out
        }
    }

    fn types(events: &[Event]) -> Vec<EventType> {
        events.iter().map(|e| e.event_type()).collect()
    }

    #[test]
    fn test_new_object_once_on_activation() {
        let mut h = Harness::new(RulesConfig::default());
        let mut all = Vec::new();
        for i in 0..10 {
            all.extend(h.step(make_observation(5.0, 5.0, 0.0), i as f64 * 0.1));
        }
        assert_eq!(types(&all), vec![EventType::NewObject]);
        assert_eq!(all[0].camera_id, "cam-01");
        assert!((all[0].confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_zone_entry_needs_confirmation() {
        let mut config = RulesConfig::default();
        config.speed.enabled = false;
        config.distance.enabled = false;
        let mut h = Harness::new(config);
        // activate outside the zone
        for i in 0..3 {
            h.step(make_observation(5.0, 1.0, 0.0), i as f64 * 0.1);
        }
        // single outlier inside, then back out
        assert!(h.step(make_observation(1.0, 1.0, 0.0), 0.3).is_empty());
        assert!(h.step(make_observation(5.0, 1.0, 0.0), 0.4).is_empty());
        assert!(h.step(make_observation(5.0, 1.0, 0.0), 0.5).is_empty());

        // real entry
        assert!(h.step(make_observation(1.5, 1.0, 0.0), 0.6).is_empty());
        let events = h.step(make_observation(1.4, 1.0, 0.0), 0.7);
        assert_eq!(types(&events), vec![EventType::ZoneEntry]);
        match &events[0].kind {
            EventKind::ZoneEntry(z) => {
                assert_eq!(z.zone_id, "dock");
                assert_eq!(z.priority, 8);
                assert_eq!(z.confirmations, 2);
            }
            other => panic!("unexpected {:?}", other),
        }
        // last 4 raw samples: out, out, in, in
        assert!((events[0].confidence - 0.9 * 0.95 * 0.5).abs() < 1e-9);

        // exit
        h.step(make_observation(5.0, 1.0, 0.0), 2.0);
        let events = h.step(make_observation(5.0, 1.0, 0.0), 2.1);
        assert_eq!(types(&events), vec![EventType::ZoneExit]);
    }

    #[test]
    fn test_removed_zone_drops_membership_without_exit() {
        let mut h = Harness::new(RulesConfig::default());
        for i in 0..5 {
            h.step(make_observation(1.0, 1.0, 0.0), i as f64 * 0.1);
        }
        h.zones = ZoneSet::new(Vec::new());
        for i in 5..10 {
            assert!(h.step(make_observation(5.0, 1.0, 0.0), i as f64 * 0.5)
                .iter()
                .all(|e| e.event_type() != EventType::ZoneExit));
        }
    }

    #[test]
    fn test_speed_alert_edge_triggered() {
        let mut config = RulesConfig::default();
        config.distance.enabled = false;
        let mut h = Harness::new(config);
        let mut x = 10.0;
        let mut t = 0.0;
        let mut alerts = Vec::new();
        // (speed m/s, seconds)
        for (speed, duration) in [(1.0, 2.0), (2.5, 2.0), (1.5, 2.0), (2.2, 2.0)] {
            let steps = (duration / 0.1) as usize;
            for _ in 0..steps {
                t += 0.1;
                x += speed * 0.1;
                for e in h.step(make_observation(x, 10.0, 0.0), t) {
                    if e.event_type() == EventType::SpeedAlert {
                        alerts.push(t);
                    }
                }
            }
        }
        assert_eq!(alerts.len(), 2);
        assert!(alerts[0] > 2.0 && alerts[0] < 3.1);
        assert!(alerts[1] > 6.0 && alerts[1] < 7.1);
    }

    #[test]
    fn test_distance_change_resets_baseline() {
        let mut h = Harness::new(RulesConfig::default());
        let mut events = Vec::new();
        for i in 0..=20 {
            // 0.15 m per step
            events.extend(h.step(make_observation(10.0 + i as f64 * 0.15, 10.0, 0.0), i as f64 * 0.3));
        }
        let distance: Vec<&Event> = events
            .iter()
            .filter(|e| e.event_type() == EventType::DistanceChange)
            .collect();
        // baseline taken at activation (step 2), then one event every 4 steps (0.6 m)
        assert_eq!(distance.len(), 4);
        match &distance[0].kind {
            EventKind::DistanceChange(d) => assert!(d.distance_m > 0.5 && d.distance_m < 0.7),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_cooldown_suppresses_duplicates() {
        let mut config = RulesConfig::default();
        config.cooldown_sec = 5.0;
        config.distance.threshold_m = 0.05;
        let mut h = Harness::new(config);
        let mut count = 0;
        for i in 0..20 {
            count += h
                .step(make_observation(10.0 + i as f64 * 0.1, 10.0, 0.0), i as f64 * 0.2)
                .iter()
                .filter(|e| e.event_type() == EventType::DistanceChange)
                .count();
        }
        // 3.8 s of travel, cool-down 5 s
        assert_eq!(count, 1);
        assert!(h.rules.suppressed_count() > 0);
    }

    #[test]
    fn test_outlier_then_missed_cycle_does_not_enter_zone() {
        let mut config = RulesConfig::default();
        config.speed.enabled = false;
        config.distance.enabled = false;
        let mut h = Harness::new(config);
        for i in 0..3 {
            h.step(make_observation(2.5, 1.0, 0.0), i as f64 * 0.1);
        }
        // one sample inside, then nothing new
        assert!(h.step(make_observation(1.9, 1.0, 0.0), 0.3).is_empty());
        assert!(h.miss(0.4).is_empty());
        assert!(h.miss(0.5).is_empty());
        assert!(h.step(make_observation(2.5, 1.0, 0.0), 0.6).is_empty());
        assert!(h.step(make_observation(2.5, 1.0, 0.0), 0.7).is_empty());

        // two real samples inside still confirm
        assert!(h.step(make_observation(1.9, 1.0, 0.0), 0.8).is_empty());
        assert_eq!(
            types(&h.step(make_observation(1.8, 1.0, 0.0), 0.9)),
            vec![EventType::ZoneEntry]
        );
    }

    #[test]
    fn test_reevaluation_at_same_time_emits_nothing() {
        let mut h = Harness::new(RulesConfig::default());
        let mut emitted = 0;
        let mut x = 10.0;
        for i in 0..40 {
            let t = i as f64 * 0.1;
            // jump once, otherwise walk at 1 m/s
            x += if i == 20 { 3.0 } else { 0.1 };
            emitted += h.step(make_observation(x, 1.0, 0.0), t).len();
            assert!(h.reevaluate(t).is_empty(), "duplicate events at t={t}");
        }
        assert!(emitted >= 3);
    }

    #[test]
    fn test_distance_reports_travel_since_last_emission() {
        let mut h = Harness::new(RulesConfig::default());
        let mut emitted: Vec<(f64, DistanceDetails)> = Vec::new();
        for i in 0..=50 {
            // 1 m/s, faster than threshold_m per cooldown_sec
            let t = i as f64 * 0.1;
            for e in h.step(make_observation(10.0 + i as f64 * 0.1, 10.0, 0.0), t) {
                if let EventKind::DistanceChange(d) = e.kind {
                    emitted.push((t, d));
                }
            }
        }
        assert!(emitted.len() >= 3);
        for pair in emitted.windows(2) {
            let (t0, prev) = &pair[0];
            let (t1, next) = &pair[1];
            assert!(t1 - t0 >= 1.0 - 1e-9);
            let travelled = next.cumulative_distance_m - prev.cumulative_distance_m;
            assert!((next.distance_m - travelled).abs() < 1e-9);
            assert!(next.distance_m > 0.9);
        }
    }

    #[test]
    fn test_speed_edge_survives_cooldown() {
        let mut config = RulesConfig::default();
        config.cooldown_sec = 3.0;
        config.distance.enabled = false;
        let mut h = Harness::new(config);
        let mut x = 10.0;
        let mut t = 0.0;
        let mut alerts = Vec::new();
        // second burst starts inside the cool-down of the first
        for (speed, duration) in [(1.0, 2.0), (2.5, 1.5), (1.0, 1.0), (2.5, 3.0)] {
            let steps = (duration / 0.1_f64).round() as usize;
            for _ in 0..steps {
                t += 0.1;
                x += speed * 0.1;
                for e in h.step(make_observation(x, 10.0, 0.0), t) {
                    if e.event_type() == EventType::SpeedAlert {
                        alerts.push(t);
                    }
                }
            }
        }
        assert_eq!(alerts.len(), 2);
        assert!(alerts[1] - alerts[0] >= 3.0 - 1e-9);
        assert!(alerts[1] < 7.5);
    }

    #[test]
    fn test_fall_requires_pose_and_drop() {
        let mut h = Harness::new(RulesConfig::default());
        let upright = |z: f64| FusedObservation {
            body_angle_deg: Some(80.0),
            ..make_observation(10.0, 10.0, z)
        };
        let lying = |z: f64| FusedObservation {
            body_angle_deg: Some(10.0),
            ..make_observation(10.0, 10.0, z)
        };
        for i in 0..5 {
            h.step(upright(1.0), i as f64 * 0.1);
        }
        let events = h.step(lying(0.3), 0.5);
        assert!(types(&events).contains(&EventType::Fall));
        // stays down: no repeat
        assert!(!types(&h.step(lying(0.3), 2.0)).contains(&EventType::Fall));

        // no pose signal: no fall even with a drop
        let mut h = Harness::new(RulesConfig::default());
        for i in 0..5 {
            h.step(make_observation(10.0, 10.0, 1.0), i as f64 * 0.1);
        }
        assert!(!types(&h.step(make_observation(10.0, 10.0, 0.3), 0.5)).contains(&EventType::Fall));
    }

    #[test]
    fn test_min_confidence_filter() {
        let mut config = RulesConfig::default();
        config.min_confidence = 0.95;
        let mut h = Harness::new(config);
        let mut all = Vec::new();
        for i in 0..5 {
            all.extend(h.step(make_observation(5.0, 5.0, 0.0), i as f64 * 0.1));
        }
        assert!(all.is_empty());
    }

    #[test]
    fn test_forget_clears_state() {
        let mut h = Harness::new(RulesConfig::default());
        for i in 0..3 {
            h.step(make_observation(5.0, 5.0, 0.0), i as f64 * 0.1);
        }
        assert_eq!(h.rules.tracked_objects(), 1);
        h.rules.forget(1);
        assert_eq!(h.rules.tracked_objects(), 0);
    }

    #[test]
    fn test_event_wire_shape() {
        let mut h = Harness::new(RulesConfig::default());
        let mut all = Vec::new();
        for i in 0..3 {
            all.extend(h.step(make_observation(5.0, 5.0, 0.0), 1_714_564_800.0 + i as f64 * 0.25));
        }
        let json: serde_json::Value = serde_json::to_value(&all[0]).unwrap();
        assert_eq!(json["type"], "new_object");
        assert_eq!(json["timestamp"], "2024-05-01T12:00:00.500Z");
        assert_eq!(json["metadata"]["class"], "person");
        assert_eq!(json["position"]["x"], 5.0);
    }
}
