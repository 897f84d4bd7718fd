//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试 (事件 JSON 形状)
//! - 端到端场景：同步 -> 融合 -> 跟踪 -> 规则 -> 分发
//! - 配置驱动的完整运行 (文件 sink)

#[cfg(test)]
mod contract_tests {
    use contracts::{epoch_to_utc, Event, EventKind, NewObjectDetails, Point3};

    #[test]
    fn test_event_wire_shape() {
        let event = Event {
            timestamp: epoch_to_utc(1_700_000_000.25),
            camera_id: "cam-01".into(),
            object_id: 7,
            confidence: 0.8,
            position: Some(Point3::new(1.0, 2.0, 3.0)),
            kind: EventKind::NewObject(NewObjectDetails {
                class: "person".into(),
                has_position: true,
            }),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "new_object");
        assert_eq!(json["camera_id"], "cam-01");
        assert_eq!(json["object_id"], 7);
        assert_eq!(json["position"]["z"], 3.0);
        assert_eq!(json["metadata"]["class"], "person");
        assert!(json["timestamp"].as_str().unwrap().starts_with("2023-11-14T22:13:20.25"));
    }
}

#[cfg(test)]
mod e2e_tests {
    use contracts::{Event, EventType, Point3, SourceKind, SystemBlueprint, Zone, ZoneGeometry};
    use dispatcher::{Dispatcher, MemorySink, SinkHandle};
    use ingestion::MockScene;
    use pipeline::{Consumer, PipelineBuilder, RunSummary};
    use rules::ZoneHandle;
    use sync_engine::SharedSynchronizer;
    use tokio::sync::watch;

    const ORIGIN: f64 = 1_700_000_000.0;
    const VIDEO: &str = "video-01";
    const DEPTH: &str = "depth-01";

    /// Drives a consumer by hand, one capture at a time.
    struct Harness {
        consumer: Consumer,
        synchronizer: SharedSynchronizer,
        zones: ZoneHandle,
        sink: MemorySink,
        seq: u64,
    }

    impl Harness {
        async fn new(blueprint: SystemBlueprint) -> Self {
            let sink = MemorySink::new("memory");
            let dispatcher = Dispatcher::with_handles(vec![SinkHandle::spawn(sink.clone(), 1024)]);
            let pipeline = PipelineBuilder::new(blueprint)
                .with_dispatcher(dispatcher)
                .build()
                .await
                .unwrap();
            let synchronizer = pipeline.synchronizer();
            let zones = pipeline.zones();
            let (consumer, _health) = pipeline.into_consumer();
            Self {
                consumer,
                synchronizer,
                zones,
                sink,
                seq: 0,
            }
        }

        /// One 2D capture at `t`, plus a 3D capture at `depth_at` if given.
        fn capture(&mut self, scene: &MockScene, t: f64, depth_at: Option<f64>) {
            let seq = self.seq;
            self.seq += 1;
            self.synchronizer
                .ingest(scene.frame(SourceKind::Video, VIDEO, ORIGIN + t, seq))
                .unwrap();
            if let Some(td) = depth_at {
                self.synchronizer
                    .ingest(scene.frame(SourceKind::Depth, DEPTH, ORIGIN + td, seq))
                    .unwrap();
            }
            self.consumer.drain();
        }

        /// Synchronized 2D + 3D capture
        fn pair(&mut self, scene: &MockScene, t: f64) {
            self.capture(scene, t, Some(t));
        }

        /// Drain, close the sinks and hand back everything they received.
        async fn finish(self) -> (RunSummary, Vec<Event>) {
            let (_stop, stop_rx) = watch::channel(true);
            let summary = self.consumer.run(stop_rx).await;
            (summary, self.sink.events())
        }
    }

    /// A person standing still at `p`
    fn standing_at(p: Point3) -> MockScene {
        MockScene {
            start: p,
            velocity: Point3::new(0.0, 0.0, 0.0),
            ..MockScene::walker(ORIGIN)
        }
    }

    fn make_blueprint(scene: &MockScene) -> SystemBlueprint {
        SystemBlueprint {
            calibration: Some(scene.calibration()),
            ..Default::default()
        }
    }

    fn of_type(events: &[Event], event_type: EventType) -> Vec<&Event> {
        events.iter().filter(|e| e.event_type() == event_type).collect()
    }

    /// Capture-clock seconds since `ORIGIN`
    fn at(event: &Event) -> f64 {
        event.timestamp.timestamp_micros() as f64 / 1e6 - ORIGIN
    }

    fn dock_zone() -> Zone {
        Zone {
            zone_id: "dock".into(),
            name: "Loading dock".into(),
            geometry: ZoneGeometry::Bounds {
                min: [0.0, -5.0, 0.0],
                max: [5.0, 5.0, 20.0],
            },
            rules: Default::default(),
            enabled: true,
            zone_type: Default::default(),
            priority: 5,
        }
    }

    #[tokio::test]
    async fn test_e2e_pair_creates_and_activates_track() {
        let scene = standing_at(Point3::new(-1.5, 1.0, 4.0));
        let mut harness = Harness::new(make_blueprint(&scene)).await;

        // 2D at t=0, 3D 50 ms later
        harness.capture(&scene, 0.0, Some(0.05));
        {
            let tracks: Vec<_> = harness.consumer.tracker().tracks().collect();
            assert_eq!(tracks.len(), 1);
            assert_eq!(tracks[0].state, contracts::TrackState::New);
            let p = tracks[0].position.unwrap();
            assert!((p.x + 1.5).abs() < 0.05);
            assert!((p.y - 1.0).abs() < 0.05);
            assert!((p.z - 4.0).abs() < 0.05);
        }

        harness.capture(&scene, 0.1, Some(0.15));
        harness.capture(&scene, 0.2, Some(0.25));
        let object_id = {
            let track = harness.consumer.tracker().tracks().next().unwrap();
            assert_eq!(track.state, contracts::TrackState::Active);
            track.object_id
        };

        let (summary, events) = harness.finish().await;
        assert_eq!(summary.metrics.pairs, 3);
        let announced = of_type(&events, EventType::NewObject);
        assert_eq!(announced.len(), 1);
        assert_eq!(announced[0].object_id, object_id);
        assert!(announced[0].position.is_some());
        assert_eq!(announced[0].camera_id, "cam-01");
    }

    #[tokio::test]
    async fn test_e2e_stationary_person_goes_idle_once() {
        let scene = standing_at(Point3::new(0.0, 1.0, 4.0));
        let mut harness = Harness::new(make_blueprint(&scene)).await;

        for step in 0..=24 {
            harness.pair(&scene, step as f64 * 0.5);
        }

        let (summary, events) = harness.finish().await;
        let idle = of_type(&events, EventType::Idle);
        assert_eq!(idle.len(), 1);
        assert!(at(idle[0]) >= 10.0 - 1e-3 && at(idle[0]) <= 10.5 + 1e-3);
        assert!(of_type(&events, EventType::DistanceChange).is_empty());
        assert_eq!(summary.tracks.counts.idle, 1);
    }

    #[tokio::test]
    async fn test_e2e_speed_alert_rearms_below_threshold() {
        // far away with a wide lens so the whole walk stays in view
        let base = MockScene {
            intrinsics: contracts::Intrinsics {
                fx: 250.0,
                fy: 250.0,
                cx: 320.0,
                cy: 240.0,
            },
            ..standing_at(Point3::new(-8.0, 1.0, 8.0))
        };
        let mut harness = Harness::new(make_blueprint(&base)).await;

        let dt = 0.1;
        let segments = [(1.0, 12), (2.5, 15), (1.5, 15), (2.2, 15)];
        let mut t = 0.0;
        let mut x = -8.0;
        harness.pair(&base, t);
        for (speed, steps) in segments {
            for _ in 0..steps {
                t += dt;
                x += speed * dt;
                let scene = MockScene {
                    start: Point3::new(x, 1.0, 8.0),
                    ..base.clone()
                };
                harness.pair(&scene, t);
            }
        }

        let (_, events) = harness.finish().await;
        let alerts = of_type(&events, EventType::SpeedAlert);
        assert_eq!(alerts.len(), 2);
        assert!(at(alerts[0]) > 1.2 && at(alerts[0]) < 2.8);
        assert!(at(alerts[1]) > 4.2 && at(alerts[1]) < 5.8);
    }

    #[tokio::test]
    async fn test_e2e_depth_outage_loses_track_and_respawns_2d() {
        let scene = standing_at(Point3::new(0.5, 1.0, 4.0));
        let mut harness = Harness::new(make_blueprint(&scene)).await;

        let mut t = 0.0;
        for _ in 0..=10 {
            harness.pair(&scene, t);
            t += 0.1;
        }
        // 3D stops, 2D keeps coming for 6 s
        for _ in 0..60 {
            harness.capture(&scene, t, None);
            t += 0.1;
        }

        let (summary, events) = harness.finish().await;
        assert_eq!(summary.tracks.counts.lost_total, 1);
        assert!(summary.metrics.video_only_frames > 0);
        assert!(summary.health.degraded);

        let announced = of_type(&events, EventType::NewObject);
        assert_eq!(announced.len(), 2);
        assert_ne!(announced[0].object_id, announced[1].object_id);
        assert!(announced[0].position.is_some());
        assert!(announced[1].position.is_none());
    }

    #[tokio::test]
    async fn test_e2e_transient_zone_crossing_is_ignored() {
        let outside = standing_at(Point3::new(-1.0, 1.0, 4.0));
        let inside = standing_at(Point3::new(0.5, 1.0, 4.0));
        let blueprint = SystemBlueprint {
            zones: vec![dock_zone()],
            ..make_blueprint(&outside)
        };
        let mut harness = Harness::new(blueprint).await;

        // one frame across the boundary, then a real crossing
        let mut plan = vec![&outside; 3];
        plan.push(&inside);
        plan.extend([&outside; 3]);
        let crossed_at = plan.len() as f64 * 0.5;
        plan.extend([&inside; 4]);
        for (i, scene) in plan.into_iter().enumerate() {
            harness.pair(scene, i as f64 * 0.5);
        }

        let (_, events) = harness.finish().await;
        assert!(of_type(&events, EventType::ZoneExit).is_empty());
        let entries = of_type(&events, EventType::ZoneEntry);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind.zone_id(), Some("dock"));
        assert!(at(entries[0]) >= crossed_at - 1e-3);
    }

    #[tokio::test]
    async fn test_e2e_zone_hot_reload() {
        let scene = standing_at(Point3::new(1.0, 1.0, 4.0));
        let mut harness = Harness::new(make_blueprint(&scene)).await;

        let mut t = 0.0;
        for _ in 0..3 {
            harness.pair(&scene, t);
            t += 0.2;
        }
        harness.zones.update(vec![dock_zone()]);
        for _ in 0..3 {
            harness.pair(&scene, t);
            t += 0.2;
        }

        let (_, events) = harness.finish().await;
        let entries = of_type(&events, EventType::ZoneEntry);
        assert_eq!(entries.len(), 1);
        assert!(at(entries[0]) > 0.5);
    }
}

#[cfg(test)]
mod config_e2e_tests {
    use std::io::BufRead;

    use contracts::SourceKind;
    use ingestion::MockScene;
    use pipeline::PipelineBuilder;

    const ORIGIN: f64 = 1_700_000_000.0;

    fn make_config(events_path: &str) -> String {
        format!(
            r#"
[system]
camera_id = "lobby"
video_source_id = "cam-2d"
depth_source_id = "cam-3d"

[calibration]
intrinsics = {{ fx = 500.0, fy = 500.0, cx = 320.0, cy = 240.0 }}

[[zones]]
zone_id = "broken"
name = "Broken"
geometry = {{ kind = "image_polygon", points = [[0.0, 0.0]] }}

[[sinks]]
name = "events"
sink_type = "file"
params = {{ path = "{events_path}", append = "false" }}
"#
        )
    }

    #[test]
    fn test_sample_config_loads_clean() {
        let report = config_loader::ConfigLoader::load_report_from_str(
            include_str!("../../../configs/walker.toml"),
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
        assert_eq!(report.blueprint.enabled_zones().count(), 2);
        assert_eq!(report.blueprint.sinks.len(), 3);
        assert!(report.blueprint.calibration.is_some());
    }

    #[tokio::test]
    async fn test_e2e_config_to_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let events_path = dir.path().join("events.jsonl");
        let report = config_loader::ConfigLoader::load_report_from_str(
            &make_config(&events_path.display().to_string()),
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();
        assert!(report.warnings.iter().any(|w| w.field.contains("zones")));
        assert_eq!(report.blueprint.enabled_zones().count(), 0);

        let handle = PipelineBuilder::new(report.blueprint)
            .build()
            .await
            .unwrap()
            .spawn();

        let scene = MockScene::walker(ORIGIN);
        let synchronizer = handle.synchronizer();
        for seq in 0..10u64 {
            let t = ORIGIN + seq as f64 * 0.1;
            synchronizer
                .ingest(scene.frame(SourceKind::Video, "cam-2d", t, seq))
                .unwrap();
            synchronizer
                .ingest(scene.frame(SourceKind::Depth, "cam-3d", t, seq))
                .unwrap();
        }
        // frames from an unregistered source are refused
        assert!(synchronizer
            .ingest(scene.frame(SourceKind::Video, "other", ORIGIN, 0))
            .is_err());

        let summary = handle.shutdown().await.unwrap();
        assert_eq!(summary.health.sinks.len(), 1);
        assert_eq!(summary.health.sinks[0].name, "events");

        let file = std::fs::File::open(&events_path).unwrap();
        let lines: Vec<serde_json::Value> = std::io::BufReader::new(file)
            .lines()
            .map(|line| serde_json::from_str(&line.unwrap()).unwrap())
            .collect();
        let announced: Vec<_> = lines.iter().filter(|v| v["type"] == "new_object").collect();
        assert_eq!(announced.len(), 1);
        assert_eq!(announced[0]["camera_id"], "lobby");
        assert!(announced[0]["position"].is_object());
        assert_eq!(announced[0]["metadata"]["class"], "person");
    }
}
