//! Mock 数据源
//!
//! 无真实采集设备时使用：一个在深度相机前来回走动的人，
//! 2D 源输出检测框，3D 源输出深度图与人体位置。

use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use contracts::{
    wall_clock_secs, BBox, CalibrationConfig, DepthGrid, DepthPayload, Detection2D, Detection3D,
    FrameCallback, FrameSource, Intrinsics, Point3, SkeletonSignal, SourceFrame, SourceKind,
    VideoPayload,
};
use parking_lot::Mutex;
use rand::Rng;
use tracing::{debug, error, trace};

/// 合成场景
///
/// 世界坐标即深度相机坐标 (X 向右, Y 向下, Z 向前)，
/// 2D 相机与深度相机共用内参，所以标定是单位变换。
#[derive(Debug, Clone)]
pub struct MockScene {
    /// t = 0 对应的捕获时钟
    pub origin: f64,
    /// 脚下位置
    pub start: Point3,
    /// 行走速度 (m/s)
    pub velocity: Point3,
    /// 单程行走时长 (秒)
    pub walk_sec: f64,
    /// 折返前原地停留时长 (秒)
    pub dwell_sec: f64,
    pub intrinsics: Intrinsics,
    pub image_width: u32,
    pub image_height: u32,
    pub person_height_m: f64,
    pub class: String,
    pub detector_confidence: f64,
    /// 骨架信号 (None 时不输出)
    pub body_angle_deg: Option<f64>,
}

impl MockScene {
    /// Walks 3 m left to right and back, 4 m in front of the camera.
    pub fn walker(origin: f64) -> Self {
        Self {
            origin,
            start: Point3::new(-1.5, 1.0, 4.0),
            velocity: Point3::new(0.5, 0.0, 0.0),
            walk_sec: 6.0,
            dwell_sec: 0.0,
            intrinsics: Intrinsics {
                fx: 500.0,
                fy: 500.0,
                cx: 320.0,
                cy: 240.0,
            },
            image_width: 640,
            image_height: 480,
            person_height_m: 1.7,
            class: "person".to_string(),
            detector_confidence: 0.9,
            body_angle_deg: Some(85.0),
        }
    }

    /// Calibration under which fused positions land on [`position_at`](Self::position_at).
    pub fn calibration(&self) -> CalibrationConfig {
        let identity = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        CalibrationConfig {
            homography: identity,
            intrinsics: self.intrinsics,
            distortion: [0.0; 5],
            rotation: identity,
            translation: [0.0; 3],
        }
    }

    /// Footprint position at capture time `timestamp`
    pub fn position_at(&self, timestamp: f64) -> Point3 {
        let t = (timestamp - self.origin).max(0.0);
        let period = 2.0 * (self.walk_sec + self.dwell_sec);
        // progress along the outbound leg, in seconds
        let progress = if period <= 0.0 {
            0.0
        } else {
            let phase = t % period;
            let back = self.walk_sec + self.dwell_sec;
            if phase < self.walk_sec {
                phase
            } else if phase < back {
                self.walk_sec
            } else if phase < back + self.walk_sec {
                self.walk_sec - (phase - back)
            } else {
                0.0
            }
        };
        Point3::new(
            self.start.x + self.velocity.x * progress,
            self.start.y + self.velocity.y * progress,
            self.start.z + self.velocity.z * progress,
        )
    }

    /// Detector box around the person, `None` once the feet leave the image.
    pub fn bbox_at(&self, timestamp: f64) -> Option<BBox> {
        let p = self.position_at(timestamp);
        if p.z <= 0.0 {
            return None;
        }
        let k = &self.intrinsics;
        let u = k.fx * p.x / p.z + k.cx;
        let v = k.fy * p.y / p.z + k.cy;
        let height = k.fy * self.person_height_m / p.z;
        let width = 0.4 * height;

        let inside = u >= 0.0
            && u < self.image_width as f64
            && v >= 1.0
            && v <= self.image_height as f64;
        inside.then(|| BBox::new(u - width / 2.0, v - height, u + width / 2.0, v))
    }

    pub fn video_payload(&self, timestamp: f64) -> VideoPayload {
        let Some(bbox) = self.bbox_at(timestamp) else {
            return VideoPayload::default();
        };
        VideoPayload {
            payload_ref: Default::default(),
            detections: vec![Detection2D {
                bbox,
                class: self.class.clone(),
                confidence: self.detector_confidence,
            }],
            skeletons: self
                .body_angle_deg
                .map(|body_angle_deg| SkeletonSignal {
                    detection_index: 0,
                    body_angle_deg,
                })
                .into_iter()
                .collect(),
        }
    }

    pub fn depth_payload(&self, timestamp: f64) -> DepthPayload {
        let position = self.position_at(timestamp);
        DepthPayload {
            payload_ref: Default::default(),
            depth: Some(Arc::new(DepthGrid::uniform(
                self.image_width,
                self.image_height,
                position.z as f32,
            ))),
            bodies: vec![Detection3D {
                position,
                class: self.class.clone(),
                confidence: self.detector_confidence,
            }],
        }
    }

    pub fn frame(
        &self,
        kind: SourceKind,
        source_id: &str,
        timestamp: f64,
        sequence_no: u64,
    ) -> SourceFrame {
        match kind {
            SourceKind::Video => {
                SourceFrame::video(source_id, timestamp, sequence_no, self.video_payload(timestamp))
            }
            SourceKind::Depth => {
                SourceFrame::depth(source_id, timestamp, sequence_no, self.depth_payload(timestamp))
            }
        }
    }
}

/// Mock 数据源配置
#[derive(Debug, Clone)]
pub struct MockSourceConfig {
    pub source_id: String,
    pub kind: SourceKind,
    /// 发送频率 (Hz)
    pub fps: f64,
    /// 捕获时间戳抖动上限 (毫秒)
    pub jitter_ms: f64,
    /// 场景时间内不出帧的区间 (秒)，模拟断流
    pub outage: Option<Range<f64>>,
}

/// Mock 数据源
///
/// 在独立线程上按固定频率产出帧。
pub struct MockFrameSource {
    config: MockSourceConfig,
    scene: Arc<MockScene>,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MockFrameSource {
    pub fn new(config: MockSourceConfig, scene: Arc<MockScene>) -> Self {
        Self {
            config,
            scene,
            running: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    /// 2D 视频源
    pub fn video(source_id: &str, fps: f64, scene: Arc<MockScene>) -> Self {
        Self::new(
            MockSourceConfig {
                source_id: source_id.to_string(),
                kind: SourceKind::Video,
                fps,
                jitter_ms: 0.0,
                outage: None,
            },
            scene,
        )
    }

    /// 3D 深度源
    pub fn depth(source_id: &str, fps: f64, scene: Arc<MockScene>) -> Self {
        Self::new(
            MockSourceConfig {
                source_id: source_id.to_string(),
                kind: SourceKind::Depth,
                fps,
                jitter_ms: 0.0,
                outage: None,
            },
            scene,
        )
    }

    pub fn with_jitter_ms(mut self, jitter_ms: f64) -> Self {
        self.config.jitter_ms = jitter_ms.max(0.0);
        self
    }

    pub fn with_outage(mut self, outage: Range<f64>) -> Self {
        self.config.outage = Some(outage);
        self
    }

    pub fn config(&self) -> &MockSourceConfig {
        &self.config
    }
}

fn produce(
    config: MockSourceConfig,
    scene: Arc<MockScene>,
    running: Arc<AtomicBool>,
    callback: FrameCallback,
) {
    let period = Duration::from_secs_f64(1.0 / config.fps.max(0.1));
    let mut rng = rand::rng();
    let mut sequence_no: u64 = 0;

    debug!(
        source_id = %config.source_id,
        kind = %config.kind,
        fps = config.fps,
        "mock source started"
    );

    while running.load(Ordering::Relaxed) {
        let jitter = if config.jitter_ms > 0.0 {
            rng.random_range(0.0..config.jitter_ms) / 1000.0
        } else {
            0.0
        };
        let timestamp = wall_clock_secs() - jitter;
        let scene_time = timestamp - scene.origin;

        let in_outage = config
            .outage
            .as_ref()
            .is_some_and(|outage| outage.contains(&scene_time));
        if !in_outage {
            let frame = scene.frame(config.kind, &config.source_id, timestamp, sequence_no);
            sequence_no += 1;
            trace!(source_id = %config.source_id, sequence_no, timestamp, "mock frame");
            callback(frame);
        }

        std::thread::sleep(period);
    }

    debug!(source_id = %config.source_id, frames = sequence_no, "mock source stopped");
}

impl FrameSource for MockFrameSource {
    fn source_id(&self) -> &str {
        &self.config.source_id
    }

    fn kind(&self) -> SourceKind {
        self.config.kind
    }

    fn listen(&self, callback: FrameCallback) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let config = self.config.clone();
        let scene = Arc::clone(&self.scene);
        let running = Arc::clone(&self.running);
        let spawned = std::thread::Builder::new()
            .name(format!("mock-{}", self.config.source_id))
            .spawn(move || produce(config, scene, running, callback));

        match spawned {
            Ok(handle) => *self.worker.lock() = Some(handle),
            Err(e) => {
                error!(source_id = %self.config.source_id, error = %e, "failed to spawn mock source");
                self.running.store(false, Ordering::SeqCst);
            }
        }
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                error!(source_id = %self.config.source_id, "mock source thread panicked");
            }
        }
    }

    fn is_listening(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

impl Drop for MockFrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}
