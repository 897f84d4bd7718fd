//! FusionEngine - 2D detections + depth → FusedObservation

use contracts::{
    BBox, ContractError, DepthSampler, Detection3D, FusedObservation, FusionConfig, ObservationOrigin,
    Point3, SourceFrame, SyncedPair, SystemBlueprint, VideoPayload,
};
use nalgebra::DMatrix;
use tracing::{debug, instrument, trace, warn};

use crate::assignment::min_cost_assignment;
use crate::calibration::Calibration;
use crate::sampling::{anchor_point, sample_depth};

/// Stateless between calls; safe to share behind `&`.
#[derive(Debug, Clone)]
pub struct FusionEngine {
    config: FusionConfig,
    calibration: Option<Calibration>,
}

impl FusionEngine {
    pub fn new(config: FusionConfig, calibration: Option<Calibration>) -> Self {
        if calibration.is_none() {
            warn!("No calibration loaded, fusion runs in 2D-only mode");
        }
        Self {
            config,
            calibration,
        }
    }

    /// Build from the `fusion` and `calibration` sections of a blueprint.
    pub fn from_blueprint(blueprint: &SystemBlueprint) -> Result<Self, ContractError> {
        let calibration = blueprint
            .calibration
            .as_ref()
            .map(Calibration::from_config)
            .transpose()?;
        Ok(Self::new(blueprint.fusion.clone(), calibration))
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// True when no calibration is loaded
    pub fn is_video_only(&self) -> bool {
        self.calibration.is_none()
    }

    /// Fuse one synchronized pair.
    ///
    /// Observation order: 2D detections in detector order (fused where a
    /// depth body matched), then unmatched depth bodies.
    #[instrument(
        name = "fusion_fuse",
        skip(self, pair),
        fields(t = pair.timestamp(), delta_ms = pair.delta_t * 1000.0)
    )]
    pub fn fuse(&self, pair: &SyncedPair) -> Vec<FusedObservation> {
        let timestamp = pair.timestamp();
        let Some(video) = pair.frame_2d.as_video() else {
            warn!(source_id = %pair.frame_2d.source_id, "2D side of pair carries no video payload");
            return Vec::new();
        };
        let (sampler, bodies) = match pair.frame_3d.as_depth() {
            Some(depth) => (depth.depth.as_deref(), depth.bodies.as_slice()),
            None => (None, &[][..]),
        };

        let projected = self.project(video, sampler, timestamp);
        let observations = self.match_objects(projected, bodies, timestamp);
        record(&observations);
        observations
    }

    /// Degraded mode: 2D detections without depth.
    #[instrument(name = "fusion_fuse_video_only", skip(self, frame), fields(t = frame.capture_timestamp))]
    pub fn fuse_video_only(&self, frame: &SourceFrame) -> Vec<FusedObservation> {
        let Some(video) = frame.as_video() else {
            return Vec::new();
        };
        let observations = self.project(video, None, frame.capture_timestamp);
        record(&observations);
        observations
    }

    /// Project every 2D detection into world space where depth allows.
    fn project(
        &self,
        video: &VideoPayload,
        sampler: Option<&dyn DepthSampler>,
        timestamp: f64,
    ) -> Vec<FusedObservation> {
        video
            .detections
            .iter()
            .enumerate()
            .map(|(idx, det)| {
                let position = sampler.and_then(|s| self.locate(det.bbox, s));
                let validity = if position.is_some() {
                    1.0
                } else {
                    self.config.degraded_validity
                };
                let body_angle_deg = video
                    .skeletons
                    .iter()
                    .find(|s| s.detection_index == idx)
                    .map(|s| s.body_angle_deg);

                FusedObservation {
                    candidate_id: idx as u32,
                    position,
                    bbox: Some(det.bbox),
                    class: det.class.clone(),
                    confidence: det.confidence * validity,
                    detector_confidence: det.confidence,
                    projection_validity: validity,
                    source_timestamp: timestamp,
                    origin: ObservationOrigin::VideoOnly,
                    body_angle_deg,
                }
            })
            .collect()
    }

    fn locate(&self, bbox: BBox, sampler: &dyn DepthSampler) -> Option<Point3> {
        let calibration = self.calibration.as_ref()?;
        let (u, v) = anchor_point(&bbox, self.config.footprint);
        let (du, dv) = calibration.to_depth_pixel(u, v)?;
        let depth = sample_depth(
            sampler,
            du,
            dv,
            self.config.sample_radius_px,
            self.config.min_depth_m,
            self.config.max_depth_m,
        );
        let Some(depth) = depth else {
            trace!(u, v, "No valid depth sample at footprint");
            return None;
        };
        let position = calibration.deproject(du, dv, depth);
        position.is_finite().then_some(position)
    }

    /// Cross-validate projected 2D observations against depth-native bodies.
    ///
    /// Minimum-cost assignment on 3D distance with a hard
    /// `max_match_distance_m` gate. Observations without a position never
    /// match. Candidate ids are renumbered in output order.
    pub fn match_objects(
        &self,
        projected: Vec<FusedObservation>,
        bodies: &[Detection3D],
        timestamp: f64,
    ) -> Vec<FusedObservation> {
        let gate = self.config.max_match_distance_m;
        let rows: Vec<usize> = projected
            .iter()
            .enumerate()
            .filter(|(_, o)| o.has_position())
            .map(|(i, _)| i)
            .collect();

        let mut body_for_row: Vec<Option<usize>> = vec![None; projected.len()];
        let mut body_matched = vec![false; bodies.len()];

        if !rows.is_empty() && !bodies.is_empty() {
            let cost = DMatrix::from_fn(rows.len(), bodies.len(), |r, c| {
                match projected[rows[r]].position {
                    Some(p) => p.distance(&bodies[c].position),
                    None => f64::INFINITY,
                }
            });
            for a in min_cost_assignment(&cost, gate) {
                body_for_row[rows[a.row]] = Some(a.col);
                body_matched[a.col] = true;
            }
        }

        let mut out: Vec<FusedObservation> = Vec::with_capacity(projected.len() + bodies.len());
        for (obs, body) in projected.into_iter().zip(body_for_row) {
            match body {
                Some(b) => out.push(merge(obs, &bodies[b])),
                None => out.push(obs),
            }
        }
        for (body, _) in bodies
            .iter()
            .zip(&body_matched)
            .filter(|(_, matched)| !**matched)
        {
            out.push(FusedObservation {
                candidate_id: 0,
                position: Some(body.position),
                bbox: None,
                class: body.class.clone(),
                confidence: body.confidence,
                detector_confidence: body.confidence,
                projection_validity: 1.0,
                source_timestamp: timestamp,
                origin: ObservationOrigin::DepthOnly,
                body_angle_deg: None,
            });
        }

        for (i, obs) in out.iter_mut().enumerate() {
            obs.candidate_id = i as u32;
        }
        debug!(
            observations = out.len(),
            fused = out.iter().filter(|o| o.origin == ObservationOrigin::Fused).count(),
            "Fusion complete"
        );
        out
    }
}

fn merge(obs: FusedObservation, body: &Detection3D) -> FusedObservation {
    let projected = obs.position.unwrap_or(body.position);
    let (wa, wb) = (obs.detector_confidence, body.confidence);
    let position = if wa + wb > 0.0 {
        (projected.scale(wa) + body.position.scale(wb)).scale(1.0 / (wa + wb))
    } else {
        (projected + body.position).scale(0.5)
    };
    let detector_confidence = wa.max(wb);
    FusedObservation {
        position: Some(position),
        confidence: detector_confidence,
        detector_confidence,
        projection_validity: 1.0,
        origin: ObservationOrigin::Fused,
        ..obs
    }
}

fn record(observations: &[FusedObservation]) {
    let with_position = observations.iter().filter(|o| o.has_position()).count();
    observability::record_observations(observations.len(), with_position);
}
