//! FusedObservation - fusion output

use serde::{Deserialize, Serialize};

use crate::{BBox, Point3};

/// Where a fused observation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationOrigin {
    /// 2D detection cross-validated by a depth-native detection
    Fused,
    /// 2D detection only (projected through depth, or not at all)
    VideoOnly,
    /// Depth-native detection with no 2D counterpart
    DepthOnly,
}

/// One detected entity in one synchronized pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedObservation {
    /// Index within the producing call; not stable across pairs
    pub candidate_id: u32,
    /// World position; `None` when no valid depth sample existed
    pub position: Option<Point3>,
    pub bbox: Option<BBox>,
    pub class: String,
    /// detector_confidence × projection_validity
    pub confidence: f64,
    pub detector_confidence: f64,
    pub projection_validity: f64,
    pub source_timestamp: f64,
    pub origin: ObservationOrigin,
    /// Body angle from the external pose signal, degrees
    pub body_angle_deg: Option<f64>,
}

impl FusedObservation {
    pub fn has_position(&self) -> bool {
        self.position.is_some()
    }
}
