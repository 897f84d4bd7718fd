//! SourceFrame - ingestion output
//!
//! One capture from either the 2D video source or the 3D depth source. The
//! payload stays opaque (`payload_ref`); only detector output and the depth
//! query surface are exposed to the core.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::{BBox, Point3, SourceId};

/// Which modality a source produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Fixed surveillance camera (2D)
    Video,
    /// Stereo / depth camera (3D)
    Depth,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Video => f.write_str("video"),
            SourceKind::Depth => f.write_str("depth"),
        }
    }
}

/// External detector output for one object in a 2D frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection2D {
    pub bbox: BBox,
    pub class: String,
    pub confidence: f64,
}

/// Depth-native body detection (already in world coordinates)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection3D {
    pub position: Point3,
    pub class: String,
    pub confidence: f64,
}

/// External pose signal attached to one 2D detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkeletonSignal {
    /// Index into the frame's detection list
    pub detection_index: usize,
    /// Torso angle from the horizontal, degrees (90 = upright)
    pub body_angle_deg: f64,
}

/// Depth query surface of a 3D frame.
///
/// Coordinates are depth-camera pixels; the answer is metric depth along the
/// optical axis, or `None` for a hole / invalid reading.
pub trait DepthSampler: Send + Sync + fmt::Debug {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn depth_at(&self, u: u32, v: u32) -> Option<f64>;
}

/// Row-major depth image in meters. Zero, negative and non-finite cells are holes.
#[derive(Clone)]
pub struct DepthGrid {
    width: u32,
    height: u32,
    depth_m: Vec<f32>,
}

impl DepthGrid {
    /// Build from raw cells; returns `None` when the cell count does not match.
    pub fn new(width: u32, height: u32, depth_m: Vec<f32>) -> Option<Self> {
        if depth_m.len() != (width as usize) * (height as usize) {
            return None;
        }
        Some(Self {
            width,
            height,
            depth_m,
        })
    }

    /// Flat depth plane at `depth` meters.
    pub fn uniform(width: u32, height: u32, depth: f32) -> Self {
        Self {
            width,
            height,
            depth_m: vec![depth; (width as usize) * (height as usize)],
        }
    }

    /// Punch a rectangular hole (all zero) into the grid.
    pub fn with_hole(mut self, u0: u32, v0: u32, u1: u32, v1: u32) -> Self {
        for v in v0..v1.min(self.height) {
            for u in u0..u1.min(self.width) {
                let idx = (v * self.width + u) as usize;
                self.depth_m[idx] = 0.0;
            }
        }
        self
    }
}

impl DepthSampler for DepthGrid {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn depth_at(&self, u: u32, v: u32) -> Option<f64> {
        if u >= self.width || v >= self.height {
            return None;
        }
        let d = self.depth_m[(v * self.width + u) as usize];
        (d.is_finite() && d > 0.0).then_some(d as f64)
    }
}

impl fmt::Debug for DepthGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DepthGrid")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// 2D frame content
#[derive(Debug, Clone, Default)]
pub struct VideoPayload {
    /// Opaque image buffer handle
    pub payload_ref: Bytes,
    pub detections: Vec<Detection2D>,
    pub skeletons: Vec<SkeletonSignal>,
}

/// 3D frame content
#[derive(Debug, Clone, Default)]
pub struct DepthPayload {
    /// Opaque depth buffer handle
    pub payload_ref: Bytes,
    pub depth: Option<Arc<dyn DepthSampler>>,
    pub bodies: Vec<Detection3D>,
}

#[derive(Debug, Clone)]
pub enum FramePayload {
    Video(VideoPayload),
    Depth(DepthPayload),
}

/// One captured frame. Immutable once built; cloning shares the payload.
#[derive(Debug, Clone)]
pub struct SourceFrame {
    pub source_id: SourceId,
    /// Capture clock, seconds since the Unix epoch
    pub capture_timestamp: f64,
    pub sequence_no: u64,
    pub payload: FramePayload,
}

impl SourceFrame {
    pub fn video(
        source_id: impl Into<SourceId>,
        capture_timestamp: f64,
        sequence_no: u64,
        payload: VideoPayload,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            capture_timestamp,
            sequence_no,
            payload: FramePayload::Video(payload),
        }
    }

    pub fn depth(
        source_id: impl Into<SourceId>,
        capture_timestamp: f64,
        sequence_no: u64,
        payload: DepthPayload,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            capture_timestamp,
            sequence_no,
            payload: FramePayload::Depth(payload),
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self.payload {
            FramePayload::Video(_) => SourceKind::Video,
            FramePayload::Depth(_) => SourceKind::Depth,
        }
    }

    pub fn as_video(&self) -> Option<&VideoPayload> {
        match &self.payload {
            FramePayload::Video(v) => Some(v),
            FramePayload::Depth(_) => None,
        }
    }

    pub fn as_depth(&self) -> Option<&DepthPayload> {
        match &self.payload {
            FramePayload::Depth(d) => Some(d),
            FramePayload::Video(_) => None,
        }
    }
}
