//! Zone - read-only rule engine input, owned by configuration

use serde::{Deserialize, Serialize};

/// Monitored area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub zone_id: String,
    pub name: String,
    pub geometry: ZoneGeometry,
    #[serde(default)]
    pub rules: ZoneRules,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub zone_type: ZoneType,
    /// 1 (lowest) - 10 (highest)
    #[serde(default = "default_priority")]
    pub priority: u8,
}

fn default_enabled() -> bool {
    true
}

fn default_priority() -> u8 {
    5
}

/// Zone shape. `floor_polygon` is tested against the 3D position projected on
/// `plane`; `image_polygon` against the bbox bottom-center in camera pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ZoneGeometry {
    FloorPolygon {
        #[serde(default)]
        plane: ReferencePlane,
        points: Vec<[f64; 2]>,
    },
    Bounds {
        min: [f64; 3],
        max: [f64; 3],
    },
    ImagePolygon {
        points: Vec<[f64; 2]>,
    },
}

impl ZoneGeometry {
    /// Structural check; the message names what is wrong.
    pub fn check(&self) -> Result<(), String> {
        match self {
            ZoneGeometry::FloorPolygon { points, .. } | ZoneGeometry::ImagePolygon { points } => {
                if points.len() < 3 {
                    return Err(format!("polygon needs at least 3 points, got {}", points.len()));
                }
                if points.iter().flatten().any(|c| !c.is_finite()) {
                    return Err("polygon has non-finite coordinates".into());
                }
                Ok(())
            }
            ZoneGeometry::Bounds { min, max } => {
                if min.iter().chain(max.iter()).any(|c| !c.is_finite()) {
                    return Err("bounds have non-finite coordinates".into());
                }
                if min.iter().zip(max.iter()).any(|(lo, hi)| lo > hi) {
                    return Err("bounds min exceeds max".into());
                }
                Ok(())
            }
        }
    }

    /// Whether the shape needs a 3D position to evaluate
    pub fn needs_position(&self) -> bool {
        !matches!(self, ZoneGeometry::ImagePolygon { .. })
    }
}

/// Plane a floor polygon is drawn on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferencePlane {
    #[default]
    Xy,
    Xz,
    Yz,
}

/// Per-zone rule switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneRules {
    #[serde(default = "default_enabled")]
    pub entry: bool,
    #[serde(default = "default_enabled")]
    pub exit: bool,
    /// Overrides the global hysteresis confirmation count
    #[serde(default)]
    pub confirmations: Option<u32>,
}

impl Default for ZoneRules {
    fn default() -> Self {
        Self {
            entry: true,
            exit: true,
            confirmations: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneType {
    Restricted,
    #[default]
    Monitoring,
    Safe,
    Hazard,
}
