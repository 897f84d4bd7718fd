//! Zone containment tests.

use contracts::{BBox, Point3, ReferencePlane, ZoneGeometry};

/// Ray casting (even-odd). Points exactly on an edge may land either way.
pub fn point_in_polygon(x: f64, y: f64, polygon: &[[f64; 2]]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let [xi, yi] = polygon[i];
        let [xj, yj] = polygon[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn project(position: Point3, plane: ReferencePlane) -> (f64, f64) {
    match plane {
        ReferencePlane::Xy => (position.x, position.y),
        ReferencePlane::Xz => (position.x, position.z),
        ReferencePlane::Yz => (position.y, position.z),
    }
}

/// Membership of an object in a zone, `None` when the object lacks the
/// coordinates the shape needs.
pub fn zone_contains(
    geometry: &ZoneGeometry,
    position: Option<Point3>,
    bbox: Option<BBox>,
) -> Option<bool> {
    match geometry {
        ZoneGeometry::FloorPolygon { plane, points } => {
            let (x, y) = project(position?, *plane);
            Some(point_in_polygon(x, y, points))
        }
        ZoneGeometry::Bounds { min, max } => {
            let p = position?;
            let coords = [p.x, p.y, p.z];
            Some((0..3).all(|i| coords[i] >= min[i] && coords[i] <= max[i]))
        }
        ZoneGeometry::ImagePolygon { points } => {
            let (u, v) = bbox?.bottom_center();
            Some(point_in_polygon(u, v, points))
        }
    }
}
