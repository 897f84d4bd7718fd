//! Depth sampling at a detection footprint.

use contracts::{BBox, DepthSampler, FootprintAnchor};

/// Pixel on the bbox used to query depth
pub fn anchor_point(bbox: &BBox, anchor: FootprintAnchor) -> (f64, f64) {
    match anchor {
        FootprintAnchor::Center => bbox.center(),
        // one pixel inside the box so the sample stays on the person
        FootprintAnchor::BottomCenter => {
            let (u, v) = bbox.bottom_center();
            (u, (v - 1.0).max(bbox.y1))
        }
    }
}

/// Median of valid depth readings in a `(2r+1)²` patch around `(u, v)`.
///
/// Readings outside `[min_depth, max_depth]` are ignored; `None` when nothing
/// valid remains (occlusion, sensor hole, out of range, off-image).
pub fn sample_depth(
    sampler: &dyn DepthSampler,
    u: f64,
    v: f64,
    radius: u32,
    min_depth: f64,
    max_depth: f64,
) -> Option<f64> {
    if !u.is_finite() || !v.is_finite() {
        return None;
    }
    let (cu, cv) = (u.round() as i64, v.round() as i64);
    let r = radius as i64;
    let (w, h) = (sampler.width() as i64, sampler.height() as i64);

    let mut readings: Vec<f64> = Vec::with_capacity(((2 * r + 1) * (2 * r + 1)) as usize);
    for pv in (cv - r)..=(cv + r) {
        for pu in (cu - r)..=(cu + r) {
            if pu < 0 || pv < 0 || pu >= w || pv >= h {
                continue;
            }
            if let Some(d) = sampler.depth_at(pu as u32, pv as u32) {
                if d >= min_depth && d <= max_depth {
                    readings.push(d);
                }
            }
        }
    }

    if readings.is_empty() {
        return None;
    }
    readings.sort_by(|a, b| a.total_cmp(b));
    let mid = readings.len() / 2;
    Some(if readings.len() % 2 == 0 {
        (readings[mid - 1] + readings[mid]) / 2.0
    } else {
        readings[mid]
    })
}
