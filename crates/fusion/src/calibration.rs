//! Fixed 2D-pixel → 3D-world transform.
//!
//! Chain: CCTV pixel --homography--> depth-camera pixel --undistort +
//! pinhole back-projection at sampled depth--> depth-camera frame
//! --rotation + translation--> world.

use contracts::{CalibrationConfig, ContractError, Intrinsics, Point3};
use nalgebra::{Matrix3, Vector3};

const UNDISTORT_ITERATIONS: usize = 5;

/// Loaded once at startup, immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    homography: Matrix3<f64>,
    intrinsics: Intrinsics,
    /// k1, k2, p1, p2, k3
    distortion: [f64; 5],
    rotation: Matrix3<f64>,
    translation: Vector3<f64>,
}

impl Calibration {
    /// Build and sanity-check a calibration.
    ///
    /// # Errors
    /// Non-finite entries, non-positive focal lengths, a singular homography
    /// or a rotation that is not orthonormal.
    pub fn from_config(config: &CalibrationConfig) -> Result<Self, ContractError> {
        let homography = matrix_from_rows(&config.homography);
        let rotation = matrix_from_rows(&config.rotation);
        let [tx, ty, tz] = config.translation;
        let translation = Vector3::new(tx, ty, tz);
        let k = config.intrinsics;

        let all_finite = homography.iter().all(|v| v.is_finite())
            && rotation.iter().all(|v| v.is_finite())
            && translation.iter().all(|v| v.is_finite())
            && config.distortion.iter().all(|v| v.is_finite())
            && [k.fx, k.fy, k.cx, k.cy].iter().all(|v| v.is_finite());
        if !all_finite {
            return Err(ContractError::calibration("non-finite calibration entry"));
        }
        if k.fx <= 0.0 || k.fy <= 0.0 {
            return Err(ContractError::calibration(format!(
                "focal lengths must be positive (fx={}, fy={})",
                k.fx, k.fy
            )));
        }
        if homography.determinant().abs() < 1e-12 {
            return Err(ContractError::calibration("homography is singular"));
        }
        let orthonormality = (rotation.transpose() * rotation - Matrix3::identity()).norm();
        if orthonormality > 1e-3 || (rotation.determinant() - 1.0).abs() > 1e-3 {
            return Err(ContractError::calibration(
                "rotation is not a proper orthonormal matrix",
            ));
        }

        Ok(Self {
            homography,
            intrinsics: k,
            distortion: config.distortion,
            rotation,
            translation,
        })
    }

    /// CCTV pixel to depth-camera pixel. `None` at the homography horizon.
    pub fn to_depth_pixel(&self, u: f64, v: f64) -> Option<(f64, f64)> {
        let p = self.homography * Vector3::new(u, v, 1.0);
        if p.z.abs() < 1e-12 {
            return None;
        }
        let (x, y) = (p.x / p.z, p.y / p.z);
        (x.is_finite() && y.is_finite()).then_some((x, y))
    }

    /// Depth-camera pixel plus metric depth to a world point.
    pub fn deproject(&self, u: f64, v: f64, depth: f64) -> Point3 {
        let k = &self.intrinsics;
        let (xd, yd) = ((u - k.cx) / k.fx, (v - k.cy) / k.fy);
        let (xn, yn) = self.undistort(xd, yd);
        let camera = Vector3::new(xn * depth, yn * depth, depth);
        let world = self.rotation * camera + self.translation;
        Point3::new(world.x, world.y, world.z)
    }

    /// Inverse Brown-Conrady by fixed-point iteration.
    fn undistort(&self, xd: f64, yd: f64) -> (f64, f64) {
        let [k1, k2, p1, p2, k3] = self.distortion;
        if self.distortion.iter().all(|c| *c == 0.0) {
            return (xd, yd);
        }
        let (mut x, mut y) = (xd, yd);
        for _ in 0..UNDISTORT_ITERATIONS {
            let r2 = x * x + y * y;
            let radial = 1.0 + k1 * r2 + k2 * r2 * r2 + k3 * r2 * r2 * r2;
            let dx = 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x);
            let dy = p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y;
            x = (xd - dx) / radial;
            y = (yd - dy) / radial;
        }
        (x, y)
    }
}

fn matrix_from_rows(rows: &[[f64; 3]; 3]) -> Matrix3<f64> {
    Matrix3::new(
        rows[0][0], rows[0][1], rows[0][2], rows[1][0], rows[1][1], rows[1][2], rows[2][0],
        rows[2][1], rows[2][2],
    )
}
