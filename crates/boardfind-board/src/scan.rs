//! Depth+color point scans and the camera model that projects them.
//!
//! Scan coordinates are metric-ish (millimetres in practice) with `z`
//! growing away from the camera, so a piece standing on the board has a
//! *smaller* `z` than the board surface around it.

use nalgebra::{Isometry3, Point2, Point3};
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ScanError {
    #[error("invalid camera intrinsics: {0}")]
    InvalidIntrinsics(&'static str),
    #[error("scan point {index} has a non-finite coordinate")]
    NonFinitePoint { index: usize },
}

/// One scan sample, optionally colored.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScanPoint {
    pub position: Point3<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<[u8; 3]>,
}

impl ScanPoint {
    pub fn new(position: Point3<f64>, color: Option<[u8; 3]>) -> Self {
        Self { position, color }
    }
}

/// An unordered point scan.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PointScan {
    pub points: Vec<ScanPoint>,
}

impl PointScan {
    pub fn new(points: Vec<ScanPoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Reject scans containing NaN or infinite coordinates.
    pub fn validate(&self) -> Result<(), ScanError> {
        match self
            .points
            .iter()
            .position(|p| !p.position.iter().all(|v| v.is_finite()))
        {
            Some(index) => Err(ScanError::NonFinitePoint { index }),
            None => Ok(()),
        }
    }

    /// `(min_z, max_z)` over all points, `None` for an empty scan.
    pub fn depth_extent(&self) -> Option<(f64, f64)> {
        self.points.iter().map(|p| p.position.z).fold(None, |acc, z| {
            Some(match acc {
                None => (z, z),
                Some((lo, hi)) => (f64::min(lo, z), f64::max(hi, z)),
            })
        })
    }

    /// Points whose projection falls inside `rect`.
    pub fn crop_to_image_box(&self, camera: &CameraModel, rect: &PixelRect) -> PointScan {
        PointScan::new(
            self.points
                .iter()
                .filter(|p| camera.project(&p.position).is_some_and(|uv| rect.contains(uv)))
                .copied()
                .collect(),
        )
    }
}

/// Half-open pixel rectangle `[x0, x1) × [y0, y1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl PixelRect {
    pub fn width(&self) -> i32 {
        (self.x1 - self.x0).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.y1 - self.y0).max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    #[inline]
    pub fn contains(&self, p: Point2<f64>) -> bool {
        p.x >= self.x0 as f64 && p.x < self.x1 as f64 && p.y >= self.y0 as f64 && p.y < self.y1 as f64
    }
}

/// Pinhole intrinsics of the color camera.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PinholeIntrinsics {
    pub width: usize,
    pub height: usize,
    pub fx: f64,
    pub fy: f64,
    pub ppx: f64,
    pub ppy: f64,
}

impl PinholeIntrinsics {
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.width == 0 || self.height == 0 {
            return Err(ScanError::InvalidIntrinsics("image size must be positive"));
        }
        let finite = [self.fx, self.fy, self.ppx, self.ppy]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.fx <= 0.0 || self.fy <= 0.0 {
            return Err(ScanError::InvalidIntrinsics(
                "focal lengths must be positive and finite",
            ));
        }
        Ok(())
    }

    /// Pixel of a camera-frame point, `None` behind the camera.
    #[inline]
    pub fn project(&self, p: &Point3<f64>) -> Option<Point2<f64>> {
        if p.z <= 0.0 {
            return None;
        }
        Some(Point2::new(
            self.fx * p.x / p.z + self.ppx,
            self.fy * p.y / p.z + self.ppy,
        ))
    }
}

/// Scan-to-pixel projection: rigid transform into the camera frame, then
/// the pinhole model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraModel {
    pub intrinsics: PinholeIntrinsics,
    #[serde(default = "Isometry3::identity")]
    pub scan_to_camera: Isometry3<f64>,
}

impl CameraModel {
    /// Camera whose frame coincides with the scan frame.
    pub fn new(intrinsics: PinholeIntrinsics) -> Self {
        Self {
            intrinsics,
            scan_to_camera: Isometry3::identity(),
        }
    }

    pub fn with_extrinsics(mut self, scan_to_camera: Isometry3<f64>) -> Self {
        self.scan_to_camera = scan_to_camera;
        self
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        self.intrinsics.validate()
    }

    #[inline]
    pub fn project(&self, p: &Point3<f64>) -> Option<Point2<f64>> {
        self.intrinsics.project(&(self.scan_to_camera * p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::{Translation3, UnitQuaternion};

    fn intrinsics() -> PinholeIntrinsics {
        PinholeIntrinsics {
            width: 640,
            height: 480,
            fx: 500.0,
            fy: 500.0,
            ppx: 320.0,
            ppy: 240.0,
        }
    }

    #[test]
    fn projection_applies_extrinsics_first() {
        let cam = CameraModel::new(intrinsics()).with_extrinsics(Isometry3::from_parts(
            Translation3::new(0.0, 0.0, 500.0),
            UnitQuaternion::identity(),
        ));
        let uv = cam.project(&Point3::new(100.0, -50.0, 500.0)).expect("in front");
        assert_abs_diff_eq!(uv.x, 370.0, epsilon = 1e-9);
        assert_abs_diff_eq!(uv.y, 215.0, epsilon = 1e-9);
        assert!(cam.project(&Point3::new(0.0, 0.0, -600.0)).is_none());
    }

    #[test]
    fn crop_keeps_points_inside_the_box() {
        let cam = CameraModel::new(intrinsics());
        let scan = PointScan::new(vec![
            ScanPoint::new(Point3::new(0.0, 0.0, 1000.0), None),
            ScanPoint::new(Point3::new(200.0, 0.0, 1000.0), None),
            ScanPoint::new(Point3::new(0.0, 0.0, -1000.0), None),
        ]);
        let rect = PixelRect {
            x0: 300,
            y0: 220,
            x1: 340,
            y1: 260,
        };
        let crop = scan.crop_to_image_box(&cam, &rect);
        assert_eq!(crop.len(), 1);
        assert_eq!(crop.points[0].position.x, 0.0);
    }

    #[test]
    fn depth_extent_and_validation() {
        let mut scan = PointScan::default();
        assert!(scan.depth_extent().is_none());
        scan.points.push(ScanPoint::new(Point3::new(0.0, 0.0, 900.0), None));
        scan.points.push(ScanPoint::new(Point3::new(0.0, 0.0, 870.0), Some([1, 2, 3])));
        assert_eq!(scan.depth_extent(), Some((870.0, 900.0)));
        assert!(scan.validate().is_ok());

        scan.points.push(ScanPoint::new(Point3::new(f64::NAN, 0.0, 1.0), None));
        assert_eq!(scan.validate(), Err(ScanError::NonFinitePoint { index: 2 }));

        let mut bad = intrinsics();
        bad.fx = 0.0;
        assert!(matches!(bad.validate(), Err(ScanError::InvalidIntrinsics(_))));
    }

    #[test]
    fn scan_json_accepts_missing_color_and_extrinsics() {
        let scan: PointScan =
            serde_json::from_str(r#"{"points":[{"position":[1.0,2.0,3.0]}]}"#).expect("json");
        assert_eq!(scan.points[0].color, None);

        let cam: CameraModel = serde_json::from_str(
            r#"{"intrinsics":{"width":640,"height":480,"fx":500.0,"fy":500.0,"ppx":320.0,"ppy":240.0}}"#,
        )
        .expect("json");
        assert_eq!(cam.scan_to_camera, Isometry3::identity());
    }
}
