//! Plane projective maps and the perspective warp used for rectification.

use crate::{sample_bilinear_rgb, RgbImage, RgbImageView};
use nalgebra::{Matrix3, Point2, Vector3};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// A 3×3 projective map acting on pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        Point2::new((v.x / v.z) as f32, (v.y / v.z) as f32)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }
}

/// Map taking the unit square `(0,0) (1,0) (1,1) (0,1)` onto `q`.
fn unit_square_to_quad(q: &[Point2<f64>; 4]) -> Matrix3<f64> {
    let [p0, p1, p2, p3] = q;
    let (sx, sy) = (p0.x - p1.x + p2.x - p3.x, p0.y - p1.y + p2.y - p3.y);

    if sx == 0.0 && sy == 0.0 {
        // parallelogram
        return Matrix3::new(
            p1.x - p0.x, p3.x - p0.x, p0.x, //
            p1.y - p0.y, p3.y - p0.y, p0.y, //
            0.0, 0.0, 1.0,
        );
    }

    let (dx1, dy1) = (p1.x - p2.x, p1.y - p2.y);
    let (dx2, dy2) = (p3.x - p2.x, p3.y - p2.y);
    let den = dx1 * dy2 - dx2 * dy1;
    let g = (sx * dy2 - dx2 * sy) / den;
    let h = (dx1 * sy - sx * dy1) / den;

    Matrix3::new(
        p1.x - p0.x + g * p1.x, p3.x - p0.x + h * p3.x, p0.x, //
        p1.y - p0.y + g * p1.y, p3.y - p0.y + h * p3.y, p0.y, //
        g, h, 1.0,
    )
}

/// Compute H such that `dst ~ H * src` from four correspondences, composed
/// through the unit square. Corner order must match between `src` and `dst`.
///
/// Returns `None` for degenerate quads (coincident or collinear corners).
pub fn homography_from_4pt(src: &[Point2<f32>; 4], dst: &[Point2<f32>; 4]) -> Option<Homography> {
    let widen = |q: &[Point2<f32>; 4]| q.map(|p| Point2::new(p.x as f64, p.y as f64));
    let unit_to_src = unit_square_to_quad(&widen(src));
    let unit_to_dst = unit_square_to_quad(&widen(dst));

    let h = unit_to_dst * unit_to_src.try_inverse()?;
    let scale = h[(2, 2)];
    if scale.abs() < 1e-12 {
        return None;
    }
    let h = h / scale;
    if !h.iter().all(|v| v.is_finite()) {
        return None;
    }
    Some(Homography::new(h))
}

/// Fill an `out_w`×`out_h` canvas by mapping each pixel through
/// `h_img_from_rect` and sampling `src` bilinearly.
pub fn warp_perspective_rgb(
    src: &RgbImageView<'_>,
    h_img_from_rect: Homography,
    out_w: usize,
    out_h: usize,
) -> RgbImage {
    let mut out = RgbImage::new(out_w, out_h);
    if out_w == 0 {
        return out;
    }

    let fill_row = |(y, row): (usize, &mut [u8])| {
        for (x, px) in row.chunks_exact_mut(3).enumerate() {
            let pi = h_img_from_rect.apply(Point2::new(x as f32, y as f32));
            px.copy_from_slice(&sample_bilinear_rgb(src, pi.x, pi.y));
        }
    };

    #[cfg(feature = "rayon")]
    out.data
        .par_chunks_mut(out_w * 3)
        .enumerate()
        .for_each(fill_row);
    #[cfg(not(feature = "rayon"))]
    out.data.chunks_mut(out_w * 3).enumerate().for_each(fill_row);

    out
}
