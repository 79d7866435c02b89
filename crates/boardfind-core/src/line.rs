//! Polar lines `x·cosθ + y·sinθ = ρ` and their intersections.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Determinant magnitude below which two lines count as parallel.
pub const PARALLEL_EPS: f64 = 1e-10;

/// A line in Hesse normal form, with the number of votes that supported it.
///
/// `theta` is kept in `[0, π)`. Lines have no equality; compare them through
/// [`Line::position`] or explicit distance checks.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Line {
    pub rho: f64,
    pub theta: f64,
    pub votes: u32,
}

/// Which image axis a roughly axis-aligned line runs along.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// Near-horizontal lines; positions are y offsets.
    Horizontal,
    /// Near-vertical lines; positions are x offsets.
    Vertical,
}

impl Line {
    pub fn new(rho: f64, theta: f64, votes: u32) -> Self {
        Self { rho, theta, votes }
    }

    #[inline]
    pub fn theta_deg(&self) -> f64 {
        self.theta.to_degrees()
    }

    /// Signed distance of `(x, y)` from the line.
    #[inline]
    pub fn residual(&self, x: f64, y: f64) -> f64 {
        x * self.theta.cos() + y * self.theta.sin() - self.rho
    }

    /// `y` on the line at column `x`. Infinite for vertical lines.
    #[inline]
    pub fn y_at(&self, x: f64) -> f64 {
        (self.rho - x * self.theta.cos()) / self.theta.sin()
    }

    /// `x` on the line at row `y`. Infinite for horizontal lines.
    #[inline]
    pub fn x_at(&self, y: f64) -> f64 {
        (self.rho - y * self.theta.sin()) / self.theta.cos()
    }

    /// Offset of the line along `axis`, measured on the image midline
    /// (`mid` is the midline coordinate on the other axis).
    pub fn position(&self, axis: Axis, mid: f64) -> f64 {
        match axis {
            Axis::Horizontal => self.y_at(mid),
            Axis::Vertical => self.x_at(mid),
        }
    }

    /// Build a line from `y = slope·x + intercept`.
    pub fn from_row_slope(slope: f64, intercept: f64, votes: u32) -> Self {
        let theta = wrap_theta(1.0_f64.atan2(-slope));
        Self::new(intercept * theta.sin(), theta, votes)
    }

    /// Build a line from `x = slope·y + intercept`.
    pub fn from_column_slope(slope: f64, intercept: f64, votes: u32) -> Self {
        let theta = wrap_theta((-slope).atan2(1.0));
        Self::new(intercept * theta.cos(), theta, votes)
    }
}

/// A line tagged with its offset along one axis, used for 1-D clustering.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct AxisLine {
    pub line: Line,
    pub pos: f64,
}

/// The near and far border lines of one board axis.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct BorderPair {
    pub near: AxisLine,
    pub far: AxisLine,
}

/// Fold an angle into `[0, π)`.
#[inline]
pub fn wrap_theta(theta: f64) -> f64 {
    let t = theta.rem_euclid(PI);
    if t >= PI {
        0.0
    } else {
        t
    }
}

/// Intersect two polar lines with a 2×2 solve.
///
/// Returns `None` when `|cosθ1·sinθ2 − cosθ2·sinθ1| < 1e-10`.
pub fn line_intersection(l1: &Line, l2: &Line) -> Option<Point2<f64>> {
    let (s1, c1) = l1.theta.sin_cos();
    let (s2, c2) = l2.theta.sin_cos();

    let det = c1 * s2 - c2 * s1;
    if det.abs() < PARALLEL_EPS {
        return None;
    }

    let x = (s2 * l1.rho - s1 * l2.rho) / det;
    let y = (c1 * l2.rho - c2 * l1.rho) / det;
    Some(Point2::new(x, y))
}

/// [`line_intersection`] rounded to the nearest pixel.
pub fn line_intersection_px(l1: &Line, l2: &Line) -> Option<Point2<i32>> {
    let p = line_intersection(l1, l2)?;
    if !p.x.is_finite() || !p.y.is_finite() {
        return None;
    }
    Some(Point2::new(p.x.round() as i32, p.y.round() as i32))
}
