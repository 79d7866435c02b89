//! Sub-pixel re-fit of a Hough line from nearby edge pixels.
//!
//! The Hough cell quantises ρ and θ, so a border line can be off by a pixel
//! and a fraction of a degree. Re-fitting against the edge pixels in a thin
//! band around the candidate removes that quantisation. Samples are reduced
//! to one per column (row) and fitted with a Theil–Sen estimator, which
//! tolerates the piece and shadow edges that stray into the band.
//!
//! Samples are `(along, across)` pairs: `(x, y)` for near-horizontal lines,
//! `(y, x)` for near-vertical ones, so the fitted model is always
//! `across = slope·along + intercept`.

use crate::GradientField;
use boardfind_core::Line;
use log::trace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Parameters of the local re-fit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineParams {
    /// Minimal gradient magnitude of a sample pixel.
    pub edge_threshold: u8,
    /// Half-width of the search band around the predicted position.
    pub band_px: f64,
    /// Minimal number of raw samples, and of per-position representatives.
    pub min_points: usize,
    /// Lower bound of the index gap between paired samples.
    pub min_gap: usize,
    /// Above this many representatives, pairs are subsampled.
    pub subsample_above: usize,
    /// Approximate number of indices visited per axis when subsampling.
    pub subsample_target: usize,
    /// Fewer slopes than this falls back to least squares.
    pub min_slopes: usize,
    /// Pairs closer than this along the axis yield no slope.
    pub min_axis_delta: f64,
}

impl Default for RefineParams {
    fn default() -> Self {
        Self {
            edge_threshold: 80,
            band_px: 3.0,
            min_points: 10,
            min_gap: 10,
            subsample_above: 200,
            subsample_target: 100,
            min_slopes: 5,
            min_axis_delta: 1.0,
        }
    }
}

/// Whether a line is fitted as `y = f(x)`.
#[inline]
pub fn is_row_like(line: &Line) -> bool {
    let deg = line.theta_deg();
    deg > 45.0 && deg < 135.0
}

/// Edge pixels within the band around `line`, as `(along, across)` pairs.
fn collect_samples(line: &Line, grad: &GradientField, params: &RefineParams) -> Vec<(f64, f64)> {
    let row_like = is_row_like(line);
    let (along_len, across_len) = if row_like {
        (grad.width, grad.height)
    } else {
        (grad.height, grad.width)
    };
    if across_len == 0 {
        return Vec::new();
    }
    let across_max = (across_len - 1) as f64;

    let mut samples = Vec::new();
    for a in 0..along_len {
        let expected = if row_like {
            line.y_at(a as f64)
        } else {
            line.x_at(a as f64)
        };
        if !expected.is_finite() {
            continue;
        }
        let lo = (expected - params.band_px).max(0.0) as i64;
        let hi = (expected + params.band_px).min(across_max) as i64;
        for c in lo.max(0)..=hi {
            let (x, y) = if row_like {
                (a, c as usize)
            } else {
                (c as usize, a)
            };
            if grad.magnitude(x, y) >= params.edge_threshold {
                samples.push((a as f64, c as f64));
            }
        }
    }
    samples
}

/// One representative per along-position: the upper median of its across
/// values. Output is sorted by position.
fn median_per_position(samples: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut groups: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for &(along, across) in samples {
        groups.entry(along as i64).or_default().push(across);
    }
    groups
        .into_iter()
        .map(|(pos, mut vals)| {
            vals.sort_by(f64::total_cmp);
            (pos as f64, vals[vals.len() / 2])
        })
        .collect()
}

fn upper_median(mut vals: Vec<f64>) -> f64 {
    vals.sort_by(f64::total_cmp);
    vals[vals.len() / 2]
}

/// Theil–Sen fit of `across = slope·along + intercept` over samples sorted
/// by `along`.
///
/// Only pairs at least `max(n/4, min_gap)` indices apart are used; above
/// `subsample_above` samples both indices advance by `n / subsample_target`.
/// Returns `None` when fewer than `min_slopes` slopes are available.
pub fn theil_sen(points: &[(f64, f64)], params: &RefineParams) -> Option<(f64, f64)> {
    let n = points.len();
    let gap = (n / 4).max(params.min_gap);
    let step = if n > params.subsample_above {
        (n / params.subsample_target.max(1)).max(1)
    } else {
        1
    };

    let mut slopes = Vec::new();
    for i in (0..n.saturating_sub(gap)).step_by(step) {
        for j in (i + gap..n).step_by(step) {
            let (a1, c1) = points[i];
            let (a2, c2) = points[j];
            let d = a2 - a1;
            if d.abs() > params.min_axis_delta {
                slopes.push((c2 - c1) / d);
            }
        }
    }
    if slopes.len() < params.min_slopes {
        return None;
    }

    let slope = upper_median(slopes);
    let intercept = upper_median(points.iter().map(|&(a, c)| c - slope * a).collect());
    Some((slope, intercept))
}

/// Ordinary least squares fit of `across = slope·along + intercept`.
///
/// Degenerate spreads fall back to a constant fit at the mean.
pub fn least_squares(points: &[(f64, f64)]) -> (f64, f64) {
    let n = points.len() as f64;
    let (mut sa, mut sc, mut saa, mut sac) = (0.0, 0.0, 0.0, 0.0);
    for &(a, c) in points {
        sa += a;
        sc += c;
        saa += a * a;
        sac += a * c;
    }
    let denom = n * saa - sa * sa;
    if denom.abs() < 1e-10 {
        return (0.0, sc / n);
    }
    let slope = (n * sac - sa * sc) / denom;
    (slope, (sc - slope * sa) / n)
}

/// Re-fit `line` against the edge pixels of `grad` near it.
///
/// Returns the input unchanged when too few edge pixels support it; the
/// vote count is always carried over.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(grad, params), fields(rho = line.rho, theta = line.theta))
)]
pub fn refine_line(line: &Line, grad: &GradientField, params: &RefineParams) -> Line {
    let samples = collect_samples(line, grad, params);
    if samples.len() < params.min_points {
        trace!("refine: {} samples, keeping Hough line", samples.len());
        return *line;
    }

    let reps = median_per_position(&samples);
    if reps.len() < params.min_points {
        trace!("refine: {} positions, keeping Hough line", reps.len());
        return *line;
    }

    let (slope, intercept) = theil_sen(&reps, params).unwrap_or_else(|| least_squares(&reps));
    if !slope.is_finite() || !intercept.is_finite() {
        return *line;
    }

    if is_row_like(line) {
        Line::from_row_slope(slope, intercept, line.votes)
    } else {
        Line::from_column_slope(slope, intercept, line.votes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sobel;
    use approx::assert_abs_diff_eq;
    use boardfind_core::GrayImage;
    use std::f64::consts::FRAC_PI_2;

    fn slanted_edge(w: usize, h: usize) -> GrayImage {
        let mut img = GrayImage::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let bright = y as f64 > 50.0 + 0.05 * x as f64;
                img.data[y * w + x] = if bright { 200 } else { 20 };
            }
        }
        img
    }

    fn transpose(img: &GrayImage) -> GrayImage {
        let mut out = GrayImage::new(img.height, img.width);
        for y in 0..img.height {
            for x in 0..img.width {
                out.data[x * img.height + y] = img.get(x, y);
            }
        }
        out
    }

    #[test]
    fn refit_recovers_a_slanted_row_edge() {
        let grad = sobel(&slanted_edge(200, 120).view());
        let guess = Line::new(55.0, FRAC_PI_2, 321);
        let refined = refine_line(&guess, &grad, &RefineParams::default());

        assert_eq!(refined.votes, 321);
        assert!(is_row_like(&refined));
        assert_abs_diff_eq!(refined.y_at(0.0), 50.5, epsilon = 1.5);
        assert_abs_diff_eq!(refined.y_at(199.0), 60.45, epsilon = 1.5);
    }

    #[test]
    fn refit_recovers_a_slanted_column_edge() {
        let grad = sobel(&transpose(&slanted_edge(200, 120)).view());
        let guess = Line::new(55.0, 0.0, 12);
        let refined = refine_line(&guess, &grad, &RefineParams::default());

        assert!(!is_row_like(&refined));
        assert_abs_diff_eq!(refined.x_at(0.0), 50.5, epsilon = 1.5);
        assert_abs_diff_eq!(refined.x_at(199.0), 60.45, epsilon = 1.5);
    }

    #[test]
    fn blank_field_keeps_the_input() {
        let grad = sobel(&GrayImage::new(64, 64).view());
        let guess = Line::new(30.0, 1.5, 4);
        let refined = refine_line(&guess, &grad, &RefineParams::default());
        assert_eq!(refined.rho, guess.rho);
        assert_eq!(refined.theta, guess.theta);
    }

    #[test]
    fn short_segment_keeps_the_input() {
        // bright block over columns 20..26 from row 32 down: plenty of edge
        // pixels in the band, but they cover only a handful of columns
        let (w, h) = (64, 64);
        let mut img = GrayImage::new(w, h);
        for y in 32..h {
            for x in 20..26 {
                img.data[y * w + x] = 200;
            }
        }
        let grad = sobel(&img.view());
        let params = RefineParams::default();
        let guess = Line::new(31.5, FRAC_PI_2, 9);

        let samples = collect_samples(&guess, &grad, &params);
        assert!(samples.len() >= params.min_points, "{} samples", samples.len());
        let positions = median_per_position(&samples).len();
        assert!(positions < params.min_points, "{positions} positions");

        let refined = refine_line(&guess, &grad, &params);
        assert_eq!((refined.rho, refined.theta, refined.votes), (guess.rho, guess.theta, 9));
    }

    #[test]
    fn theil_sen_ignores_a_fifth_of_outliers() {
        let points: Vec<(f64, f64)> = (0..40)
            .map(|i| {
                let x = i as f64;
                let y = 2.0 * x + 1.0 + if i % 5 == 0 { 50.0 } else { 0.0 };
                (x, y)
            })
            .collect();
        let (slope, intercept) = theil_sen(&points, &RefineParams::default()).expect("enough pairs");
        assert_eq!(slope, 2.0);
        assert_eq!(intercept, 1.0);
    }

    #[test]
    fn short_runs_fall_back_to_least_squares() {
        let points: Vec<(f64, f64)> = (0..11).map(|i| (i as f64, 0.5 * i as f64 + 3.0)).collect();
        assert!(theil_sen(&points, &RefineParams::default()).is_none());
        let (slope, intercept) = least_squares(&points);
        assert_abs_diff_eq!(slope, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(intercept, 3.0, epsilon = 1e-12);
        assert_eq!(least_squares(&[(2.0, 1.0), (2.0, 3.0)]), (0.0, 2.0));
    }
}
