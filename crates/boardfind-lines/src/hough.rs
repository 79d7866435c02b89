//! Gradient-directed Hough transform.
//!
//! Every edge pixel votes only in a small window of θ buckets around its own
//! gradient direction instead of across the whole half-turn. That keeps
//! short, weak edges (interior square boundaries) competitive with long
//! background edges and makes voting cost independent of θ resolution.
//!
//! Peaks are cells that reach `min_votes` and have no strictly larger
//! neighbour in a `±nms_rho × ±nms_theta` window (θ wraps).

use crate::GradientField;
use boardfind_core::Line;
use log::debug;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Parameters of the line detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoughParams {
    /// Minimal gradient magnitude for a pixel to vote.
    pub edge_threshold: u8,
    /// Number of θ buckets over `[0, π)`.
    pub num_thetas: usize,
    /// Each pixel votes in `±vote_window` buckets around its gradient angle.
    pub vote_window: usize,
    /// Minimal accumulator count for a line candidate.
    pub min_votes: u32,
    /// Non-maximum suppression half-window along ρ (buckets).
    pub nms_rho: usize,
    /// Non-maximum suppression half-window along θ (buckets).
    pub nms_theta: usize,
}

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            edge_threshold: 90,
            num_thetas: 720, // 0.25° per bucket
            vote_window: 5,
            min_votes: 100,
            nms_rho: 2,
            nms_theta: 3,
        }
    }
}

/// Vote accumulator indexed by `(ρ bucket, θ bucket)`.
#[derive(Clone, Debug)]
pub struct HoughAccumulator {
    data: Vec<u32>,
    rho_bins: usize,
    num_thetas: usize,
    max_rho: i64,
    cos_table: Vec<f64>,
    sin_table: Vec<f64>,
}

impl HoughAccumulator {
    pub fn new(width: usize, height: usize, num_thetas: usize) -> Self {
        let max_rho = ((width * width + height * height) as f64).sqrt() as i64;
        let rho_bins = 2 * max_rho as usize + 1;
        let num_thetas = num_thetas.max(1);

        let (sin_table, cos_table) = (0..num_thetas)
            .map(|t| (t as f64 * PI / num_thetas as f64).sin_cos())
            .unzip();

        Self {
            data: vec![0; rho_bins * num_thetas],
            rho_bins,
            num_thetas,
            max_rho,
            cos_table,
            sin_table,
        }
    }

    #[inline]
    pub fn votes(&self, rho_idx: usize, t: usize) -> u32 {
        self.data[rho_idx * self.num_thetas + t]
    }

    pub fn rho_bins(&self) -> usize {
        self.rho_bins
    }

    #[inline]
    fn theta_of(&self, t: usize) -> f64 {
        t as f64 * PI / self.num_thetas as f64
    }

    /// Bucket of a gradient direction in `[0, π)`.
    #[inline]
    fn theta_bucket(&self, direction: f64) -> usize {
        let t = (direction * self.num_thetas as f64 / PI) as usize;
        if t >= self.num_thetas {
            0
        } else {
            t
        }
    }

    /// Cast the votes of all qualifying pixels of row `y` into `acc`.
    fn vote_row(&self, acc: &mut [u32], grad: &GradientField, y: usize, params: &HoughParams) {
        let n = self.num_thetas as isize;
        let window = params.vote_window as isize;
        for x in 0..grad.width {
            if grad.magnitude(x, y) < params.edge_threshold {
                continue;
            }
            let center = self.theta_bucket(grad.direction(x, y)) as isize;
            for dt in -window..=window {
                let t = (center + dt).rem_euclid(n) as usize;
                let rho = x as f64 * self.cos_table[t] + y as f64 * self.sin_table[t];
                let rho_idx = rho as i64 + self.max_rho;
                if rho_idx >= 0 && (rho_idx as usize) < self.rho_bins {
                    acc[rho_idx as usize * self.num_thetas + t] += 1;
                }
            }
        }
    }

    /// Accumulate votes from every edge pixel of `grad`.
    ///
    /// With `rayon`, each worker fills a private accumulator over a band of
    /// rows and the partial accumulators are summed.
    pub fn accumulate(&mut self, grad: &GradientField, params: &HoughParams) {
        #[cfg(feature = "rayon")]
        let votes = self.votes_parallel(grad, params);
        #[cfg(not(feature = "rayon"))]
        let votes = self.votes_sequential(grad, params);

        self.data
            .iter_mut()
            .zip(votes)
            .for_each(|(d, v)| *d += v);
    }

    #[cfg(feature = "rayon")]
    fn votes_parallel(&self, grad: &GradientField, params: &HoughParams) -> Vec<u32> {
        let len = self.data.len();
        (0..grad.height)
            .into_par_iter()
            .with_min_len(32)
            .fold(
                || vec![0u32; len],
                |mut acc, y| {
                    self.vote_row(&mut acc, grad, y, params);
                    acc
                },
            )
            .reduce(
                || vec![0u32; len],
                |mut a, b| {
                    a.iter_mut().zip(b).for_each(|(x, y)| *x += y);
                    a
                },
            )
    }

    #[cfg(any(not(feature = "rayon"), test))]
    fn votes_sequential(&self, grad: &GradientField, params: &HoughParams) -> Vec<u32> {
        let mut acc = vec![0u32; self.data.len()];
        for y in 0..grad.height {
            self.vote_row(&mut acc, grad, y, params);
        }
        acc
    }

    fn is_local_max(&self, rho_idx: usize, t: usize, params: &HoughParams) -> bool {
        let v = self.votes(rho_idx, t);
        let n = self.num_thetas as isize;
        let nr = params.nms_rho as isize;
        let nt = params.nms_theta as isize;
        for dr in -nr..=nr {
            let r = rho_idx as isize + dr;
            if r < 0 || r >= self.rho_bins as isize {
                continue;
            }
            for dt in -nt..=nt {
                if dr == 0 && dt == 0 {
                    continue;
                }
                let tt = (t as isize + dt).rem_euclid(n) as usize;
                if self.votes(r as usize, tt) > v {
                    return false;
                }
            }
        }
        true
    }

    /// Extract local-maximum lines, strongest first.
    pub fn peaks(&self, params: &HoughParams) -> Vec<Line> {
        let mut lines = Vec::new();
        for rho_idx in 0..self.rho_bins {
            for t in 0..self.num_thetas {
                let v = self.votes(rho_idx, t);
                if v < params.min_votes || !self.is_local_max(rho_idx, t, params) {
                    continue;
                }
                lines.push(Line::new(
                    (rho_idx as i64 - self.max_rho) as f64,
                    self.theta_of(t),
                    v,
                ));
            }
        }
        lines.sort_by(|a, b| b.votes.cmp(&a.votes));
        lines
    }
}

/// Detect candidate lines in a gradient field, sorted by descending votes.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(grad, params), fields(width = grad.width, height = grad.height))
)]
pub fn detect_lines(grad: &GradientField, params: &HoughParams) -> Vec<Line> {
    let mut acc = HoughAccumulator::new(grad.width, grad.height, params.num_thetas);
    acc.accumulate(grad, params);
    let lines = acc.peaks(params);
    debug!(
        "hough: {} edge pixels, {} lines (threshold {})",
        grad.count_edges(params.edge_threshold),
        lines.len(),
        params.edge_threshold
    );
    lines
}
