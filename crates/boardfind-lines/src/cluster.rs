//! Axis classification, 1-D de-duplication and border-pair selection.
//!
//! Lines are reduced to a scalar offset along their axis, measured on the
//! image midline. The board border on each axis is the pair whose 8-interval
//! grid collects the most votes from the other lines.

use boardfind_core::{Axis, AxisLine, BorderPair, Line};
use serde::{Deserialize, Serialize};

/// Thresholds of the clustering and grid-fit stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterParams {
    /// Lines within this many degrees of 90° are near-horizontal.
    pub horizontal_band_deg: f64,
    /// Lines within this many degrees of 0°/180° are near-vertical.
    pub vertical_band_deg: f64,
    /// Lines closer than this to a stronger line are dropped.
    pub merge_distance_px: f64,
    /// A line needs a neighbour within this fraction of the image extent
    /// along its axis.
    pub isolation_fraction: f64,
    /// Number of board intervals between the border lines.
    pub grid_intervals: usize,
    /// Candidate pairs with a smaller per-interval spacing are skipped.
    pub min_grid_spacing_px: f64,
    /// Maximal distance, in intervals, of a line from its grid slot.
    pub slot_tolerance: f64,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            horizontal_band_deg: 15.0,
            vertical_band_deg: 15.0,
            merge_distance_px: 15.0,
            isolation_fraction: 0.2,
            grid_intervals: 8,
            min_grid_spacing_px: 10.0,
            slot_tolerance: 0.15,
        }
    }
}

/// Candidate lines split by axis, in the order they were given.
#[derive(Clone, Debug, Default)]
pub struct AxisLines {
    pub horizontal: Vec<AxisLine>,
    pub vertical: Vec<AxisLine>,
}

impl AxisLines {
    pub fn get(&self, axis: Axis) -> &[AxisLine] {
        match axis {
            Axis::Horizontal => &self.horizontal,
            Axis::Vertical => &self.vertical,
        }
    }
}

/// Axis of a line, or `None` if it is too oblique for either.
pub fn classify_axis(line: &Line, params: &ClusterParams) -> Option<Axis> {
    let deg = line.theta_deg();
    if (deg - 90.0).abs() < params.horizontal_band_deg {
        Some(Axis::Horizontal)
    } else if deg < params.vertical_band_deg || deg > 180.0 - params.vertical_band_deg {
        Some(Axis::Vertical)
    } else {
        None
    }
}

/// Split lines into near-horizontal and near-vertical sets and attach their
/// midline positions (`y` at `x = width/2`, `x` at `y = height/2`).
pub fn split_by_axis(
    lines: &[Line],
    width: usize,
    height: usize,
    params: &ClusterParams,
) -> AxisLines {
    let mid_x = (width / 2) as f64;
    let mid_y = (height / 2) as f64;

    let mut out = AxisLines::default();
    for line in lines {
        match classify_axis(line, params) {
            Some(Axis::Horizontal) => out.horizontal.push(AxisLine {
                line: *line,
                pos: line.position(Axis::Horizontal, mid_x),
            }),
            Some(Axis::Vertical) => out.vertical.push(AxisLine {
                line: *line,
                pos: line.position(Axis::Vertical, mid_y),
            }),
            None => {}
        }
    }
    out
}

/// Keep the strongest line of every group closer than `distance`.
///
/// Lines are visited by descending votes (stable on ties); a line survives
/// only if no survivor lies strictly within `distance` of it.
pub fn merge_by_position(lines: &[AxisLine], distance: f64) -> Vec<AxisLine> {
    let mut ordered = lines.to_vec();
    ordered.sort_by(|a, b| b.line.votes.cmp(&a.line.votes));

    let mut kept: Vec<AxisLine> = Vec::with_capacity(ordered.len());
    for l in ordered {
        if kept.iter().all(|k| (l.pos - k.pos).abs() >= distance) {
            kept.push(l);
        }
    }
    kept
}

/// Drop lines that have no other line within `threshold` (inclusive).
pub fn filter_isolated(lines: &[AxisLine], threshold: f64) -> Vec<AxisLine> {
    lines
        .iter()
        .enumerate()
        .filter(|(i, l)| {
            lines
                .iter()
                .enumerate()
                .any(|(j, o)| *i != j && (l.pos - o.pos).abs() <= threshold)
        })
        .map(|(_, l)| *l)
        .collect()
}

/// Grid-fit score of the pair `(i, j)` of position-sorted lines.
///
/// Every line snapping to one of the `grid_intervals + 1` slots between the
/// pair contributes its votes; each slot keeps only its strongest line.
/// Returns `None` when the pair is too close to form a grid.
pub fn grid_score(sorted: &[AxisLine], i: usize, j: usize, params: &ClusterParams) -> Option<u64> {
    let intervals = params.grid_intervals.max(1);
    let spacing = (sorted[j].pos - sorted[i].pos) / intervals as f64;
    if !spacing.is_finite() || spacing < params.min_grid_spacing_px {
        return None;
    }

    let mut slots = vec![0u32; intervals + 1];
    for k in sorted {
        let rel = (k.pos - sorted[i].pos) / spacing;
        let nearest = rel.round();
        if nearest < 0.0 || nearest > intervals as f64 {
            continue;
        }
        if (rel - nearest).abs() < params.slot_tolerance {
            let slot = &mut slots[nearest as usize];
            *slot = (*slot).max(k.line.votes);
        }
    }
    Some(slots.iter().map(|&v| v as u64).sum())
}

/// Pick the near/far border lines of one axis.
///
/// Returns `None` for an empty set. With at most two lines the outermost
/// are returned; otherwise the highest-scoring pair wins, the first pair in
/// `(i, j)` order on ties, and the outermost pair stands if nothing scores.
pub fn select_border_pair(lines: &[AxisLine], params: &ClusterParams) -> Option<BorderPair> {
    let mut sorted = lines.to_vec();
    sorted.sort_by(|a, b| a.pos.total_cmp(&b.pos));

    let last = sorted.len().checked_sub(1)?;
    let (mut best_i, mut best_j) = (0, last);
    let mut best_score = 0u64;

    if sorted.len() > 2 {
        for i in 0..sorted.len() {
            for j in i + 1..sorted.len() {
                let Some(score) = grid_score(&sorted, i, j, params) else {
                    continue;
                };
                if score > best_score {
                    best_score = score;
                    best_i = i;
                    best_j = j;
                }
            }
        }
    }

    Some(BorderPair {
        near: sorted[best_i],
        far: sorted[best_j],
    })
}
