use boardfind_lines::{ClusterParams, HoughParams, RefineParams};
use serde::{Deserialize, Serialize};

/// Parameters of the corner finder, one block per stage.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BoardFinderParams {
    pub hough: HoughParams,
    pub cluster: ClusterParams,
    pub refine: RefineParams,
    /// Minimal number of Hough lines before clustering is attempted.
    pub min_lines: usize,
}

impl Default for BoardFinderParams {
    fn default() -> Self {
        Self {
            hough: HoughParams::default(),
            cluster: ClusterParams::default(),
            refine: RefineParams::default(),
            min_lines: 4,
        }
    }
}

/// Thresholds of the per-square piece classifier.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OccupancyParams {
    /// Points must rise at least this far (scan units) above the deepest
    /// point of the square to count as a piece.
    pub min_piece_height: f64,
    /// A square with at most this many piece points is empty.
    pub min_points: usize,
    /// Mean brightness above this is a white piece.
    pub brightness_threshold: f64,
}

impl Default for OccupancyParams {
    fn default() -> Self {
        Self {
            min_piece_height: 20.0,
            min_points: 10,
            brightness_threshold: 128.0,
        }
    }
}

/// Parameters of the 64-square partition.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PartitionParams {
    /// Inset of each square region, as a fraction of a square in `[0, 0.5)`.
    pub margin: f64,
    /// Side of the rectified canvas the square bounds are reported in.
    pub rectified_size: usize,
    pub occupancy: OccupancyParams,
}

impl Default for PartitionParams {
    fn default() -> Self {
        Self {
            margin: 0.0,
            rectified_size: crate::DEFAULT_RECTIFIED_SIZE,
            occupancy: OccupancyParams::default(),
        }
    }
}
