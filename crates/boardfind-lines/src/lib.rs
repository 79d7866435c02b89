//! Line extraction for board finding, built on top of `boardfind-core`.
//!
//! ## Quickstart
//!
//! ```
//! use boardfind_core::GrayImage;
//! use boardfind_lines::{detect_lines, sobel, HoughParams};
//!
//! let img = GrayImage::new(64, 64);
//! let grad = sobel(&img.view());
//! let lines = detect_lines(&grad, &HoughParams::default());
//! assert!(lines.is_empty());
//! ```
//!
//! Stages:
//! 1. Sobel gradients with a clipped 8-bit magnitude.
//! 2. Gradient-directed Hough voting with non-maximum suppression.
//! 3. Axis split, 1-D merge and isolation filter on midline positions.
//! 4. 8-interval grid fit to choose the border pair of each axis.
//! 5. Theil–Sen re-fit of the chosen lines against nearby edge pixels.

mod cluster;
mod edges;
mod hough;
mod refine;

pub use cluster::{
    classify_axis, filter_isolated, grid_score, merge_by_position, select_border_pair,
    split_by_axis, AxisLines, ClusterParams,
};
pub use edges::{sobel, GradientField};
pub use hough::{detect_lines, HoughAccumulator, HoughParams};
pub use refine::{is_row_like, least_squares, refine_line, theil_sen, RefineParams};
