//! Core types and utilities for checkerboard board finding.
//!
//! This crate is intentionally small: rasters, polar lines, the 4-point
//! homography and the perspective warp. It does *not* know about edges, Hough
//! voting or boards; those live in `boardfind-lines` and `boardfind-board`.

mod homography;
mod image;
mod line;
mod logger;

pub use homography::{homography_from_4pt, warp_perspective_rgb, Homography};
pub use image::{
    sample_bilinear_rgb, to_intensity, GrayImage, GrayImageView, ImageError, RgbImage,
    RgbImageView,
};
pub use line::{
    line_intersection, line_intersection_px, wrap_theta, Axis, AxisLine, BorderPair, Line,
    PARALLEL_EPS,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
