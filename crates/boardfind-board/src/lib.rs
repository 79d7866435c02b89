//! Board location and square partition built on top of `boardfind-lines`.
//!
//! ## Quickstart
//!
//! ```
//! use boardfind_board::{default_corners, BoardFinder, CornerSource};
//! use boardfind_core::RgbImage;
//!
//! let img = RgbImage::new(320, 240);
//! let corners = BoardFinder::default().find_corners(&img.view()).unwrap();
//! assert_eq!(corners.points, default_corners(320, 240));
//! assert!(matches!(corners.source, CornerSource::Fallback(_)));
//! ```
//!
//! Pipeline:
//! 1. Intensity, Sobel gradients and Hough lines (`boardfind-lines`).
//! 2. Axis split, merge, isolation filter and grid-fit border pairs.
//! 3. Theil–Sen refinement of the four border lines.
//! 4. Border intersections give TL, TR, BR, BL; any failure on the way
//!    substitutes [`default_corners`] and records the reason.
//! 5. Optional rectification to an N×N canvas, and the 64-square partition
//!    with per-square point-scan crop and occupancy.

mod detector;
mod params;
mod rectified_view;
mod scan;
mod squares;

pub use detector::{
    default_corners, find_corners, BoardCorners, BoardFinder, BorderLines, CornerSource,
    FallbackReason,
};
pub use params::{BoardFinderParams, OccupancyParams, PartitionParams};
pub use rectified_view::{rectify, RectifiedBoard, RectifyError, DEFAULT_RECTIFIED_SIZE};
pub use scan::{CameraModel, PinholeIntrinsics, PixelRect, PointScan, ScanError, ScanPoint};
pub use squares::{
    classify_points, partition_squares, square_image_bounds, square_rect_bounds,
    InvalidSquareName, Occupancy, Square, SquareRegion, BOARD_SIDE,
};
