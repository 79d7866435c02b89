//! High-level facade crate for the `boardfind-*` workspace.
//!
//! This crate provides:
//! - stable re-exports of the underlying pipeline crates
//! - JSON configuration, point-scan and report I/O ([`io`])
//! - (feature-gated) end-to-end helpers working on `image` buffers
//!
//! ## Quickstart
//!
//! ```no_run
//! use boardfind::detect;
//! use boardfind::BoardFinderParams;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = image::open("board.jpg")?;
//! let corners = detect::find_board(&img, &BoardFinderParams::default())?;
//! println!("top-left: {:?} (detected: {})", corners.top_left(), corners.is_detected());
//!
//! let board = detect::rectify_board(&img.to_rgb8(), &corners, 800)?;
//! board.save("board_rectified.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `boardfind::core`: rasters, polar lines, homographies, logging.
//! - `boardfind::lines`: Sobel, Hough voting, line clustering and refinement.
//! - `boardfind::board`: corner finding, rectification, square partition.
//! - `boardfind::io`: JSON config, scans, camera models and reports.
//! - `boardfind::detect` (feature `image`): helpers from `image::DynamicImage`.

pub use boardfind_board as board;
pub use boardfind_core as core;
pub use boardfind_lines as lines;

pub use boardfind_board::{
    BoardCorners, BoardFinder, BoardFinderParams, CameraModel, CornerSource, Occupancy,
    PartitionParams, PointScan, Square, SquareRegion,
};

pub mod io;

#[cfg(feature = "image")]
pub mod detect;
