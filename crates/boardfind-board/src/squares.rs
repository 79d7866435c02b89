//! 64-square partition of a located board and per-square occupancy.
//!
//! Squares are addressed by file `a..h` (left to right in the rectified
//! frame) and rank `1..8` (top to bottom). Each square's image region is
//! the pixel bounding box of its bilinearly interpolated corners, and the
//! scan points projecting into that box decide its occupancy.

use crate::params::{OccupancyParams, PartitionParams};
use crate::scan::{CameraModel, PixelRect, PointScan, ScanError};
use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Squares per board side.
pub const BOARD_SIDE: usize = 8;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid square name {0:?}")]
pub struct InvalidSquareName(pub String);

/// One board square, zero-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Square {
    /// Column, 0 = file `a`.
    pub file: u8,
    /// Row, 0 = rank `1`.
    pub rank: u8,
}

impl Square {
    pub fn new(file: u8, rank: u8) -> Option<Self> {
        (usize::from(file) < BOARD_SIDE && usize::from(rank) < BOARD_SIDE)
            .then_some(Self { file, rank })
    }

    /// All squares, rank by rank: `a1, b1, …, h1, a2, …, h8`.
    pub fn all() -> impl Iterator<Item = Square> {
        (0..BOARD_SIDE as u8).flat_map(|rank| (0..BOARD_SIDE as u8).map(move |file| Square { file, rank }))
    }

    pub fn index(&self) -> usize {
        usize::from(self.rank) * BOARD_SIDE + usize::from(self.file)
    }

    /// Algebraic name, e.g. `"e2"`.
    pub fn name(&self) -> String {
        self.to_string()
    }

    /// Parse an algebraic name such as `"e2"`.
    pub fn from_name(name: &str) -> Option<Self> {
        let mut chars = name.chars();
        let (f, r) = (chars.next()?, chars.next()?);
        if chars.next().is_some() || !('a'..='h').contains(&f) || !('1'..='8').contains(&r) {
            return None;
        }
        Self::new(f as u8 - b'a', r as u8 - b'1')
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.file) as char, self.rank + 1)
    }
}

impl From<Square> for String {
    fn from(s: Square) -> Self {
        s.name()
    }
}

impl TryFrom<String> for Square {
    type Error = InvalidSquareName;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Square::from_name(&s).ok_or(InvalidSquareName(s))
    }
}

/// What stands on a square.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occupancy {
    Empty,
    White,
    Black,
}

impl Occupancy {
    /// One-letter tag: `""`, `"W"` or `"B"`.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Empty => "",
            Self::White => "W",
            Self::Black => "B",
        }
    }
}

fn serialize_point_count<S: Serializer>(scan: &PointScan, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(scan.len() as u64)
}

/// One square of a partitioned board.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SquareRegion {
    pub square: Square,
    /// Bounds in the rectified canvas.
    pub rect_bounds: PixelRect,
    /// Bounds in the source image, clamped to it.
    pub image_bounds: PixelRect,
    /// Scan points projecting into `image_bounds`.
    #[serde(rename = "point_count", serialize_with = "serialize_point_count")]
    pub points: PointScan,
    pub occupancy: Occupancy,
}

impl SquareRegion {
    pub fn name(&self) -> String {
        self.square.name()
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }
}

/// Decide the occupancy of a square from its scan points.
///
/// Points more than `min_piece_height` above the deepest point of the set
/// are the visible top of a piece; more than `min_points` colored ones make
/// the square occupied, and their mean brightness picks the side.
pub fn classify_points(scan: &PointScan, params: &OccupancyParams) -> Occupancy {
    let Some((_, max_z)) = scan.depth_extent() else {
        return Occupancy::Empty;
    };
    let cutoff = max_z - params.min_piece_height;

    let (mut sum, mut count) = ([0.0f64; 3], 0usize);
    for p in &scan.points {
        let Some(rgb) = p.color else { continue };
        if p.position.z < cutoff {
            for (s, c) in sum.iter_mut().zip(rgb) {
                *s += c as f64;
            }
            count += 1;
        }
    }

    if count <= params.min_points {
        return Occupancy::Empty;
    }
    let brightness = sum.iter().map(|s| s / count as f64).sum::<f64>() / 3.0;
    if brightness > params.brightness_threshold {
        Occupancy::White
    } else {
        Occupancy::Black
    }
}

/// Bilinear interpolation of the board quad at normalised `(u, v)`.
fn board_point(corners: &[Point2<f64>; 4], u: f64, v: f64) -> Point2<f64> {
    let [tl, tr, br, bl] = corners;
    let top = tl.coords.lerp(&tr.coords, u);
    let bottom = bl.coords.lerp(&br.coords, u);
    Point2::from(top.lerp(&bottom, v))
}

fn bounding_rect(pts: &[Point2<f64>], width: usize, height: usize) -> PixelRect {
    let (mut lo_x, mut lo_y) = (f64::INFINITY, f64::INFINITY);
    let (mut hi_x, mut hi_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in pts {
        lo_x = lo_x.min(p.x);
        lo_y = lo_y.min(p.y);
        hi_x = hi_x.max(p.x);
        hi_y = hi_y.max(p.y);
    }
    let clamp_x = |v: f64| v.clamp(0.0, width as f64) as i32;
    let clamp_y = |v: f64| v.clamp(0.0, height as f64) as i32;
    PixelRect {
        x0: clamp_x(lo_x.floor()),
        y0: clamp_y(lo_y.floor()),
        x1: clamp_x(hi_x.ceil()),
        y1: clamp_y(hi_y.ceil()),
    }
}

/// Normalised `[u0, u1] × [v0, v1]` extent of a square with inset `margin`.
fn square_extent(square: Square, margin: f64) -> ([f64; 2], [f64; 2]) {
    let n = BOARD_SIDE as f64;
    let (f, r) = (square.file as f64, square.rank as f64);
    ([(f + margin) / n, (f + 1.0 - margin) / n], [(r + margin) / n, (r + 1.0 - margin) / n])
}

/// Image-space bounding box of `square` given the board corners
/// (TL, TR, BR, BL), clamped to a `width`×`height` image.
pub fn square_image_bounds(
    corners: &[Point2<i32>; 4],
    square: Square,
    margin: f64,
    width: usize,
    height: usize,
) -> PixelRect {
    let quad = corners.map(|p| Point2::new(p.x as f64, p.y as f64));
    let ([u0, u1], [v0, v1]) = square_extent(square, margin);
    let pts = [
        board_point(&quad, u0, v0),
        board_point(&quad, u1, v0),
        board_point(&quad, u1, v1),
        board_point(&quad, u0, v1),
    ];
    bounding_rect(&pts, width, height)
}

/// Bounding box of `square` in a `size`×`size` rectified canvas.
pub fn square_rect_bounds(square: Square, margin: f64, size: usize) -> PixelRect {
    let s = size as f64;
    let ([u0, u1], [v0, v1]) = square_extent(square, margin);
    bounding_rect(
        &[Point2::new(u0 * s, v0 * s), Point2::new(u1 * s, v1 * s)],
        size,
        size,
    )
}

fn square_region(
    square: Square,
    corners: &[Point2<i32>; 4],
    scan: &PointScan,
    camera: &CameraModel,
    params: &PartitionParams,
) -> SquareRegion {
    let (w, h) = (camera.intrinsics.width, camera.intrinsics.height);
    let margin = params.margin.clamp(0.0, 0.499);
    let image_bounds = square_image_bounds(corners, square, margin, w, h);
    let points = scan.crop_to_image_box(camera, &image_bounds);
    let occupancy = classify_points(&points, &params.occupancy);
    SquareRegion {
        square,
        rect_bounds: square_rect_bounds(square, margin, params.rectified_size),
        image_bounds,
        points,
        occupancy,
    }
}

/// Split the board into 64 squares, crop the scan per square and classify
/// each one. Output is ordered `a1, b1, …, h8`.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(points = scan.len()))
)]
pub fn partition_squares(
    corners: &[Point2<i32>; 4],
    scan: &PointScan,
    camera: &CameraModel,
    params: &PartitionParams,
) -> Result<Vec<SquareRegion>, ScanError> {
    camera.validate()?;
    scan.validate()?;
    let region = |square| square_region(square, corners, scan, camera, params);

    let squares: Vec<Square> = Square::all().collect();
    #[cfg(feature = "rayon")]
    let regions: Vec<SquareRegion> = squares.into_par_iter().map(region).collect();
    #[cfg(not(feature = "rayon"))]
    let regions: Vec<SquareRegion> = squares.into_iter().map(region).collect();

    debug!(
        "partitioned {} scan points, {} occupied squares",
        scan.len(),
        regions
            .iter()
            .filter(|r| r.occupancy != Occupancy::Empty)
            .count()
    );
    Ok(regions)
}
