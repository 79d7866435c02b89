use crate::params::BoardFinderParams;
use boardfind_core::{
    line_intersection_px, to_intensity, AxisLine, GrayImageView, ImageError, Line, RgbImageView,
};
use boardfind_lines::{
    detect_lines, filter_isolated, merge_by_position, refine_line, select_border_pair, sobel,
    split_by_axis,
};
use log::{debug, warn};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Why the detector gave up and substituted [`default_corners`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FallbackReason {
    /// The Hough stage returned too few lines.
    TooFewLines { found: usize },
    /// Fewer than two lines on an axis after the angle split.
    TooFewAxisLines { horizontal: usize, vertical: usize },
    /// Fewer than two lines on an axis after merging and the isolation filter.
    TooFewClusteredLines { horizontal: usize, vertical: usize },
    /// Two border lines did not intersect.
    NoIntersection,
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewLines { found } => write!(f, "only {found} Hough lines"),
            Self::TooFewAxisLines {
                horizontal,
                vertical,
            } => write!(f, "{horizontal} horizontal / {vertical} vertical lines"),
            Self::TooFewClusteredLines {
                horizontal,
                vertical,
            } => write!(
                f,
                "{horizontal} horizontal / {vertical} vertical lines after clustering"
            ),
            Self::NoIntersection => write!(f, "border lines do not intersect"),
        }
    }
}

/// Where a corner set came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CornerSource {
    Detected,
    Fallback(FallbackReason),
}

/// Four board corners ordered top-left, top-right, bottom-right, bottom-left.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardCorners {
    pub points: [Point2<i32>; 4],
    pub source: CornerSource,
}

impl BoardCorners {
    pub fn is_detected(&self) -> bool {
        matches!(self.source, CornerSource::Detected)
    }

    pub fn top_left(&self) -> Point2<i32> {
        self.points[0]
    }

    pub fn top_right(&self) -> Point2<i32> {
        self.points[1]
    }

    pub fn bottom_right(&self) -> Point2<i32> {
        self.points[2]
    }

    pub fn bottom_left(&self) -> Point2<i32> {
        self.points[3]
    }
}

/// Fallback corner set: the central half of the frame, using integer
/// division.
pub fn default_corners(width: usize, height: usize) -> [Point2<i32>; 4] {
    let (w, h) = (width as i32, height as i32);
    [
        Point2::new(w / 4, h / 4),
        Point2::new(3 * w / 4, h / 4),
        Point2::new(3 * w / 4, 3 * h / 4),
        Point2::new(w / 4, 3 * h / 4),
    ]
}

/// The four refined border lines of a board.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct BorderLines {
    pub top: Line,
    pub bottom: Line,
    pub left: Line,
    pub right: Line,
}

impl BorderLines {
    /// Intersect the borders into TL, TR, BR, BL.
    pub fn corners(&self) -> Option<[Point2<i32>; 4]> {
        Some([
            line_intersection_px(&self.top, &self.left)?,
            line_intersection_px(&self.top, &self.right)?,
            line_intersection_px(&self.bottom, &self.right)?,
            line_intersection_px(&self.bottom, &self.left)?,
        ])
    }
}

/// Line-based board corner finder.
#[derive(Clone, Debug, Default)]
pub struct BoardFinder {
    pub params: BoardFinderParams,
}

impl BoardFinder {
    pub fn new(params: BoardFinderParams) -> Self {
        Self { params }
    }

    /// Find the board corners in a color image.
    ///
    /// Only a malformed view is an error; any geometric failure yields the
    /// fallback corners with the reason recorded in [`BoardCorners::source`].
    pub fn find_corners(&self, img: &RgbImageView<'_>) -> Result<BoardCorners, ImageError> {
        img.validate()?;
        let gray = to_intensity(img);
        Ok(self.find_corners_gray(&gray.view()))
    }

    /// Find the board corners in an intensity field.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, gray), fields(width = gray.width, height = gray.height))
    )]
    pub fn find_corners_gray(&self, gray: &GrayImageView<'_>) -> BoardCorners {
        let fallback = |reason: FallbackReason| {
            warn!("board not found ({reason}), using default corners");
            BoardCorners {
                points: default_corners(gray.width, gray.height),
                source: CornerSource::Fallback(reason),
            }
        };

        let borders = match self.find_borders(gray) {
            Ok(b) => b,
            Err(reason) => return fallback(reason),
        };

        match borders.corners() {
            Some(points) => {
                debug!("board corners {:?}", points.map(|p| (p.x, p.y)));
                BoardCorners {
                    points,
                    source: CornerSource::Detected,
                }
            }
            None => fallback(FallbackReason::NoIntersection),
        }
    }

    /// Run edges, Hough voting, clustering and refinement down to the four
    /// border lines.
    pub fn find_borders(&self, gray: &GrayImageView<'_>) -> Result<BorderLines, FallbackReason> {
        let p = &self.params;
        let grad = sobel(gray);

        let lines = detect_lines(&grad, &p.hough);
        if lines.len() < p.min_lines {
            return Err(FallbackReason::TooFewLines { found: lines.len() });
        }

        let split = split_by_axis(&lines, gray.width, gray.height, &p.cluster);
        debug!(
            "{} lines: {} horizontal, {} vertical",
            lines.len(),
            split.horizontal.len(),
            split.vertical.len()
        );
        if split.horizontal.len() < 2 || split.vertical.len() < 2 {
            return Err(FallbackReason::TooFewAxisLines {
                horizontal: split.horizontal.len(),
                vertical: split.vertical.len(),
            });
        }

        let horizontal = self.cluster(&split.horizontal, gray.height);
        let vertical = self.cluster(&split.vertical, gray.width);
        debug!(
            "after clustering: {} horizontal, {} vertical",
            horizontal.len(),
            vertical.len()
        );

        let too_few = || FallbackReason::TooFewClusteredLines {
            horizontal: horizontal.len(),
            vertical: vertical.len(),
        };
        if horizontal.len() < 2 || vertical.len() < 2 {
            return Err(too_few());
        }
        let rows = select_border_pair(&horizontal, &p.cluster).ok_or_else(too_few)?;
        let cols = select_border_pair(&vertical, &p.cluster).ok_or_else(too_few)?;

        let refine = |l: &AxisLine| refine_line(&l.line, &grad, &p.refine);
        Ok(BorderLines {
            top: refine(&rows.near),
            bottom: refine(&rows.far),
            left: refine(&cols.near),
            right: refine(&cols.far),
        })
    }

    fn cluster(&self, lines: &[AxisLine], extent: usize) -> Vec<AxisLine> {
        let c = &self.params.cluster;
        let merged = merge_by_position(lines, c.merge_distance_px);
        filter_isolated(&merged, extent as f64 * c.isolation_fraction)
    }
}

/// Find board corners with default parameters.
pub fn find_corners(img: &RgbImageView<'_>) -> Result<BoardCorners, ImageError> {
    BoardFinder::default().find_corners(img)
}
