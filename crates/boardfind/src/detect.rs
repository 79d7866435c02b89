use crate::board::{
    self, BoardCorners, BoardFinder, BoardFinderParams, CameraModel, PartitionParams, PointScan,
    RectifyError, ScanError,
};
use crate::core::{self, ImageError};
use crate::io::SquaresReport;
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

const MARK_COLOR: ::image::Rgb<u8> = ::image::Rgb([255, 0, 0]);
const CIRCLE_RADIUS: f64 = 10.0;
const CROSS_HALF: i32 = 15;

/// Errors produced by the high-level facade helpers.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Rectify(#[from] RectifyError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("rectified raster does not fit an image buffer ({size}x{size})")]
    RectifiedBuffer { size: usize },
}

/// Convert an `image::RgbImage` into the lightweight `boardfind-core` view type.
pub fn rgb_view(img: &::image::RgbImage) -> core::RgbImageView<'_> {
    core::RgbImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Locate the board in a decoded image of any pixel format.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(img, params), fields(width = img.width(), height = img.height()))
)]
pub fn find_board(
    img: &::image::DynamicImage,
    params: &BoardFinderParams,
) -> Result<BoardCorners, DetectError> {
    let rgb = img.to_rgb8();
    Ok(BoardFinder::new(params.clone()).find_corners(&rgb_view(&rgb))?)
}

/// Warp the board quadrilateral to a `size`×`size` image.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(img, corners), fields(size = size))
)]
pub fn rectify_board(
    img: &::image::RgbImage,
    corners: &BoardCorners,
    size: usize,
) -> Result<::image::RgbImage, DetectError> {
    let rect = board::rectify(&rgb_view(img), &corners.points, size)?;
    ::image::RgbImage::from_raw(size as u32, size as u32, rect.image.data)
        .ok_or(DetectError::RectifiedBuffer { size })
}

/// Find the board, then split it into squares and classify each one from
/// the point scan.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(points = scan.len()))
)]
pub fn classify_board(
    img: &::image::RgbImage,
    scan: &PointScan,
    camera: &CameraModel,
    finder: &BoardFinderParams,
    partition: &PartitionParams,
) -> Result<SquaresReport, DetectError> {
    let corners = BoardFinder::new(finder.clone()).find_corners(&rgb_view(img))?;
    let squares = board::partition_squares(&corners.points, scan, camera, partition)?;
    Ok(SquaresReport { corners, squares })
}

/// Mark each corner with a red circle and cross.
pub fn annotate_corners(img: &mut ::image::RgbImage, corners: &BoardCorners) {
    for p in corners.points {
        draw_circle(img, p, CIRCLE_RADIUS);
        draw_cross(img, p, CROSS_HALF);
    }
}

fn put_checked(img: &mut ::image::RgbImage, x: i32, y: i32) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, MARK_COLOR);
    }
}

// One sample per degree, truncated towards zero.
fn draw_circle(img: &mut ::image::RgbImage, c: Point2<i32>, radius: f64) {
    for deg in 0..360 {
        let (s, co) = (deg as f64).to_radians().sin_cos();
        let x = c.x + (radius * co) as i32;
        let y = c.y + (radius * s) as i32;
        put_checked(img, x, y);
    }
}

fn draw_cross(img: &mut ::image::RgbImage, c: Point2<i32>, half: i32) {
    for d in -half..=half {
        put_checked(img, c.x + d, c.y);
        put_checked(img, c.x, c.y + d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{default_corners, CornerSource, PinholeIntrinsics, ScanPoint};
    use nalgebra::Point3;

    fn gray_canvas(w: u32, h: u32, v: u8) -> ::image::RgbImage {
        ::image::RgbImage::from_pixel(w, h, ::image::Rgb([v, v, v]))
    }

    #[test]
    fn blank_photo_falls_back() {
        let img = ::image::DynamicImage::ImageRgb8(gray_canvas(200, 120, 90));
        let corners = find_board(&img, &BoardFinderParams::default()).expect("valid");
        assert_eq!(corners.points, default_corners(200, 120));
        assert!(matches!(corners.source, CornerSource::Fallback(_)));
    }

    #[test]
    fn rectified_image_is_square() {
        let img = gray_canvas(160, 90, 40);
        let corners = BoardCorners {
            points: default_corners(160, 90),
            source: CornerSource::Detected,
        };
        let out = rectify_board(&img, &corners, 64).expect("rectify");
        assert_eq!(out.dimensions(), (64, 64));
        assert_eq!(out.get_pixel(32, 32).0, [40, 40, 40]);
    }

    #[test]
    fn annotation_marks_circle_and_cross_within_bounds() {
        let mut img = gray_canvas(100, 100, 0);
        let corners = BoardCorners {
            points: [
                Point2::new(5, 5),
                Point2::new(50, 5),
                Point2::new(50, 50),
                Point2::new(5, 50),
            ],
            source: CornerSource::Detected,
        };
        annotate_corners(&mut img, &corners);

        assert_eq!(img.get_pixel(60, 50).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(50, 35).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(65, 50).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(0, 5).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(70, 70).0, [0, 0, 0]);
    }

    #[test]
    fn classify_board_reports_all_squares() {
        let img = gray_canvas(320, 240, 100);
        let camera = CameraModel::new(PinholeIntrinsics {
            width: 320,
            height: 240,
            fx: 300.0,
            fy: 300.0,
            ppx: 160.0,
            ppy: 120.0,
        });
        let scan = PointScan::new(vec![ScanPoint::new(Point3::new(10.0, 10.0, 800.0), None)]);
        let report = classify_board(
            &img,
            &scan,
            &camera,
            &BoardFinderParams::default(),
            &PartitionParams::default(),
        )
        .expect("classify");
        assert_eq!(report.squares.len(), 64);
        assert!(!report.corners.is_detected());
        assert_eq!(report.squares.iter().map(|s| s.point_count()).sum::<usize>(), 1);
    }
}
