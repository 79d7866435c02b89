use boardfind_core::{
    homography_from_4pt, warp_perspective_rgb, Homography, ImageError, RgbImage, RgbImageView,
};
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Default side length of the rectified canvas.
pub const DEFAULT_RECTIFIED_SIZE: usize = 800;

#[derive(thiserror::Error, Debug)]
pub enum RectifyError {
    #[error("rectified size must be positive")]
    ZeroSize,
    #[error("homography estimation failed")]
    HomographyFailed,
    #[error("homography not invertible")]
    NonInvertible,
    #[error(transparent)]
    Image(#[from] ImageError),
}

/// Square top-down view of the board.
///
/// Canvas corners `(0,0)`, `(N−1,0)`, `(N−1,N−1)`, `(0,N−1)` correspond to
/// the TL, TR, BR, BL board corners of the source image.
#[derive(Clone, Debug)]
pub struct RectifiedBoard {
    pub image: RgbImage,
    pub size: usize,
    pub h_img_from_rect: Homography,
    pub h_rect_from_img: Homography,
}

impl RectifiedBoard {
    /// Map a rectified-canvas point back into the source image.
    pub fn to_image(&self, p: Point2<f32>) -> Point2<f32> {
        self.h_img_from_rect.apply(p)
    }

    /// Map a source-image point into the rectified canvas.
    pub fn to_rect(&self, p: Point2<f32>) -> Point2<f32> {
        self.h_rect_from_img.apply(p)
    }
}

fn canvas_corners(size: usize) -> [Point2<f32>; 4] {
    let m = (size - 1) as f32;
    [
        Point2::new(0.0, 0.0),
        Point2::new(m, 0.0),
        Point2::new(m, m),
        Point2::new(0.0, m),
    ]
}

/// Warp the quadrilateral `corners` (TL, TR, BR, BL) of `src` onto a
/// `size`×`size` canvas with bilinear sampling.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(src, corners), fields(width = src.width, height = src.height))
)]
pub fn rectify(
    src: &RgbImageView<'_>,
    corners: &[Point2<i32>; 4],
    size: usize,
) -> Result<RectifiedBoard, RectifyError> {
    if size == 0 {
        return Err(RectifyError::ZeroSize);
    }
    src.validate()?;

    let dst = corners.map(|p| Point2::new(p.x as f32, p.y as f32));
    let h_img_from_rect = if size == 1 {
        // A single-pixel canvas has no extent; sample the TL corner.
        Homography::new(nalgebra::Matrix3::new(
            1.0, 0.0, dst[0].x as f64, //
            0.0, 1.0, dst[0].y as f64, //
            0.0, 0.0, 1.0,
        ))
    } else {
        homography_from_4pt(&canvas_corners(size), &dst).ok_or(RectifyError::HomographyFailed)?
    };
    let h_rect_from_img = h_img_from_rect
        .inverse()
        .ok_or(RectifyError::NonInvertible)?;

    let image = warp_perspective_rgb(src, h_img_from_rect, size, size);

    Ok(RectifiedBoard {
        image,
        size,
        h_img_from_rect,
        h_rect_from_img,
    })
}
