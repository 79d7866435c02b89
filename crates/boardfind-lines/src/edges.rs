//! Sobel gradients with an 8-bit clipped magnitude.
//!
//! - Convolves the 3×3 Sobel pair over interior pixels; the one-pixel image
//!   border keeps `gx = gy = mag = 0`.
//! - `mag = clamp(round(sqrt(gx² + gy²)), 0, 255)`.
//!
//! Rows are independent, so the pass parallelises per row with `rayon`.

use boardfind_core::{wrap_theta, GrayImageView};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Per-pixel gradient buffers, row-major.
#[derive(Clone, Debug)]
pub struct GradientField {
    pub width: usize,
    pub height: usize,
    /// Horizontal derivative.
    pub gx: Vec<i32>,
    /// Vertical derivative.
    pub gy: Vec<i32>,
    /// Clipped magnitude.
    pub mag: Vec<u8>,
}

impl GradientField {
    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn magnitude(&self, x: usize, y: usize) -> u8 {
        self.mag[self.idx(x, y)]
    }

    /// Gradient direction folded into `[0, π)`.
    #[inline]
    pub fn direction(&self, x: usize, y: usize) -> f64 {
        let i = self.idx(x, y);
        wrap_theta((self.gy[i] as f64).atan2(self.gx[i] as f64))
    }

    /// Number of pixels whose magnitude reaches `threshold`.
    pub fn count_edges(&self, threshold: u8) -> usize {
        self.mag.iter().filter(|&&m| m >= threshold).count()
    }
}

/// Run the Sobel operator over an intensity field.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(src), fields(width = src.width, height = src.height))
)]
pub fn sobel(src: &GrayImageView<'_>) -> GradientField {
    let w = src.width;
    let h = src.height;
    let mut gx = vec![0i32; w * h];
    let mut gy = vec![0i32; w * h];
    let mut mag = vec![0u8; w * h];

    if w < 3 || h < 3 {
        return GradientField {
            width: w,
            height: h,
            gx,
            gy,
            mag,
        };
    }

    let px = |x: usize, y: usize| src.data[y * w + x] as i32;

    type Rows<'r> = (usize, ((&'r mut [i32], &'r mut [i32]), &'r mut [u8]));
    let fill_row = |(y, ((row_gx, row_gy), row_mag)): Rows<'_>| {
        if y == 0 || y == h - 1 {
            return;
        }
        for x in 1..w - 1 {
            let gx = -px(x - 1, y - 1) + px(x + 1, y - 1) - 2 * px(x - 1, y) + 2 * px(x + 1, y)
                - px(x - 1, y + 1)
                + px(x + 1, y + 1);
            let gy = -px(x - 1, y - 1) - 2 * px(x, y - 1) - px(x + 1, y - 1)
                + px(x - 1, y + 1)
                + 2 * px(x, y + 1)
                + px(x + 1, y + 1);

            let m = ((gx * gx + gy * gy) as f64).sqrt().round();
            row_gx[x] = gx;
            row_gy[x] = gy;
            row_mag[x] = m.min(255.0) as u8;
        }
    };

    #[cfg(feature = "rayon")]
    gx.par_chunks_mut(w)
        .zip(gy.par_chunks_mut(w))
        .zip(mag.par_chunks_mut(w))
        .enumerate()
        .for_each(fill_row);
    #[cfg(not(feature = "rayon"))]
    gx.chunks_mut(w)
        .zip(gy.chunks_mut(w))
        .zip(mag.chunks_mut(w))
        .enumerate()
        .for_each(fill_row);

    GradientField {
        width: w,
        height: h,
        gx,
        gy,
        mag,
    }
}
