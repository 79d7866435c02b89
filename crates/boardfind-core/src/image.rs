//! Lightweight raster types shared by every stage.
//!
//! Images are plain row-major byte buffers so that callers can wrap
//! decoder output without copying. Color rasters are interleaved RGB.

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Errors raised when a caller hands in a malformed raster.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("image is empty (width={width}, height={height})")]
    Empty { width: usize, height: usize },
    #[error("invalid buffer length (expected {expected} bytes, got {got})")]
    BufferLength { expected: usize, got: usize },
}

#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

/// Single-channel intensity field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }
}

impl<'a> GrayImageView<'a> {
    /// Wrap a raw buffer, checking that its length matches the dimensions.
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Result<Self, ImageError> {
        check_dims(width, height, data.len(), 1)?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }
}

/// Borrowed interleaved RGB raster.
#[derive(Clone, Copy, Debug)]
pub struct RgbImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h*3
}

/// Owned interleaved RGB raster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl RgbImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height * 3],
        }
    }

    pub fn view(&self) -> RgbImageView<'_> {
        RgbImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> [u8; 3] {
        self.view().get(x, y)
    }

    #[inline]
    pub fn put(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        let i = (y * self.width + x) * 3;
        self.data[i..i + 3].copy_from_slice(&rgb);
    }
}

impl<'a> RgbImageView<'a> {
    /// Wrap a raw interleaved buffer, checking that its length matches the dimensions.
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Result<Self, ImageError> {
        check_dims(width, height, data.len(), 3)?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Reject empty or inconsistent views before running a pipeline on them.
    pub fn validate(&self) -> Result<(), ImageError> {
        check_dims(self.width, self.height, self.data.len(), 3)
    }
}

fn check_dims(width: usize, height: usize, len: usize, channels: usize) -> Result<(), ImageError> {
    if width == 0 || height == 0 {
        return Err(ImageError::Empty { width, height });
    }
    let expected = width * height * channels;
    if len != expected {
        return Err(ImageError::BufferLength { expected, got: len });
    }
    Ok(())
}

/// Convert a color raster into an intensity field using the unweighted
/// integer mean of the three channels.
pub fn to_intensity(src: &RgbImageView<'_>) -> GrayImage {
    let w = src.width;
    let mut out = GrayImage::new(w, src.height);
    if w == 0 {
        return out;
    }

    let convert_row = |(row, dst): (&[u8], &mut [u8])| {
        for (px, d) in row.chunks_exact(3).zip(dst.iter_mut()) {
            *d = ((px[0] as u16 + px[1] as u16 + px[2] as u16) / 3) as u8;
        }
    };

    #[cfg(feature = "rayon")]
    src.data
        .par_chunks(w * 3)
        .zip(out.data.par_chunks_mut(w))
        .for_each(convert_row);
    #[cfg(not(feature = "rayon"))]
    src.data
        .chunks(w * 3)
        .zip(out.data.chunks_mut(w))
        .for_each(convert_row);

    out
}

/// Bilinear RGB sample with edge clamping. Points outside the raster by
/// more than half a pixel read as black.
#[inline]
pub fn sample_bilinear_rgb(src: &RgbImageView<'_>, x: f32, y: f32) -> [u8; 3] {
    let max_x = (src.width - 1) as f32;
    let max_y = (src.height - 1) as f32;
    if x < -0.5 || y < -0.5 || x > max_x + 0.5 || y > max_y + 0.5 {
        return [0, 0, 0];
    }
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(src.width - 1);
    let y1 = (y0 + 1).min(src.height - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = src.get(x0, y0);
    let p10 = src.get(x1, y0);
    let p01 = src.get(x0, y1);
    let p11 = src.get(x1, y1);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let a = p00[c] as f32 + fx * (p10[c] as f32 - p00[c] as f32);
        let b = p01[c] as f32 + fx * (p11[c] as f32 - p01[c] as f32);
        out[c] = (a + fy * (b - a)).round().clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intensity_is_channel_mean() {
        let data = [255, 0, 0, 10, 20, 30, 255, 255, 255, 0, 0, 1];
        let view = RgbImageView::new(2, 2, &data).expect("valid view");
        let gray = to_intensity(&view);
        assert_eq!(gray.data, vec![85, 20, 255, 0]);
    }

    #[test]
    fn rejects_bad_buffers() {
        assert_eq!(
            RgbImageView::new(2, 2, &[0u8; 11]).unwrap_err(),
            ImageError::BufferLength {
                expected: 12,
                got: 11
            }
        );
        assert!(matches!(
            GrayImageView::new(0, 3, &[]),
            Err(ImageError::Empty { .. })
        ));
    }

    #[test]
    fn rgb_sampling_interpolates_and_clamps() {
        let mut img = RgbImage::new(2, 1);
        img.put(0, 0, [0, 100, 200]);
        img.put(1, 0, [100, 100, 0]);
        let v = img.view();
        assert_eq!(sample_bilinear_rgb(&v, 0.5, 0.0), [50, 100, 100]);
        assert_eq!(sample_bilinear_rgb(&v, 1.3, 0.2), [100, 100, 0]);
        assert_eq!(sample_bilinear_rgb(&v, 5.0, 0.0), [0, 0, 0]);
    }
}
