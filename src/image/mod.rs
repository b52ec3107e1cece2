//! Target images, grayscale buffers and borrowed views.
//!
//! A [`TargetImage`] is the caller's reference image in one of the supported
//! pixel layouts. The surface hook normalizes it to an RGBA [`Surface`], and
//! a [`LumaBackend`] reduces that surface to a single-channel [`GreyImage`]
//! which feeds pyramid construction.

use crate::util::{TargetIdxError, TargetIdxResult};

#[cfg(feature = "image-io")]
pub mod io;
mod luma;
pub mod pyramid;

#[cfg(feature = "rayon")]
pub use luma::ParallelLuma;
pub use luma::{luma_u8, LumaBackend, ScalarLuma, LUMA_WEIGHTS};

/// Channel layout of a target image buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// One byte per pixel.
    Gray,
    /// Three bytes per pixel, R G B.
    Rgb,
    /// Four bytes per pixel, R G B A.
    Rgba,
}

impl PixelFormat {
    /// Number of bytes per pixel.
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray => 1,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// One reference image supplied by the caller.
#[derive(Clone, Debug)]
pub struct TargetImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
    format: PixelFormat,
}

impl TargetImage {
    /// Creates a target image, validating the buffer length against the layout.
    pub fn new(
        data: Vec<u8>,
        width: usize,
        height: usize,
        format: PixelFormat,
    ) -> TargetIdxResult<Self> {
        let needed = pixel_count(width, height)?
            .checked_mul(format.channels())
            .ok_or(TargetIdxError::InvalidDimensions { width, height })?;
        if data.len() < needed {
            return Err(TargetIdxError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(TargetIdxError::InvalidInput("pixel buffer longer than dimensions"));
        }
        Ok(Self {
            data,
            width,
            height,
            format,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the pixel layout.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Returns the raw pixel buffer.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// RGBA drawing surface produced by the surface-preparation hook.
#[derive(Clone, Debug)]
pub struct Surface {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl Surface {
    /// Creates a surface from an RGBA buffer of exactly `width * height * 4` bytes.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> TargetIdxResult<Self> {
        let needed = pixel_count(width, height)?
            .checked_mul(4)
            .ok_or(TargetIdxError::InvalidDimensions { width, height })?;
        if data.len() != needed {
            return Err(TargetIdxError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Expands any supported target layout into RGBA with opaque alpha.
    pub fn from_target(image: &TargetImage) -> TargetIdxResult<Self> {
        let src = image.data();
        let data = match image.format() {
            PixelFormat::Rgba => src.to_vec(),
            PixelFormat::Rgb => src
                .chunks_exact(3)
                .flat_map(|px| [px[0], px[1], px[2], 255])
                .collect(),
            PixelFormat::Gray => src.iter().flat_map(|&v| [v, v, v, 255]).collect(),
        };
        Self::new(data, image.width(), image.height())
    }

    /// Returns the surface width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the surface height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the RGBA buffer.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Owned contiguous single-channel image.
#[derive(Clone, Debug, PartialEq)]
pub struct GreyImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl GreyImage {
    /// Creates a grayscale image from a buffer of exactly `width * height` bytes.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> TargetIdxResult<Self> {
        let needed = pixel_count(width, height)?;
        if data.len() < needed {
            return Err(TargetIdxError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(TargetIdxError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the contiguous pixel buffer.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the image and returns its buffer.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Returns a borrowed view of the image.
    pub fn view(&self) -> ImageView<'_> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
        }
    }
}

/// Borrowed contiguous grayscale view.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
}

impl<'a> ImageView<'a> {
    /// Creates a view over `data`, which must hold at least `width * height` bytes.
    pub fn from_slice(data: &'a [u8], width: usize, height: usize) -> TargetIdxResult<Self> {
        let needed = pixel_count(width, height)?;
        if data.len() < needed {
            return Err(TargetIdxError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data: &data[..needed],
            width,
            height,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the backing slice.
    pub fn as_slice(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the pixel at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    /// Returns the pixel at `(x, y)` with coordinates clamped to the border.
    #[inline]
    pub fn get_clamped(&self, x: isize, y: isize) -> u8 {
        let cx = x.clamp(0, self.width as isize - 1) as usize;
        let cy = y.clamp(0, self.height as isize - 1) as usize;
        self.data[cy * self.width + cx]
    }

    /// Returns row `y`.
    pub fn row(&self, y: usize) -> Option<&'a [u8]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.width;
        self.data.get(start..start + self.width)
    }
}

pub(crate) fn pixel_count(width: usize, height: usize) -> TargetIdxResult<usize> {
    if width == 0 || height == 0 {
        return Err(TargetIdxError::InvalidDimensions { width, height });
    }
    width
        .checked_mul(height)
        .ok_or(TargetIdxError::InvalidDimensions { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_image_validates_buffer() {
        let err = TargetImage::new(vec![0; 5], 2, 1, PixelFormat::Rgb).unwrap_err();
        assert_eq!(err, TargetIdxError::BufferTooSmall { needed: 6, got: 5 });

        let err = TargetImage::new(vec![], 0, 4, PixelFormat::Gray).unwrap_err();
        assert_eq!(
            err,
            TargetIdxError::InvalidDimensions {
                width: 0,
                height: 4
            }
        );
    }

    #[test]
    fn surface_expands_rgb_and_gray() {
        let rgb = TargetImage::new(vec![1, 2, 3, 4, 5, 6], 2, 1, PixelFormat::Rgb).unwrap();
        let surface = Surface::from_target(&rgb).unwrap();
        assert_eq!(surface.data(), &[1, 2, 3, 255, 4, 5, 6, 255]);

        let gray = TargetImage::new(vec![9], 1, 1, PixelFormat::Gray).unwrap();
        let surface = Surface::from_target(&gray).unwrap();
        assert_eq!(surface.data(), &[9, 9, 9, 255]);
    }

    #[test]
    fn view_clamps_border_reads() {
        let img = GreyImage::new((0u8..6).collect(), 3, 2).unwrap();
        let view = img.view();
        assert_eq!(view.get_clamped(-1, -1), 0);
        assert_eq!(view.get_clamped(5, 0), 2);
        assert_eq!(view.get_clamped(1, 7), 4);
        assert_eq!(view.row(1).unwrap(), &[3, 4, 5]);
        assert!(view.get(3, 0).is_none());
    }
}
