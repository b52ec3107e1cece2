//! Luminosity reduction from RGBA surfaces to grayscale.
//!
//! Every backend implements the same fixed linear transform
//! `0.299 R + 0.587 G + 0.114 B`, rounded to nearest; alpha is ignored.

use crate::image::{GreyImage, Surface};
use crate::util::TargetIdxResult;

/// Channel weights applied to R, G and B.
pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Converts one RGB triple to its luminosity value.
#[inline]
pub fn luma_u8(r: u8, g: u8, b: u8) -> u8 {
    let value = LUMA_WEIGHTS[0] * f32::from(r)
        + LUMA_WEIGHTS[1] * f32::from(g)
        + LUMA_WEIGHTS[2] * f32::from(b);
    value.round().clamp(0.0, 255.0) as u8
}

/// Numeric backend that performs the luminosity transform.
pub trait LumaBackend: Send + Sync {
    /// Reduces an RGBA surface to a grayscale image.
    fn to_grey(&self, surface: &Surface) -> TargetIdxResult<GreyImage>;
}

/// Single-threaded reference backend.
#[derive(Copy, Clone, Debug, Default)]
pub struct ScalarLuma;

impl LumaBackend for ScalarLuma {
    fn to_grey(&self, surface: &Surface) -> TargetIdxResult<GreyImage> {
        let data = surface
            .data()
            .chunks_exact(4)
            .map(|px| luma_u8(px[0], px[1], px[2]))
            .collect();
        GreyImage::new(data, surface.width(), surface.height())
    }
}

/// Row-parallel backend; output is bit-identical to [`ScalarLuma`].
#[cfg(feature = "rayon")]
#[derive(Copy, Clone, Debug, Default)]
pub struct ParallelLuma;

#[cfg(feature = "rayon")]
impl LumaBackend for ParallelLuma {
    fn to_grey(&self, surface: &Surface) -> TargetIdxResult<GreyImage> {
        use rayon::prelude::*;

        let width = surface.width();
        let mut data = vec![0u8; width * surface.height()];
        data.par_chunks_mut(width)
            .zip(surface.data().par_chunks(width * 4))
            .for_each(|(dst, src)| {
                for (out, px) in dst.iter_mut().zip(src.chunks_exact(4)) {
                    *out = luma_u8(px[0], px[1], px[2]);
                }
            });
        GreyImage::new(data, width, surface.height())
    }
}
