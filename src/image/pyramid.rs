//! Scale pyramids for matching and tracking.
//!
//! The matching pyramid covers many fine scale steps so features can be
//! recognized at any distance; the tracking pyramid holds a couple of fixed
//! working resolutions. Both are produced by a [`PyramidBuilder`]; the
//! built-in [`ScalePyramid`] resamples bilinearly.

use crate::image::{GreyImage, ImageView};
use crate::util::math::scaled_dim;
use crate::util::{TargetIdxError, TargetIdxResult};
use serde::{Deserialize, Serialize};

/// One re-scaled version of a grayscale image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PyramidLevel {
    /// Scale relative to the base image (1.0 is full resolution).
    pub scale: f32,
    /// Level width in pixels.
    pub width: usize,
    /// Level height in pixels.
    pub height: usize,
    /// Contiguous grayscale pixels.
    pub data: Vec<u8>,
}

impl PyramidLevel {
    /// Returns a borrowed view of the level pixels.
    pub fn view(&self) -> TargetIdxResult<ImageView<'_>> {
        ImageView::from_slice(&self.data, self.width, self.height)
    }
}

/// Decomposes a grayscale image into scale levels.
pub trait PyramidBuilder: Send + Sync {
    /// Levels used for feature detection, ordered largest first.
    fn build_matching_pyramid(&self, image: &GreyImage) -> TargetIdxResult<Vec<PyramidLevel>>;

    /// Levels kept for frame-to-frame tracking.
    fn build_tracking_pyramid(&self, image: &GreyImage) -> TargetIdxResult<Vec<PyramidLevel>>;
}

/// Configuration for [`ScalePyramid`].
#[derive(Clone, Debug)]
pub struct PyramidConfig {
    /// Short side, in pixels, of the smallest matching level.
    pub matching_min_dim: usize,
    /// Multiplicative step between consecutive matching scales.
    pub matching_scale_step: f32,
    /// Scales at or above this value snap to full resolution.
    pub matching_snap: f32,
    /// Short-side sizes, in pixels, of the tracking levels.
    pub tracking_sizes: Vec<usize>,
}

impl Default for PyramidConfig {
    fn default() -> Self {
        Self {
            matching_min_dim: 100,
            matching_scale_step: 2.0_f32.powf(1.0 / 3.0),
            matching_snap: 0.95,
            tracking_sizes: vec![256, 128],
        }
    }
}

/// Built-in pyramid builder with bilinear resampling.
#[derive(Clone, Debug, Default)]
pub struct ScalePyramid {
    cfg: PyramidConfig,
}

impl ScalePyramid {
    /// Creates a builder, rejecting steps that would never terminate.
    pub fn new(cfg: PyramidConfig) -> TargetIdxResult<Self> {
        if cfg.matching_scale_step.is_nan() || cfg.matching_scale_step <= 1.0 {
            return Err(TargetIdxError::InvalidInput("matching_scale_step must exceed 1"));
        }
        if cfg.matching_min_dim == 0 {
            return Err(TargetIdxError::InvalidInput("matching_min_dim must be positive"));
        }
        if cfg.tracking_sizes.iter().any(|&s| s == 0) {
            return Err(TargetIdxError::InvalidInput("tracking sizes must be positive"));
        }
        Ok(Self { cfg })
    }

    /// Returns the builder configuration.
    pub fn config(&self) -> &PyramidConfig {
        &self.cfg
    }

    /// Matching scales for an image with the given short side, largest first.
    pub fn matching_scales(&self, short_side: usize) -> Vec<f32> {
        let min_scale = (self.cfg.matching_min_dim as f32 / short_side as f32).min(1.0);
        let mut scales = Vec::new();
        let mut current = min_scale;
        while current < self.cfg.matching_snap {
            scales.push(current);
            current *= self.cfg.matching_scale_step;
        }
        scales.push(1.0);
        scales.reverse();
        scales
    }

    /// Tracking scales for an image with the given short side.
    pub fn tracking_scales(&self, short_side: usize) -> Vec<f32> {
        self.cfg
            .tracking_sizes
            .iter()
            .map(|&size| size as f32 / short_side as f32)
            .collect()
    }
}

impl PyramidBuilder for ScalePyramid {
    fn build_matching_pyramid(&self, image: &GreyImage) -> TargetIdxResult<Vec<PyramidLevel>> {
        let short_side = image.width().min(image.height());
        self.matching_scales(short_side)
            .into_iter()
            .map(|scale| resample_level(image.view(), scale))
            .collect()
    }

    fn build_tracking_pyramid(&self, image: &GreyImage) -> TargetIdxResult<Vec<PyramidLevel>> {
        let short_side = image.width().min(image.height());
        self.tracking_scales(short_side)
            .into_iter()
            .map(|scale| resample_level(image.view(), scale))
            .collect()
    }
}

/// Resamples `src` by `scale` with bilinear interpolation.
pub fn resample_level(src: ImageView<'_>, scale: f32) -> TargetIdxResult<PyramidLevel> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(TargetIdxError::InvalidInput("pyramid scale must be positive"));
    }
    let width = scaled_dim(src.width(), scale);
    let height = scaled_dim(src.height(), scale);
    if width == src.width() && height == src.height() {
        return Ok(PyramidLevel {
            scale,
            width,
            height,
            data: src.as_slice().to_vec(),
        });
    }

    let ratio_x = src.width() as f32 / width as f32;
    let ratio_y = src.height() as f32 / height as f32;
    let max_x = (src.width() - 1) as f32;
    let max_y = (src.height() - 1) as f32;
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        let sy = ((y as f32 + 0.5) * ratio_y - 0.5).clamp(0.0, max_y);
        let y0 = sy.floor();
        let fy = sy - y0;
        for x in 0..width {
            let sx = ((x as f32 + 0.5) * ratio_x - 0.5).clamp(0.0, max_x);
            let x0 = sx.floor();
            let fx = sx - x0;
            let (xi, yi) = (x0 as isize, y0 as isize);
            let a = f32::from(src.get_clamped(xi, yi));
            let b = f32::from(src.get_clamped(xi + 1, yi));
            let c = f32::from(src.get_clamped(xi, yi + 1));
            let d = f32::from(src.get_clamped(xi + 1, yi + 1));
            let top = a + (b - a) * fx;
            let bottom = c + (d - c) * fx;
            let value = top + (bottom - top) * fy;
            data.push(value.round().clamp(0.0, 255.0) as u8);
        }
    }

    Ok(PyramidLevel {
        scale,
        width,
        height,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_scales_descend_and_end_near_min_dim() {
        let pyramid = ScalePyramid::default();
        let scales = pyramid.matching_scales(800);
        assert_eq!(scales[0], 1.0);
        for pair in scales.windows(2) {
            assert!(pair[0] > pair[1]);
        }
        let last = *scales.last().unwrap();
        assert!((last - 100.0 / 800.0).abs() < 1e-6);
        assert_eq!(scales.len(), 10);
    }

    #[test]
    fn small_images_get_a_single_matching_level() {
        let pyramid = ScalePyramid::default();
        assert_eq!(pyramid.matching_scales(64), vec![1.0]);
    }

    #[test]
    fn tracking_scales_follow_sizes() {
        let pyramid = ScalePyramid::default();
        assert_eq!(pyramid.tracking_scales(512), vec![0.5, 0.25]);
    }

    #[test]
    fn rejects_non_growing_step() {
        let cfg = PyramidConfig {
            matching_scale_step: 1.0,
            ..PyramidConfig::default()
        };
        assert!(ScalePyramid::new(cfg).is_err());
    }

    #[test]
    fn resample_keeps_constant_images_constant() {
        let img = GreyImage::new(vec![77; 40 * 30], 40, 30).unwrap();
        let level = resample_level(img.view(), 0.5).unwrap();
        assert_eq!((level.width, level.height), (20, 15));
        assert!(level.data.iter().all(|&v| v == 77));

        let up = resample_level(img.view(), 2.0).unwrap();
        assert_eq!((up.width, up.height), (80, 60));
        assert!(up.data.iter().all(|&v| v == 77));
    }

    #[test]
    fn unit_scale_copies_pixels() {
        let data: Vec<u8> = (0u8..12).collect();
        let img = GreyImage::new(data.clone(), 4, 3).unwrap();
        let level = resample_level(img.view(), 1.0).unwrap();
        assert_eq!(level.data, data);
    }
}
