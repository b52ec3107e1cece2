//! Convenience helpers for loading target images via the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::image::{PixelFormat, TargetImage};
use crate::util::{TargetIdxError, TargetIdxResult};
use std::path::Path;

/// Creates an RGBA target image from a decoded `image` buffer.
pub fn target_from_rgba_image(img: &::image::RgbaImage) -> TargetIdxResult<TargetImage> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    TargetImage::new(img.as_raw().clone(), width, height, PixelFormat::Rgba)
}

/// Creates a target image from a dynamic image, keeping single-channel inputs gray.
pub fn target_from_dynamic_image(img: &::image::DynamicImage) -> TargetIdxResult<TargetImage> {
    match img {
        ::image::DynamicImage::ImageLuma8(gray) => TargetImage::new(
            gray.as_raw().clone(),
            gray.width() as usize,
            gray.height() as usize,
            PixelFormat::Gray,
        ),
        other => target_from_rgba_image(&other.to_rgba8()),
    }
}

/// Loads an image from disk as a target image.
pub fn load_target_image<P: AsRef<Path>>(path: P) -> TargetIdxResult<TargetImage> {
    let img = ::image::open(path).map_err(|err| TargetIdxError::ImageIo {
        reason: err.to_string(),
    })?;
    target_from_dynamic_image(&img)
}
