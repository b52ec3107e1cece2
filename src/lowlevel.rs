//! Low-level building blocks for custom compile pipelines.
//!
//! These expose the built-in collaborators, the detector pool and the
//! luminosity backends for callers wiring their own [`CompilerBuilder`].
//! Most users should prefer [`Compiler::standard`].
//!
//! [`CompilerBuilder`]: crate::CompilerBuilder
//! [`Compiler::standard`]: crate::Compiler::standard

pub use crate::cluster::{MedoidClusterBuilder, MedoidClusterConfig};
pub use crate::compile::{NoSuspend, Suspend, ThreadYield};
pub use crate::detect::{
    partition_by_sign, ExtremaDetector, ExtremaDetectorConfig, ExtremaDetectorFactory,
};
pub use crate::image::pyramid::{resample_level, PyramidConfig, ScalePyramid};
#[cfg(feature = "rayon")]
pub use crate::image::ParallelLuma;
pub use crate::image::{luma_u8, LumaBackend, ScalarLuma, LUMA_WEIGHTS};
pub use crate::pool::{DetectorHandle, DetectorPool};
