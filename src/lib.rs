//! Targetidx compiles reference images into a versioned matching index and
//! provides the adaptive smoothing filter used when tracking them.
//!
//! The compile path is `TargetImage` → grayscale → matching and tracking
//! pyramids → per-level feature detection → per-sign clustering trees →
//! [`CompiledTarget`] records, which [`bundle`] serializes. Detector,
//! pyramid and clustering algorithms sit behind traits; built-in
//! implementations are provided for each. Target tasks run in parallel with
//! the `rayon` feature.

pub mod bundle;
pub mod cluster;
pub mod compile;
pub mod detect;
pub mod filter;
pub mod image;
pub mod lowlevel;
pub mod pool;
pub mod record;
mod trace;
pub mod util;

#[cfg(feature = "image-io")]
pub use crate::image::io;

pub use crate::image::pyramid::{PyramidBuilder, PyramidLevel};
pub use crate::image::{GreyImage, PixelFormat, Surface, TargetImage};
pub use bundle::{CompiledBundle, Imported, VersionSkip, CURRENT_VERSION};
pub use cluster::{ClusterIndexBuilder, ClusterNode, ClusterTree};
pub use compile::{
    CompileConfig, Compiler, CompilerBuilder, StandardHooks, SurfaceHook, TrackingHook,
};
pub use detect::{DetectorFactory, ExtremumSign, FeatureDetector, FeaturePoint};
pub use filter::{FilterConfig, OneEuroFilter};
pub use record::{CompiledTarget, MatchingLevel, MatchingRecord, TargetDims, TrackingRecord};
pub use util::{TargetIdxError, TargetIdxResult};
