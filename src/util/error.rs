//! Error types for targetidx.

use thiserror::Error;

/// Result alias for targetidx operations.
pub type TargetIdxResult<T> = std::result::Result<T, TargetIdxError>;

/// Errors that can occur while compiling, serializing or filtering.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum TargetIdxError {
    /// Image dimensions are zero or overflow.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// The pixel buffer is shorter than the dimensions require.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// The input data or parameters are invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// `compile` was called without any target image.
    #[error("no target images to compile")]
    EmptyTargetSet,
    /// A required pipeline component or lifecycle hook was not supplied.
    #[error("pipeline is missing required component `{component}`")]
    MissingComponent { component: &'static str },
    /// `compile` was called a second time on the same compiler.
    #[error("compiler already ran; create a new compiler for another compile call")]
    AlreadyCompiled,
    /// Export was requested before anything was compiled or imported.
    #[error("no compiled data available")]
    NotCompiled,
    /// Detection, clustering or tracking assembly failed for one target.
    #[error("target {target} failed: {reason}")]
    TargetFailed { target: usize, reason: String },
    /// The detector pool was released while a handle was still held.
    #[error("detector for {width}x{height} is still in use")]
    PoolInUse { width: usize, height: usize },
    /// The bundle was written by a different format version.
    #[error("bundle format version {found} does not match supported version {expected}")]
    VersionMismatch { expected: u32, found: u32 },
    /// The bundle bytes are not a valid bundle.
    #[error("invalid bundle: {reason}")]
    InvalidBundle { reason: String },
    /// Encoding the bundle payload failed.
    #[error("bundle encoding failed: {reason}")]
    Encode { reason: String },
    /// A filter input vector changed dimensionality.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    /// Filter parameters are out of range.
    #[error("invalid filter config: {0}")]
    InvalidFilterConfig(&'static str),
    /// Image decoding failed.
    #[cfg(feature = "image-io")]
    #[error("image io error: {reason}")]
    ImageIo { reason: String },
}
