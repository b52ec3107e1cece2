//! Feature points and the detector contract.
//!
//! A [`FeatureDetector`] turns one pyramid level into feature points, each
//! tagged with an [`ExtremumSign`]. Detectors are created per level size by a
//! [`DetectorFactory`] and shared through the session pool, so `detect` takes
//! `&self`: a detector must not carry state from one call into the next.

mod extrema;

pub use extrema::{ExtremaDetector, ExtremaDetectorConfig, ExtremaDetectorFactory};

use crate::image::pyramid::PyramidLevel;
use crate::util::TargetIdxResult;
use serde::{Deserialize, Serialize};

/// Whether a point is a local maximum or minimum of the detector response.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtremumSign {
    Maxima,
    Minima,
}

/// One detected interest point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeaturePoint {
    /// X coordinate in base-image pixels.
    pub x: f32,
    /// Y coordinate in base-image pixels.
    pub y: f32,
    /// Scale of the pyramid level the point was found on.
    pub scale: f32,
    /// Dominant orientation in radians.
    pub angle: f32,
    /// Extremum sign of the response.
    pub sign: ExtremumSign,
    /// Packed binary descriptor.
    pub descriptor: Vec<u32>,
}

/// Detects feature points on a single pyramid level.
pub trait FeatureDetector: Send + Sync {
    /// Detects points on `level`. Repeated calls with the same level return
    /// the same points.
    fn detect(&self, level: &PyramidLevel) -> TargetIdxResult<Vec<FeaturePoint>>;

    /// Releases native resources. Called once when the pool is torn down.
    fn dispose(&self) {}
}

/// Constructs detectors sized for one level resolution.
pub trait DetectorFactory: Send + Sync {
    type Detector: FeatureDetector;

    /// Creates a detector for levels of exactly `width x height` pixels.
    fn create(&self, width: usize, height: usize) -> TargetIdxResult<Self::Detector>;
}

/// Splits points into `(maxima, minima)`, preserving detection order.
pub fn partition_by_sign(points: Vec<FeaturePoint>) -> (Vec<FeaturePoint>, Vec<FeaturePoint>) {
    points
        .into_iter()
        .partition(|point| point.sign == ExtremumSign::Maxima)
}
