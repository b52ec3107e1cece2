//! Per-target records produced by compilation and persisted in bundles.

use crate::cluster::ClusterTree;
use crate::detect::FeaturePoint;
use crate::image::pyramid::PyramidLevel;
use crate::util::TargetIdxResult;
use serde::{Deserialize, Serialize};

/// Matching data for one pyramid level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchingLevel {
    pub scale: f32,
    pub width: usize,
    pub height: usize,
    pub maxima_points: Vec<FeaturePoint>,
    pub minima_points: Vec<FeaturePoint>,
    pub maxima_cluster: ClusterTree,
    pub minima_cluster: ClusterTree,
}

impl MatchingLevel {
    /// Total number of feature points on this level.
    pub fn point_count(&self) -> usize {
        self.maxima_points.len() + self.minima_points.len()
    }
}

/// Full matching data of one target, ordered like its matching pyramid.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchingRecord {
    pub levels: Vec<MatchingLevel>,
}

impl MatchingRecord {
    /// Total number of feature points across all levels.
    pub fn point_count(&self) -> usize {
        self.levels.iter().map(MatchingLevel::point_count).sum()
    }
}

/// Tracking data of one target: the working-resolution images a tracker
/// correlates against.
///
/// Only pixels are stored; a tracker computes its own tracking points from
/// these levels at load time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingRecord {
    pub levels: Vec<PyramidLevel>,
}

/// Dimensions of the original target image; pixels are not persisted.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDims {
    pub width: usize,
    pub height: usize,
}

/// Everything compiled for one target.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompiledTarget {
    pub target_image: TargetDims,
    pub matching_data: MatchingRecord,
    pub tracking_data: TrackingRecord,
}

impl CompiledTarget {
    /// Checks the invariants the encoding alone cannot express: each
    /// clustering tree partitions its level's points and each tracking
    /// level holds its full pixel buffer.
    pub fn validate(&self) -> TargetIdxResult<()> {
        for level in &self.matching_data.levels {
            level.maxima_cluster.check_points(level.maxima_points.len())?;
            level.minima_cluster.check_points(level.minima_points.len())?;
        }
        for level in &self.tracking_data.levels {
            level.view()?;
        }
        Ok(())
    }
}
