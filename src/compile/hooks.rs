//! Lifecycle hooks a concrete pipeline supplies.

use crate::image::pyramid::PyramidLevel;
use crate::image::{Surface, TargetImage};
use crate::record::TrackingRecord;
use crate::util::TargetIdxResult;

/// Prepares the RGBA drawing surface a target is read from.
pub trait SurfaceHook: Send + Sync {
    /// Produces the surface for target number `target`.
    fn prepare_surface(&self, target: usize, image: &TargetImage) -> TargetIdxResult<Surface>;
}

/// Assembles the tracking record from a target's tracking pyramid.
pub trait TrackingHook: Send + Sync {
    /// Builds the tracking record for target number `target`.
    fn assemble_tracking(
        &self,
        target: usize,
        levels: Vec<PyramidLevel>,
    ) -> TargetIdxResult<TrackingRecord>;
}

/// Hooks used by [`Compiler::standard`](crate::Compiler::standard).
///
/// The surface is the target expanded to RGBA; the tracking record keeps
/// every tracking level as-is.
#[derive(Copy, Clone, Debug, Default)]
pub struct StandardHooks;

impl SurfaceHook for StandardHooks {
    fn prepare_surface(&self, _target: usize, image: &TargetImage) -> TargetIdxResult<Surface> {
        Surface::from_target(image)
    }
}

impl TrackingHook for StandardHooks {
    fn assemble_tracking(
        &self,
        _target: usize,
        levels: Vec<PyramidLevel>,
    ) -> TargetIdxResult<TrackingRecord> {
        Ok(TrackingRecord { levels })
    }
}
